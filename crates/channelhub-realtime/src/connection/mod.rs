//! Client connection management.

pub mod authenticator;
pub mod handle;
pub mod manager;
pub mod pool;

pub use handle::ConnectionHandle;
pub use manager::ConnectionManager;
