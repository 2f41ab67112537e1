//! Message validation rules.

use channelhub_core::error::AppError;

/// Maximum channel name length in characters.
pub const MAX_CHANNEL_NAME_LEN: usize = 200;

/// Validates a raw inbound frame against the configured size limit.
pub fn validate_inbound(raw: &str, max_size: usize) -> Result<(), AppError> {
    if raw.len() > max_size {
        return Err(AppError::validation(format!(
            "Message exceeds maximum size of {max_size} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty message"));
    }

    Ok(())
}

/// Validates channel name format.
pub fn validate_channel_name(channel: &str) -> Result<(), AppError> {
    if channel.is_empty() || channel.chars().count() > MAX_CHANNEL_NAME_LEN {
        return Err(AppError::validation("Invalid channel name length"));
    }

    if !channel
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=' | '@' | ',' | '.' | ';' | ':'))
    {
        return Err(AppError::validation(
            "Channel name contains invalid characters",
        ));
    }

    Ok(())
}
