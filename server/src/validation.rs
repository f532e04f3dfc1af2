use crate::error::ApiError;

/// Maximum text length for speech requests
const MAX_SPEAK_TEXT_LENGTH: usize = 5000;
/// Maximum message length for chat requests
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Validate speech request
pub fn validate_speak_request(text: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > MAX_SPEAK_TEXT_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            MAX_SPEAK_TEXT_LENGTH
        )));
    }
    Ok(())
}

/// Validate chat request
pub fn validate_ask_request(message: &str) -> Result<(), ApiError> {
    if message.trim().is_empty() {
        return Err(ApiError::InvalidInput("Message cannot be empty".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ApiError::InvalidInput(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_speak_request_valid() {
        assert!(validate_speak_request("Hello").is_ok());
        assert!(validate_speak_request(&"é".repeat(MAX_SPEAK_TEXT_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_speak_request_empty_text() {
        let result = validate_speak_request("  ");
        assert!(result.is_err());
        if let Err(ApiError::InvalidInput(msg)) = result {
            assert!(msg.contains("empty"));
        }
    }

    #[test]
    fn test_validate_speak_request_too_long() {
        let long_text = "a".repeat(6000);
        let result = validate_speak_request(&long_text);
        assert!(result.is_err());
        if let Err(ApiError::InvalidInput(msg)) = result {
            assert!(msg.contains("too long"));
        }
    }

    #[test]
    fn test_validate_ask_request() {
        assert!(validate_ask_request("ping").is_ok());
        assert!(matches!(
            validate_ask_request("\n\t"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_ask_request(&"x".repeat(MAX_MESSAGE_LENGTH + 1)),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
