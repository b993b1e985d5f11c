//! Random request tokens and nonces.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

use crate::error::AuthError;

/// 24 bytes encode to exactly 32 URL-safe base64 characters, so no
/// truncation is needed and every character carries entropy.
const TOKEN_BYTES: usize = 24;

/// Generate an unguessable, URL-safe token from the OS entropy source.
pub fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    getrandom::getrandom(&mut bytes).map_err(|e| AuthError::RandomGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Short prefix of a token, safe to include in logs.
pub(crate) fn log_prefix(token: &str) -> &str {
    token.get(..6).unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_32_url_safe_chars() {
        let token = generate_token().unwrap();

        assert_eq!(token.len(), 32);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: std::collections::HashSet<String> =
            (0..100).map(|_| generate_token().unwrap()).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_log_prefix_handles_short_tokens() {
        assert_eq!(log_prefix("abcdefghij"), "abcdef");
        assert_eq!(log_prefix("abc"), "abc");
        assert_eq!(log_prefix(""), "");
    }
}
