/// Maximum length for error content in log messages
pub const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Truncate a string for display (Unicode-safe)
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Sanitize API response content for log messages to prevent credential leakage.
pub fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "x-api-key",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-", // OpenAI key prefix
        "sk-ant-",
        "aiza", // Google API key prefix
    ];

    let truncated = truncate_str(content.trim(), MAX_ERROR_CONTENT_LEN);

    let lower = truncated.to_lowercase();
    if SECRET_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        return "(response details redacted - may contain sensitive data)".to_string();
    }

    truncated.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_is_char_safe() {
        assert_eq!(truncate_str("héllo", 2), "hé");
        assert_eq!(truncate_str("abc", 10), "abc");
        assert_eq!(truncate_str("abc", 0), "");
    }

    #[test]
    fn test_sanitize_redacts_secret_like_bodies() {
        let body = r#"{"error": "Incorrect API key provided: sk-abc123"}"#;
        assert_eq!(
            sanitize_api_response(body),
            "(response details redacted - may contain sensitive data)"
        );
    }

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        assert_eq!(sanitize_api_response(&body).len(), MAX_ERROR_CONTENT_LEN);
        assert_eq!(sanitize_api_response("  model overloaded \n"), "model overloaded");
    }
}
