//! Credential scrubbing for text that leaves the process
//!
//! Engine faults sometimes echo the request body back, root passwords
//! included, and bearer tokens turn up in auth errors.

use regex::Regex;
use std::sync::OnceLock;

const PATTERNS: [&str; 2] = [
    r#"(?i)(password|root_password|passwd)(["']?\s*[:=]\s*["']?)[^"'\s,}]+"#,
    r"(?i)(bearer)(\s+)[A-Za-z0-9._~+/=-]+",
];

fn patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    tracing::warn!("Invalid redaction pattern {}: {}", pattern, e);
                    None
                }
            })
            .collect()
    })
}

/// Blank out credential values, keeping the key so the message stays readable
pub fn redact(message: &str) -> String {
    patterns().iter().fold(message.to_string(), |text, regex| {
        regex.replace_all(&text, "$1$2[REDACTED]").into_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_password_fields() {
        let message = redact(r#"Failed to add host: {"root_password": "hunter2", "name": "h0"}"#);
        assert!(!message.contains("hunter2"));
        assert!(message.contains("[REDACTED]"));
        assert!(message.contains("h0"));

        assert_eq!(redact("password=s3cret retry"), "password=[REDACTED] retry");
    }

    #[test]
    fn test_redacts_bearer_tokens() {
        let message = redact("Authorization: Bearer abc.def.ghi rejected");
        assert_eq!(message, "Authorization: Bearer [REDACTED] rejected");
    }

    #[test]
    fn test_leaves_plain_text_alone() {
        let message = "Cannot run VM. There is no host that satisfies current scheduling constraints.";
        assert_eq!(redact(message), message);
    }
}
