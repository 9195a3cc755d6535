//! Acknowledgment tokens
//!
//! A reply counts as "alert received" when, after trimming, it is one of a
//! small fixed set of strings. ASCII letters compare case-insensitively.

/// Replies recognized as an acknowledgment
pub const ACK_TOKENS: &[&str] = &["1", "ok", "confirm", "confirmed", "ack", "收到", "确认"];

/// Check whether a reply text is an acknowledgment
pub fn is_acknowledgment(text: &str) -> bool {
    let reply = text.trim();
    !reply.is_empty() && ACK_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_tokens() {
        for reply in [
            "1", "ok", "OK", "Ok", " confirm ", "CONFIRMED", "ack", "收到", "确认\n",
        ] {
            assert!(is_acknowledgment(reply), "{:?}", reply);
        }
    }

    #[test]
    fn test_other_replies_are_not_acknowledgments() {
        for reply in ["", "   ", "2", "okay", "ok!", "not ok", "11", "on my way"] {
            assert!(!is_acknowledgment(reply), "{:?}", reply);
        }
    }
}
