//! Input sanitization and reply validation

use crate::domain::Comment;

use super::compose::ComposeError;

/// Strip control characters (keeping newlines and tabs) and truncate at a
/// word boundary, appending an ellipsis when truncation happened.
pub fn sanitize_text(text: &str, max_length: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.chars().count() <= max_length {
        return cleaned.to_string();
    }

    let cut: String = cleaned.chars().take(max_length).collect();
    let cut = match cut.rfind(' ') {
        Some(idx) => &cut[..idx],
        None => cut.as_str(),
    };
    format!("{}...", cut.trim_end())
}

/// Limits a candidate reply must satisfy.
#[derive(Debug, Clone)]
pub struct ReplyLimits {
    /// Hard ceiling on reply length in characters
    pub max_chars: usize,
    /// Lowercased substrings that must not appear in a reply
    pub disallowed_terms: Vec<String>,
}

impl Default for ReplyLimits {
    fn default() -> Self {
        Self {
            max_chars: 400,
            disallowed_terms: vec!["as an ai".to_string()],
        }
    }
}

/// Deterministic checks on generated reply text. A failure here is permanent
/// for the comment; the completion call is not repeated.
pub fn validate_reply(reply: &str, comment: &Comment, limits: &ReplyLimits) -> Result<(), ComposeError> {
    let trimmed = reply.trim();
    if trimmed.chars().count() < 3 {
        return Err(ComposeError::Rejected("reply empty or too short".to_string()));
    }
    if trimmed.chars().count() > limits.max_chars {
        return Err(ComposeError::Rejected(format!(
            "reply exceeds {} characters",
            limits.max_chars
        )));
    }

    let lowered = trimmed.to_lowercase();
    for term in &limits.disallowed_terms {
        if !term.is_empty() && lowered.contains(&term.to_lowercase()) {
            return Err(ComposeError::Rejected(format!("reply contains disallowed term: {}", term)));
        }
    }

    // Internal identifiers must never leak into a posted reply
    if trimmed.contains(&comment.id) || trimmed.contains(&comment.author_id) {
        return Err(ComposeError::Rejected("reply leaks an internal identifier".to_string()));
    }

    Ok(())
}
