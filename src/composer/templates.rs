//! Prompt templates for reply generation
//!
//! Two pools: templates that use both the post and the comment, and
//! comment-only fallbacks for when post content could not be extracted.
//! `{post}` and `{comment}` are the only placeholders.

use rand::Rng;

/// System prompt framing every completion call. A configured persona, if
/// any, is appended to it.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant replying to comments on a social-media post. \
Generate brief, relevant replies that directly address the comment content in the context of the original post. \
Be friendly and conversational. Do not use emojis. Keep replies under 100 words.";

/// Templates that use both the original post and the comment.
pub const POST_COMMENT_TEMPLATES: [&str; 5] = [
    "Read this post and comment carefully. Generate a relevant, helpful reply that addresses the comment in the context of the original post.\n\nOriginal post: {post}\n\nComment: {comment}\n\nThe reply should be brief, friendly, and directly related to both the post and comment content.",
    "Analyze this post and the comment below it. Respond appropriately based on the comment content, keeping in mind the context of the original post.\n\nOriginal post: {post}\n\nComment: {comment}\n\nIf it is a question, answer it. If it is a statement, acknowledge it meaningfully. Keep the reply short and relevant to both.",
    "Generate a contextual reply to this comment, considering the original post it responds to.\n\nOriginal post: {post}\n\nComment: {comment}\n\nMatch the tone and address the specific topic mentioned. Be genuine and concise.",
    "Respond to this comment in a way that shows you understand both the original post and the commenter's point.\n\nOriginal post: {post}\n\nComment: {comment}\n\nUse a friendly, conversational tone that directly relates to their message and the post context.",
    "Create a reply that is specifically tailored to this comment, considering the original post it responds to.\n\nOriginal post: {post}\n\nComment: {comment}\n\nAddress any questions, concerns, or points raised. Be authentic and helpful.",
];

/// Fallback templates for when post content is not available.
pub const COMMENT_ONLY_TEMPLATES: [&str; 5] = [
    "Read this comment carefully and generate a relevant, helpful reply that directly addresses what the commenter is asking or saying. Comment: {comment}. The reply should be brief, friendly, and directly related to the comment content.",
    "Analyze this comment and respond appropriately based on its content. If it is a question, answer it. If it is a statement, acknowledge it meaningfully. Comment: {comment}. Keep the reply short and relevant.",
    "Generate a contextual reply to this comment. Match the tone and address the specific topic mentioned. Comment: {comment}. Be genuine and concise.",
    "Respond to this comment in a way that shows you understand what the commenter is saying. Comment: {comment}. Use a friendly, conversational tone that directly relates to their message.",
    "Create a reply that is specifically tailored to this comment content. Address any questions, concerns, or points raised. Comment: {comment}. Be authentic and helpful.",
];

/// Render a template with the given post and comment text.
pub fn render(template: &str, post: &str, comment: &str) -> String {
    template.replace("{post}", post).replace("{comment}", comment)
}

/// Pick a prompt for this comment, preferring post-aware templates when post
/// content is substantial.
pub fn build_prompt(comment: &str, post: Option<&str>) -> String {
    let mut rng = rand::rng();
    match post {
        Some(post) if post.trim().len() > 10 => {
            let template = POST_COMMENT_TEMPLATES[rng.random_range(0..POST_COMMENT_TEMPLATES.len())];
            render(template, post, comment)
        }
        _ => {
            let template = COMMENT_ONLY_TEMPLATES[rng.random_range(0..COMMENT_ONLY_TEMPLATES.len())];
            render(template, "", comment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_both_placeholders() {
        let out = render("Post: {post} / Comment: {comment}", "launch day", "congrats!");
        assert_eq!(out, "Post: launch day / Comment: congrats!");
    }

    #[test]
    fn test_every_post_template_has_both_placeholders() {
        for template in POST_COMMENT_TEMPLATES {
            assert!(template.contains("{post}"));
            assert!(template.contains("{comment}"));
        }
    }

    #[test]
    fn test_every_fallback_template_has_comment_placeholder() {
        for template in COMMENT_ONLY_TEMPLATES {
            assert!(template.contains("{comment}"));
            assert!(!template.contains("{post}"));
        }
    }

    #[test]
    fn test_build_prompt_uses_post_when_available() {
        let prompt = build_prompt("what time?", Some("doors open at seven tonight"));
        assert!(prompt.contains("doors open at seven tonight"));
        assert!(prompt.contains("what time?"));
    }

    #[test]
    fn test_build_prompt_falls_back_without_post() {
        let prompt = build_prompt("what time?", None);
        assert!(prompt.contains("what time?"));
        assert!(!prompt.contains("Original post"));

        // Trivially short post content also falls back
        let prompt = build_prompt("what time?", Some("hi"));
        assert!(!prompt.contains("Original post"));
    }
}
