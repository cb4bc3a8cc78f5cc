//! Strips leftover Markdown artifacts from model output.

use once_cell::sync::Lazy;
use regex::Regex;

static LEADING_BULLETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[*\-+]+\s*").unwrap()
});

/// Cleans a raw model response into plain text: bold markers and horizontal
/// rules are removed everywhere, leading bullet markers are stripped per
/// line, and the result is trimmed. The instruction template already forbids
/// Markdown, so this only catches stragglers.
pub fn sanitize(raw: &str) -> String {
    let cleaned = raw.replace("**", "").replace("---", "");
    let cleaned = LEADING_BULLETS.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bold_rules_and_bullets() {
        assert_eq!(sanitize("**bold**\n---\n- item"), "bold\n\nitem");
    }

    #[test]
    fn leaves_clean_text_untouched() {
        let report = "Criterion: Thesis\nScore: 8/10\nEvidence: The thesis is clear.";
        assert_eq!(sanitize(report), report);
    }

    #[test]
    fn only_line_leading_bullets_are_removed() {
        assert_eq!(sanitize("a - b\n* lead"), "a - b\nlead");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(sanitize("  \n report \n\n"), "report");
    }
}
