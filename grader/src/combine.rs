//! Merges pasted text and file-extracted text for one input slot.

/// Combines the pasted and extracted text of a slot into one canonical block.
/// Both sides are trimmed; non-empty parts are joined with a blank line,
/// pasted text first.
pub fn combine(pasted: &str, extracted: &str) -> String {
    let pasted = pasted.trim();
    let extracted = extracted.trim();

    match (pasted.is_empty(), extracted.is_empty()) {
        (false, false) => format!("{}\n\n{}", pasted, extracted),
        (false, true) => pasted.to_string(),
        (true, false) => extracted.to_string(),
        (true, true) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_both_parts_with_a_blank_line() {
        assert_eq!(combine("pasted", "from file"), "pasted\n\nfrom file");
    }

    #[test]
    fn returns_the_single_non_empty_part() {
        assert_eq!(combine("only pasted", ""), "only pasted");
        assert_eq!(combine("", "only file"), "only file");
    }

    #[test]
    fn trims_before_combining() {
        assert_eq!(combine("  a  ", "\n b \n"), "a\n\nb");
        assert_eq!(combine("   ", "\t\n"), "");
    }
}
