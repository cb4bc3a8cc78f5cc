use super::{ExtractError, ExtractStrategy};

/// Decodes plain text, source code, and other text-like formats as UTF-8,
/// replacing invalid byte sequences rather than failing.
pub struct TextExtractor;

impl ExtractStrategy for TextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn failure_placeholder(&self) -> &'static str {
        "[Error decoding text file.]"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let extracted = TextExtractor.extract(b"ok \xff\xfe bytes").unwrap();
        assert!(extracted.starts_with("ok "));
        assert!(extracted.ends_with(" bytes"));
        assert!(extracted.contains('\u{FFFD}'));
    }
}
