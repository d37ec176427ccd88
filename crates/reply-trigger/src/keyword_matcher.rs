//! Keyword matcher
//!
//! Exact, case-insensitive keyword matching.
//!
//! # Behavior
//!
//! - Content and keywords are normalized with `trim` + Unicode lowercase
//! - Only whole-content equality matches; substrings and prefixes never do
//! - The first keyword in configured order that matches is reported, in its
//!   original casing
//! - Blank content and blank keywords never match
//!
//! # Example
//!
//! ```rust
//! use reply_trigger::KeywordMatcher;
//!
//! let matcher = KeywordMatcher::new();
//! let keywords = vec!["Hello".to_string(), "hi".to_string()];
//!
//! let result = matcher.match_content("  HELLO  ", &keywords).unwrap();
//! assert_eq!(result.matched_keyword, "Hello");
//! assert!(matcher.match_content("hello world", &keywords).is_none());
//! ```

/// Keyword match result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatchResult {
    /// Matched keyword, original casing
    pub matched_keyword: String,
    /// Normalized content that was compared
    pub normalized: String,
}

/// Keyword matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMatcher;

impl KeywordMatcher {
    pub fn new() -> Self {
        Self
    }

    /// `trim` then lowercase
    pub fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }

    /// Match `content` against `keywords`.
    pub fn match_content<S: AsRef<str>>(
        &self,
        content: &str,
        keywords: &[S],
    ) -> Option<KeywordMatchResult> {
        let normalized = Self::normalize(content);
        if normalized.is_empty() {
            return None;
        }

        keywords
            .iter()
            .map(AsRef::as_ref)
            .find(|keyword| Self::normalize(keyword) == normalized)
            .map(|keyword| KeywordMatchResult {
                matched_keyword: keyword.to_string(),
                normalized,
            })
    }

    /// Match optional content; absent content never matches.
    pub fn match_optional<S: AsRef<str>>(
        &self,
        content: Option<&str>,
        keywords: &[S],
    ) -> Option<KeywordMatchResult> {
        content.and_then(|c| self.match_content(c, keywords))
    }

    pub fn matches<S: AsRef<str>>(&self, content: &str, keywords: &[S]) -> bool {
        self.match_content(content, keywords).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kws(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(KeywordMatcher::normalize("  HeLLo \n"), "hello");
        assert_eq!(KeywordMatcher::normalize("\t"), "");
    }

    #[test]
    fn test_exact_match_ignores_case_and_whitespace() {
        let matcher = KeywordMatcher::new();
        let result = matcher.match_content("  HELLO  ", &kws(&["hello"])).unwrap();
        assert_eq!(result.matched_keyword, "hello");
        assert_eq!(result.normalized, "hello");
    }

    #[test]
    fn test_no_partial_matches() {
        let matcher = KeywordMatcher::new();
        let keywords = kws(&["hello"]);
        assert!(!matcher.matches("hello world", &keywords));
        assert!(!matcher.matches("helo", &keywords));
        assert!(!matcher.matches("hellothere", &keywords));
        assert!(!matcher.matches("say hello", &keywords));
    }

    #[test]
    fn test_keyword_casing_preserved() {
        let matcher = KeywordMatcher::new();
        let result = matcher.match_content("promo", &kws(&["PROMO"])).unwrap();
        assert_eq!(result.matched_keyword, "PROMO");
    }

    #[test]
    fn test_first_keyword_in_order_wins() {
        let matcher = KeywordMatcher::new();
        let result = matcher
            .match_content("hi", &kws(&["bye", " Hi ", "hi"]))
            .unwrap();
        assert_eq!(result.matched_keyword, " Hi ");
    }

    #[test]
    fn test_empty_keywords_never_match() {
        let matcher = KeywordMatcher::new();
        let keywords: Vec<String> = Vec::new();
        assert!(!matcher.matches("hello", &keywords));
    }

    #[test]
    fn test_blank_content_and_keywords() {
        let matcher = KeywordMatcher::new();
        assert!(!matcher.matches("   ", &kws(&["", "  "])));
        assert!(!matcher.matches("", &kws(&[""])));
        assert!(matcher.match_optional(None, &kws(&["hello"])).is_none());
    }

    #[test]
    fn test_unicode_lowercase() {
        let matcher = KeywordMatcher::new();
        assert!(matcher.matches("ÜBER", &kws(&["über"])));
        assert!(matcher.matches("你好", &kws(&["你好"])));
        assert!(!matcher.matches("你好吗", &kws(&["你好"])));
    }
}
