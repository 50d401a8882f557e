use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::RelatedInfo;

/// Compiler suggestions worth correlating with the visualizations'
/// suggested fixes. Kept in step with the reference/dereference guidance
/// rustc attaches to borrow and type errors.
static SUGGESTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"consider adding a leading",
        r"consider dereferencing here",
        r"consider removing deref here",
        r"consider dereferencing",
        r"consider borrowing here",
        r"consider .+borrowing here",
        r"consider removing the",
        r"unboxing the value",
        r"dereferencing the borrow",
        r"dereferencing the type",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid suggestion pattern"))
    .collect()
});

/// First related-information message that matches a known actionable
/// suggestion, if any.
pub fn find_hint(related: &[RelatedInfo]) -> Option<String> {
    related
        .iter()
        .find(|info| {
            SUGGESTION_PATTERNS
                .iter()
                .any(|pattern| pattern.is_match(&info.message))
        })
        .map(|info| info.message.clone())
}
