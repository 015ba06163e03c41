//! Quote extraction from counterparty text

use crate::types::Price;

/// Turns free-form counterparty text into a numeric quote
///
/// `None` means no price was found; the driver treats that as a no-op.
pub trait QuoteExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Option<Price>;
}

impl<F> QuoteExtractor for F
where
    F: Fn(&str) -> Option<Price> + Send + Sync,
{
    fn extract(&self, text: &str) -> Option<Price> {
        self(text)
    }
}

/// Takes the last number in the text, ignoring thousands separators
///
/// "Best I can do is 52,000, final" yields 52000. Numbers too large for a
/// price are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct LastNumberExtractor;

impl QuoteExtractor for LastNumberExtractor {
    fn extract(&self, text: &str) -> Option<Price> {
        let mut found = None;
        let mut digits = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            // Separator only counts between two digits
            let separator = (c == ',' || c == '_') && !digits.is_empty();
            if separator && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
                continue;
            }
            if !digits.is_empty() {
                found = digits.parse().ok().or(found);
                digits.clear();
            }
        }
        if !digits.is_empty() {
            found = digits.parse().ok().or(found);
        }
        found
    }
}
