//! Field parsers for statement transaction lines.

pub mod amounts;
pub mod dates;
pub mod description;
pub mod patterns;
pub mod text;

pub use amounts::{format_amount, parse_amount, AmountExtractor};
pub use dates::{expand_two_digit_year, extract_date_from_text, parse_date, DateExtractor, DateFormat};
pub use description::{clean_description, clean_description_with};
pub use text::clean_text;

/// Scans free text for one kind of field.
pub trait FieldExtractor {
    type Value;

    /// The preferred occurrence, if any.
    fn find(&self, text: &str) -> Option<FieldMatch<Self::Value>>;

    /// Every non-overlapping occurrence, in text order.
    fn find_all(&self, text: &str) -> Vec<FieldMatch<Self::Value>>;
}

/// A field value found in free text.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch<T> {
    pub value: T,
    /// Score in [0, 1]; lower for values recovered by scanning.
    pub confidence: f32,
    /// Text the value was parsed from.
    pub matched: String,
    /// Byte span in the scanned text, when known.
    pub span: Option<(usize, usize)>,
}

impl<T> FieldMatch<T> {
    pub fn new(value: T, confidence: f32, matched: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            matched: matched.into(),
            span: None,
        }
    }

    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.span = Some((start, end));
        self
    }
}
