//! Common regex patterns for statement parsing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Issuer indicators (case-insensitive)
    pub static ref ISSUER_AVIANCA: Regex = Regex::new(r"(?i)avianca").unwrap();
    pub static ref ISSUER_LIFEMILES: Regex = Regex::new(r"(?i)lifemiles").unwrap();
    pub static ref ISSUER_AV_CARD: Regex = Regex::new(r"(?i)av\s*-\s*(mc|vs)").unwrap();
    pub static ref ISSUER_CREDIT_CARD: Regex = Regex::new(r"(?i)tarjeta\s+de\s+cr[eé]dito").unwrap();

    // Description cleanup
    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    pub static ref MARKER_RUN: Regex = Regex::new(r"\*{2,}").unwrap();
    pub static ref TRAILING_PUNCTUATION: Regex = Regex::new(r"[,;:\-]+$").unwrap();
    pub static ref TRAILING_LOCATION_CODE: Regex = Regex::new(r"(?:\s*\d{6,}[A-Z]*)+$").unwrap();
    pub static ref TRAILING_REFERENCE_NUMBERS: Regex = Regex::new(r"(?:\s+\d{4,})+$").unwrap();
    pub static ref TRAILING_COUNTRY_CODE: Regex = Regex::new(r"\s+[A-Z]{2}$").unwrap();

    // Text normalization
    pub static ref SPACES_AND_TABS: Regex = Regex::new(r"[ \t]+").unwrap();

    // Amounts in free text ($1,234.56, 1.234,56, 1234.56)
    pub static ref MONEY: Regex = Regex::new(
        r"\$\s?\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?|\$\s?\d+(?:\.\d{1,2})?"
    ).unwrap();

    pub static ref AMOUNT_TOKEN: Regex = Regex::new(
        r"\(?\$?\s?\d{1,3}(?:[,.]\d{3})+(?:[,.]\d{2})?\)?|\(?\$?\s?\d+[,.]\d{2}\)?"
    ).unwrap();

    // Date-like tokens (15/02/25, 15-02-2025, 2025-02-15, 15 02 25)
    pub static ref DATE_TOKEN: Regex = Regex::new(
        r"\b\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}\b|\b\d{4}-\d{2}-\d{2}\b|\b\d{2} \d{2} \d{2}\b"
    ).unwrap();

    // Markers that suggest transaction rows
    pub static ref TRANSACTION_MARKER: Regex = Regex::new(
        r"(?i)\$[\d,]+\.?\d*|MERCADO PAGO|PAYU\*|\d{8}"
    ).unwrap();
}
