//! Date parsing for statement lines.

use chrono::NaiveDate;

use super::{FieldExtractor, FieldMatch};

/// Order of the day, month and year components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

/// Separator between components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// Any run of whitespace.
    Whitespace,
    Char(char),
}

/// Number of year digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearWidth {
    Short,
    Long,
}

/// One date interpretation tried by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    pub order: DateOrder,
    pub separator: Separator,
    pub year: YearWidth,
}

/// Interpretations tried, in order, when no hint applies.
pub const TRIAL_ORDER: [DateFormat; 7] = [
    DateFormat::new(DateOrder::DayMonthYear, Separator::Whitespace, YearWidth::Short),
    DateFormat::new(DateOrder::DayMonthYear, Separator::Char('/'), YearWidth::Short),
    DateFormat::new(DateOrder::DayMonthYear, Separator::Char('-'), YearWidth::Short),
    DateFormat::new(DateOrder::DayMonthYear, Separator::Whitespace, YearWidth::Long),
    DateFormat::new(DateOrder::DayMonthYear, Separator::Char('/'), YearWidth::Long),
    DateFormat::new(DateOrder::DayMonthYear, Separator::Char('-'), YearWidth::Long),
    DateFormat::new(DateOrder::YearMonthDay, Separator::Char('-'), YearWidth::Long),
];

impl DateFormat {
    pub const fn new(order: DateOrder, separator: Separator, year: YearWidth) -> Self {
        Self {
            order,
            separator,
            year,
        }
    }

    /// Build a format from a strftime-style hint such as `%d %m %y` or `%Y-%m-%d`.
    ///
    /// Only `%d`, `%m`, `%y` and `%Y` are understood, each exactly once, joined by a
    /// single separator. Anything else yields `None`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let mut directives = Vec::with_capacity(3);
        let mut separators = Vec::with_capacity(2);
        let mut chars = hint.trim().chars();

        while let Some(c) = chars.next() {
            if c == '%' {
                directives.push(chars.next()?);
            } else {
                separators.push(c);
            }
        }

        if directives.len() != 3 || separators.len() != 2 || separators[0] != separators[1] {
            return None;
        }

        let separator = match separators[0] {
            c if c.is_whitespace() => Separator::Whitespace,
            c => Separator::Char(c),
        };

        let year = if directives.contains(&'Y') {
            YearWidth::Long
        } else {
            YearWidth::Short
        };

        let order = match (directives[0], directives[1], directives[2]) {
            ('d', 'm', 'y' | 'Y') => DateOrder::DayMonthYear,
            ('m', 'd', 'y' | 'Y') => DateOrder::MonthDayYear,
            ('y' | 'Y', 'm', 'd') => DateOrder::YearMonthDay,
            _ => return None,
        };

        Some(Self::new(order, separator, year))
    }

    /// Parse a string that must consist of exactly this format.
    pub fn parse(&self, s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        let parts: Vec<&str> = match self.separator {
            Separator::Whitespace => s.split_whitespace().collect(),
            Separator::Char(c) => s.split(c).collect(),
        };
        if parts.len() != 3 {
            return None;
        }
        self.parse_parts(parts[0], parts[1], parts[2])
    }

    /// Parse already separated components in this format's order.
    pub fn parse_parts(&self, a: &str, b: &str, c: &str) -> Option<NaiveDate> {
        let (day, month, year) = match self.order {
            DateOrder::DayMonthYear => (a, b, c),
            DateOrder::MonthDayYear => (b, a, c),
            DateOrder::YearMonthDay => (c, b, a),
        };

        let day = parse_component(day, 1, 2)?;
        let month = parse_component(month, 1, 2)?;
        let year = match self.year {
            YearWidth::Short => expand_two_digit_year(parse_component(year, 2, 2)?),
            YearWidth::Long => parse_component(year, 4, 4)? as i32,
        };

        NaiveDate::from_ymd_opt(year, month, day)
    }
}

fn parse_component(s: &str, min_len: usize, max_len: usize) -> Option<u32> {
    if s.len() < min_len || s.len() > max_len || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Map a two-digit year onto a century: 00-30 → 2000-2030, 31-99 → 1931-1999.
pub fn expand_two_digit_year(year: u32) -> i32 {
    let year = (year % 100) as i32;
    if year <= 30 {
        2000 + year
    } else {
        1900 + year
    }
}

/// Parse a date string, trying the hint first and then the fixed trial order.
pub fn parse_date_with_hint(s: &str, hint: Option<&str>) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(date) = hint.and_then(DateFormat::from_hint).and_then(|f| f.parse(s)) {
        return Some(date);
    }

    TRIAL_ORDER.iter().find_map(|format| format.parse(s))
}

/// Parse a date string using the fixed trial order.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_date_with_hint(s, None)
}

/// Find the first parseable date in noisy text by scanning windows of one to three
/// consecutive tokens.
pub fn extract_date_from_text(text: &str) -> Option<NaiveDate> {
    DateExtractor::new().find(text).map(|m| m.value)
}

/// Date field extractor scanning token windows.
pub struct DateExtractor {
    hint: Option<String>,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self { hint: None }
    }

    /// Try this strftime-style hint before the trial order.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Value = NaiveDate;

    fn find(&self, text: &str) -> Option<FieldMatch<NaiveDate>> {
        let tokens: Vec<&str> = text.split_whitespace().collect();

        for start in 0..tokens.len() {
            for len in 1..=3 {
                if start + len > tokens.len() {
                    break;
                }
                let candidate = tokens[start..start + len].join(" ");
                if let Some(date) = parse_date_with_hint(&candidate, self.hint.as_deref()) {
                    return Some(FieldMatch::new(date, 0.7, candidate));
                }
            }
        }

        None
    }

    fn find_all(&self, text: &str) -> Vec<FieldMatch<NaiveDate>> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut results = Vec::new();
        let mut start = 0;

        while start < tokens.len() {
            let found = (1..=3)
                .filter(|len| start + len <= tokens.len())
                .find_map(|len| {
                    let candidate = tokens[start..start + len].join(" ");
                    parse_date_with_hint(&candidate, self.hint.as_deref())
                        .map(|date| (len, FieldMatch::new(date, 0.7, candidate)))
                });

            match found {
                Some((len, m)) => {
                    results.push(m);
                    start += len;
                }
                None => start += 1,
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_two_digit_year_boundaries() {
        assert_eq!(expand_two_digit_year(5), 2005);
        assert_eq!(expand_two_digit_year(99), 1999);
        assert_eq!(expand_two_digit_year(30), 2030);
        assert_eq!(expand_two_digit_year(31), 1931);
        assert_eq!(expand_two_digit_year(0), 2000);
    }

    #[test]
    fn test_two_digit_year_in_parsed_dates() {
        assert_eq!(parse_date("15 02 05"), Some(date(2005, 2, 15)));
        assert_eq!(parse_date("15 02 99"), Some(date(1999, 2, 15)));
        assert_eq!(parse_date("15/02/30"), Some(date(2030, 2, 15)));
        assert_eq!(parse_date("15-02-31"), Some(date(1931, 2, 15)));
    }

    #[test]
    fn test_trial_order_formats() {
        assert_eq!(parse_date("15 02 25"), Some(date(2025, 2, 15)));
        assert_eq!(parse_date("5/3/25"), Some(date(2025, 3, 5)));
        assert_eq!(parse_date("15 03 2025"), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("15/03/2025"), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("2025-03-15"), Some(date(2025, 3, 15)));
    }

    #[test]
    fn test_dash_separated_long_year() {
        assert_eq!(parse_date("15-03-2025"), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("5-3-2025"), Some(date(2025, 3, 5)));
        assert_eq!(parse_date("15-03-25"), Some(date(2025, 3, 15)));
        assert_eq!(parse_date("31-02-2025"), None);
    }

    #[test]
    fn test_invalid_calendar_dates_are_rejected() {
        assert_eq!(parse_date("31 02 25"), None);
        assert_eq!(parse_date("15 13 25"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("NETFLIX"), None);
    }

    #[test]
    fn test_hint_takes_precedence() {
        assert_eq!(parse_date_with_hint("02 15 25", Some("%m %d %y")), Some(date(2025, 2, 15)));
        assert_eq!(parse_date_with_hint("2025 02 15", Some("%Y %m %d")), Some(date(2025, 2, 15)));
        // A hint that does not fit falls back to the trial order
        assert_eq!(parse_date_with_hint("15 02 25", Some("%Y-%m-%d")), Some(date(2025, 2, 15)));
    }

    #[test]
    fn test_from_hint() {
        assert_eq!(
            DateFormat::from_hint("%d/%m/%Y"),
            Some(DateFormat::new(DateOrder::DayMonthYear, Separator::Char('/'), YearWidth::Long))
        );
        assert_eq!(DateFormat::from_hint("%d %m"), None);
        assert_eq!(DateFormat::from_hint("%d %b %y"), None);
    }

    #[test]
    fn test_extract_date_from_noisy_text() {
        assert_eq!(
            extract_date_from_text("7888 15 02 25 PAYU*NETFLIX"),
            Some(date(2025, 2, 15))
        );
        assert_eq!(
            extract_date_from_text("compra 03/04/2025 almacen"),
            Some(date(2025, 4, 3))
        );
        assert_eq!(extract_date_from_text("no dates in here"), None);
    }

    #[test]
    fn test_extract_all_dates() {
        let extractor = DateExtractor::new();
        let dates: Vec<NaiveDate> = extractor
            .find_all("desde 01/02/2025 hasta 28/02/2025")
            .into_iter()
            .map(|m| m.value)
            .collect();
        assert_eq!(dates, vec![date(2025, 2, 1), date(2025, 2, 28)]);
    }
}
