//! Normalization of extracted document text.

use super::patterns::SPACES_AND_TABS;

/// Normalize text before pattern matching.
///
/// Drops control characters other than newline and tab, converts CRLF and CR line
/// endings to LF, collapses runs of spaces and tabs, trims every line and removes blank
/// lines. Reading order is preserved.
pub fn clean_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let printable: String = unified
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    printable
        .lines()
        .map(|line| SPACES_AND_TABS.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join per-page text in reading order.
pub fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let raw = "  AVIANCA\t\tLIFEMILES \r\n\r\n15  02\u{0007} 25\rNETFLIX   \n\n";
        assert_eq!(clean_text(raw), "AVIANCA LIFEMILES\n15 02 25\nNETFLIX");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text(" \n\t\n"), "");
    }

    #[test]
    fn test_join_pages_skips_blank_pages() {
        assert_eq!(join_pages(&["page one", "  ", "page two"]), "page one\npage two");
    }
}
