//! Natural-key resolution for import rows
//!
//! Pure helpers that turn the free-text clause field into normalized
//! entity identities. No side effects; deterministic for a given input.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// Dotted-numeric clause code, e.g. "4.5", "7.2.1", "8.2"
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid clause code pattern"));

/// Extract every clause code from the free-text field, first-seen order,
/// duplicates removed. Empty result means the row carries no usable clause
/// reference and must be skipped by the caller.
pub fn parse_codes(text: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for found in CODE_PATTERN.find_iter(text) {
        let code = found.as_str();
        if !codes.iter().any(|existing| existing == code) {
            codes.push(code.to_string());
        }
    }
    codes
}

/// Find the name belonging to a clause code inside the multi-line text.
///
/// Lines look like `"8.1 - Perencanaan dan pengendalian operasi"`; the
/// `"<code> - "` prefix is stripped. Falls back to a synthesized name when
/// no line mentions the code.
pub fn extract_name(text: &str, kode: &str) -> String {
    for line in text.split('\n') {
        if line.contains(kode) {
            return line.replace(&format!("{} - ", kode), "").trim().to_string();
        }
    }
    format!("Klausul {}", kode)
}

/// Composite cache key from parent identity and child name.
///
/// Case-insensitive and whitespace-trimmed so "Monitoring " and
/// "monitoring" resolve to the same entity within a run.
pub fn cache_key(parent_id: Uuid, nama: &str) -> String {
    format!("{}_{}", parent_id, nama.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_in_order_without_duplicates() {
        let text = "8.1 - Perencanaan dan pengendalian operasi\n9.1 - Pemantauan";
        assert_eq!(parse_codes(text), vec!["8.1", "9.1"]);

        // Repeated codes collapse, first-seen order is kept
        let text = "9.1 - Pemantauan\n8.1 - Perencanaan\n9.1 - Pemantauan";
        assert_eq!(parse_codes(text), vec!["9.1", "8.1"]);
    }

    #[test]
    fn parses_deeply_dotted_codes() {
        assert_eq!(parse_codes("7.2.2.2 - Kompetensi"), vec!["7.2.2.2"]);
    }

    #[test]
    fn no_codes_yields_empty_set() {
        assert!(parse_codes("tidak ada kode klausul di sini").is_empty());
        assert!(parse_codes("").is_empty());
    }

    #[test]
    fn extracts_name_for_matching_line() {
        let text = "8.1 - Perencanaan dan pengendalian operasi\n9.1 - Pemantauan";
        assert_eq!(
            extract_name(text, "8.1"),
            "Perencanaan dan pengendalian operasi"
        );
        assert_eq!(extract_name(text, "9.1"), "Pemantauan");
    }

    #[test]
    fn falls_back_to_synthesized_name() {
        assert_eq!(extract_name("8.1 - Perencanaan", "4.5"), "Klausul 4.5");
    }

    #[test]
    fn cache_key_folds_case_and_whitespace() {
        let parent = Uuid::new_v4();
        assert_eq!(
            cache_key(parent, "Monitoring "),
            cache_key(parent, "monitoring")
        );
        assert_ne!(
            cache_key(parent, "Monitoring"),
            cache_key(Uuid::new_v4(), "Monitoring")
        );
    }
}
