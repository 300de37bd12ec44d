//! Title normalization: stripping publisher suffixes so that
//! `"Islam - Wikipedia"` and `"Islam"` compare as the same underlying topic.

use once_cell::sync::Lazy;
use regex::Regex;

/// Publisher tokens recognized after a separator. Matching is case-insensitive.
const PUBLISHERS: &[&str] = &[
    "Wikipedia",
    "Klexikon",
    "Wikibooks",
    "planet-schule",
    "Lehrer-Online",
    "sofatutor",
    "serlo",
];

static SUFFIX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let separators = r#"(?: - | \| | :: | \()"#;
    let publishers = PUBLISHERS.join("|");
    let pattern = format!(r"(?i){separators}(?:{publishers})\)?\s*$");
    Regex::new(&pattern).expect("title suffix pattern is a fixed, valid regex")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("fixed regex"));

/// Normalize a title: strip a trailing publisher suffix, collapse whitespace,
/// fold `&` to a space, and trim. Idempotent: `norm(norm(x)) == norm(x)`.
pub fn normalize_title(raw: &str) -> String {
    let stripped = SUFFIX_PATTERN.replace(raw, "");
    let folded = stripped.replace('&', " ");
    let collapsed = WHITESPACE.replace_all(folded.trim(), " ");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_dash_wikipedia_suffix() {
        assert_eq!(normalize_title("Islam - Wikipedia"), "Islam");
    }

    #[test]
    fn strips_pipe_separator_suffix() {
        assert_eq!(normalize_title("Photosynthese | serlo"), "Photosynthese");
    }

    #[test]
    fn strips_double_colon_suffix() {
        assert_eq!(normalize_title("Bruchrechnen :: sofatutor"), "Bruchrechnen");
    }

    #[test]
    fn strips_parenthesized_suffix() {
        assert_eq!(normalize_title("Vulkane (Klexikon)"), "Vulkane");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize_title("Mathematik   für    alle"), "Mathematik für alle");
    }

    #[test]
    fn folds_ampersand_to_space() {
        assert_eq!(normalize_title("Lesen & Schreiben"), "Lesen Schreiben");
    }

    #[test]
    fn leaves_titles_without_a_publisher_suffix_untouched() {
        assert_eq!(normalize_title("Grundlagen der Optik"), "Grundlagen der Optik");
    }

    #[test]
    fn is_idempotent() {
        let cases = [
            "Islam - Wikipedia",
            "Vulkane (Klexikon)",
            "Mathematik für Grundschüler",
            "",
        ];
        for c in cases {
            let once = normalize_title(c);
            let twice = normalize_title(&once);
            assert_eq!(once, twice, "not idempotent for {c:?}");
        }
    }
}
