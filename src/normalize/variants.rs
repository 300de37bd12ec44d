//! Search-string variant generation, compensating for an upstream search
//! engine that lacks lemmatization, is case-sensitive, and stores umlauts
//! inconsistently.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9äöüÄÖÜß\s]").expect("fixed regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("fixed regex"));
static ADJECTIVE_ENDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<stem>.{3,})(e|er|es|en|em)$").expect("fixed regex"));

/// Produce the set of search-string variants for a normalized title `T`.
/// The original `t` is always present; duplicates are removed.
pub fn title_variants(t: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push_unique = |s: String| {
        if !s.trim().is_empty() && !out.contains(&s) {
            out.push(s);
        }
    };

    push_unique(t.to_string());
    push_unique(t.to_lowercase());
    push_unique(fold_umlauts(&t.to_lowercase()));
    push_unique(fold_umlauts(t));
    push_unique(t.replace('-', ""));
    push_unique(t.replace('-', " "));
    push_unique(alphanumeric_only(t));

    for word in t.split_whitespace() {
        if word.len() >= 5 {
            if let Some(caps) = ADJECTIVE_ENDING.captures(word) {
                let stem = &caps["stem"];
                let variant = t.replacen(word, stem, 1);
                push_unique(variant);
            }
        }
    }

    out
}

fn fold_umlauts(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'ä' => "ae".to_string(),
            'ö' => "oe".to_string(),
            'ü' => "ue".to_string(),
            'ß' => "ss".to_string(),
            'Ä' => "Ae".to_string(),
            'Ö' => "Oe".to_string(),
            'Ü' => "Ue".to_string(),
            other => other.to_string(),
        })
        .collect()
}

fn alphanumeric_only(s: &str) -> String {
    let replaced = NON_ALNUM.replace_all(s, " ");
    WHITESPACE.replace_all(replaced.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_is_always_included() {
        let v = title_variants("Mathematik für Grundschüler");
        assert!(v.contains(&"Mathematik für Grundschüler".to_string()));
    }

    #[test]
    fn includes_lowercase_form() {
        let v = title_variants("Mathematik für Grundschüler");
        assert!(v.contains(&"mathematik für grundschüler".to_string()));
    }

    #[test]
    fn includes_umlaut_folded_form() {
        let v = title_variants("Mathematik für Grundschüler");
        assert!(v.iter().any(|s| s.contains("fuer") && s.contains("Grundschueler")));
    }

    #[test]
    fn includes_hyphen_stripped_and_spaced_forms() {
        let v = title_variants("Deutsch-Englisch Wörterbuch");
        assert!(v.contains(&"DeutschEnglisch Wörterbuch".to_string()));
        assert!(v.contains(&"Deutsch Englisch Wörterbuch".to_string()));
    }

    #[test]
    fn includes_alphanumeric_only_form() {
        let v = title_variants("Photosynthese: Grundlagen!");
        assert!(v.iter().any(|s| !s.contains(':') && !s.contains('!')));
    }

    #[test]
    fn has_no_duplicates() {
        let v = title_variants("Islam");
        let mut seen = std::collections::HashSet::new();
        for s in &v {
            assert!(seen.insert(s.clone()), "duplicate variant: {s}");
        }
    }

    #[test]
    fn strips_adjective_endings_on_long_words() {
        let v = title_variants("Grosse Fische");
        assert!(v.iter().any(|s| s == "Gross Fische"));
    }
}
