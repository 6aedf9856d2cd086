use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

pub type Id = String;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Collation key for student display names.
///
/// Decomposes to NFD, drops combining marks and lowercases, so that
/// "Émile" sorts next to "emile" rather than after "Zoe". Letters with no
/// decomposition (ø, ł, ß and friends) are folded to their base spelling.
pub fn collation_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
    {
        match fold_letter(c) {
            Some(folded) => key.push_str(folded),
            None => key.push(c),
        }
    }
    key
}

/// Base spelling of lowercase letters NFD leaves intact.
fn fold_letter(c: char) -> Option<&'static str> {
    Some(match c {
        'ø' => "o",
        'ł' => "l",
        'đ' | 'ð' => "d",
        'ħ' => "h",
        'ı' => "i",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'þ' => "th",
        _ => return None,
    })
}

/// Total order over (display name, id): collation key first, then the raw
/// name, then the id as a final tie-breaker.
pub fn compare_display_names(a_name: &str, a_id: &str, b_name: &str, b_id: &str) -> Ordering {
    collation_key(a_name)
        .cmp(&collation_key(b_name))
        .then_with(|| a_name.cmp(b_name))
        .then_with(|| a_id.cmp(b_id))
}

/// True when a value is empty or only whitespace.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collation_key_folds_accents_and_case() {
        assert_eq!(collation_key("Émile"), "emile");
        assert_eq!(collation_key("  ÅSA "), "asa");
        assert_eq!(collation_key("Zoë"), "zoe");
    }

    #[test]
    fn test_collation_key_folds_undecomposable_letters() {
        assert_eq!(collation_key("Søren"), "soren");
        assert_eq!(collation_key("Łukasz"), "lukasz");
        assert_eq!(collation_key("Strauß"), "strauss");
        assert_eq!(collation_key("Guðmundsdóttir"), "gudmundsdottir");
        assert_eq!(collation_key("Ærø"), "aero");

        let mut names = vec![("Szymon", "e1"), ("Søren", "e2"), ("Sara", "e3")];
        names.sort_by(|a, b| compare_display_names(a.0, a.1, b.0, b.1));
        let ordered: Vec<&str> = names.iter().map(|(name, _)| *name).collect();
        assert_eq!(ordered, vec!["Sara", "Søren", "Szymon"]);
    }

    #[test]
    fn test_compare_display_names_is_total() {
        let mut names = vec![
            ("Zoe", "e3"),
            ("émile", "e2"),
            ("Emile", "e1"),
            ("Adam", "e4"),
            ("Emile", "e0"),
        ];
        names.sort_by(|a, b| compare_display_names(a.0, a.1, b.0, b.1));

        let ordered: Vec<&str> = names.iter().map(|(_, id)| *id).collect();
        assert_eq!(ordered, vec!["e4", "e0", "e1", "e2", "e3"]);
    }
}
