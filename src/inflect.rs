//! Singularization of collection names taken from request paths.

/// Words whose singular and plural forms are identical.
const UNCOUNTABLE: &[&str] = &[
    "seo",
    "news",
    "series",
    "species",
    "information",
    "equipment",
    "media",
    "metadata",
    "feedback",
];

/// Singular words ending in `s` that must not lose it.
const SINGULAR_US: &[&str] = &["status", "campus", "bonus", "virus", "focus", "corpus", "radius"];

const IRREGULAR: &[(&str, &str)] = &[
    ("people", "person"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("teeth", "tooth"),
    ("feet", "foot"),
    ("mice", "mouse"),
    ("geese", "goose"),
];

/// Return the singular form of an English collection name.
///
/// Hyphenated and underscored names singularize only their last word
/// (`blog-posts` becomes `blog-post`). Already-singular words are returned
/// unchanged.
pub fn singularize(word: &str) -> String {
    match word.rfind(['-', '_']) {
        Some(idx) => format!("{}{}", &word[..=idx], singularize_word(&word[idx + 1..])),
        None => singularize_word(word),
    }
}

fn singularize_word(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    if lower.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }

    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return singular.to_string();
    }

    if let Some(stem) = lower.strip_suffix("ies") {
        if stem.len() > 1 {
            return format!("{}y", &word[..stem.len()]);
        }
    }

    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if lower.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }

    if lower.ends_with("ss") || lower.ends_with("is") || SINGULAR_US.contains(&lower.as_str()) {
        return word.to_string();
    }

    match lower.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => word[..stem.len()].to_string(),
        _ => word.to_string(),
    }
}
