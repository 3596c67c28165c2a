use indexmap::IndexMap;
use serde::Serialize;

pub const CANONICAL_TRAITS: [&str; 5] = [
    "Impulsiveness",
    "Consistency",
    "Discipline",
    "Aggression",
    "Hesitation",
];

/// Never shown on the trait profile.
pub const EXCLUDED_TRAIT: &str = "emotionalVolatility";

const KEY_LABELS: [(&str, &str); 11] = [
    ("impulseControl", "Impulsiveness"),
    ("emotionalVolatility", "Emotional Volatility"),
    ("aggression", "Aggression"),
    ("hesitation", "Hesitation"),
    ("discipline", "Discipline"),
    ("consistency", "Consistency"),
    ("Impulsiveness", "Impulsiveness"),
    ("Consistency", "Consistency"),
    ("Discipline", "Discipline"),
    ("Aggression", "Aggression"),
    ("Hesitation", "Hesitation"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitScore {
    pub key: String,
    pub name: String,
    pub value: f64,
}

/// Display label for a trait key: the mapping table first, otherwise
/// camelCase split into capitalized words.
pub fn trait_label(key: &str) -> String {
    if let Some((_, label)) = KEY_LABELS.iter().find(|(known, _)| *known == key) {
        return label.to_string();
    }

    let mut label = String::with_capacity(key.len() + 4);
    for (index, ch) in key.chars().enumerate() {
        if index == 0 {
            label.extend(ch.to_uppercase());
        } else {
            if ch.is_uppercase() {
                label.push(' ');
            }
            label.push(ch);
        }
    }
    label
}

/// Ranks on the mapped label or the key as written. The capitalized fallback
/// label is for display only, so `impulsiveness` is not canonical.
fn canonical_rank(key: &str) -> usize {
    let label = KEY_LABELS
        .iter()
        .find(|(known, _)| *known == key)
        .map_or(key, |(_, label)| *label);
    CANONICAL_TRAITS
        .iter()
        .position(|canonical| *canonical == label)
        .unwrap_or(CANONICAL_TRAITS.len())
}

/// Orders a trait profile for display and clamps each value to `[0, 100]`.
///
/// Canonical traits come first in canonical order; anything else follows in
/// input order. An empty profile, or `has_no_trades`, yields the canonical
/// traits at zero.
pub fn normalize_traits(profile: &IndexMap<String, f64>, has_no_trades: bool) -> Vec<TraitScore> {
    if profile.is_empty() {
        return CANONICAL_TRAITS
            .iter()
            .map(|name| TraitScore {
                key: name.to_string(),
                name: name.to_string(),
                value: 0.0,
            })
            .collect();
    }

    let mut keys: Vec<&String> = profile
        .keys()
        .filter(|key| key.as_str() != EXCLUDED_TRAIT)
        .collect();
    keys.sort_by_key(|key| canonical_rank(key));

    keys.into_iter()
        .map(|key| {
            let raw = if has_no_trades { 0.0 } else { profile[key.as_str()] };
            let value = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) };
            TraitScore {
                key: key.clone(),
                name: trait_label(key),
                value,
            }
        })
        .collect()
}
