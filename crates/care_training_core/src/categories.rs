//! crates/care_training_core/src/categories.rs
//!
//! Topic category keys, the legacy URL category table and accreditation labels.

use std::sync::OnceLock;

use regex::Regex;

/// Key used when a course carries no topic category at all.
pub const OTHER_CATEGORY_KEY: &str = "other";
/// Label used alongside `OTHER_CATEGORY_KEY`.
pub const OTHER_CATEGORY_NAME: &str = "Other";
/// Key meaning "do not filter".
pub const ALL_CATEGORIES_KEY: &str = "all";

const SKILLS_FOR_HEALTH: &str = "Skills for Health";
const SKILLS_FOR_HEALTH_FRAMEWORK: &str = "Skills for Health UK Core Skills Training Framework";

/// Query-parameter values from the previous site, mapped to current topic category keys.
const LEGACY_URL_CATEGORIES: [(&str, &str); 14] = [
    ("core-health-social-care", "core-care-skills"),
    ("core-skills", "core-care-skills"),
    ("core-care", "core-care-skills"),
    ("health-safety", "health-safety-compliance"),
    ("health-and-safety", "health-safety-compliance"),
    ("medication", "medication-clinical-skills"),
    ("medication-management", "medication-clinical-skills"),
    ("safeguarding-training", "safeguarding"),
    ("specialist-health", "specialist-conditions"),
    ("specialist-care", "specialist-conditions"),
    ("emergency-first-aid", "first-aid"),
    ("first-aid-training", "first-aid"),
    ("communication-workplace", "communication-workplace-culture"),
    ("communication", "communication-workplace-culture"),
];

fn non_alphanumeric_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

/// Derives the URL-safe key of a topic category, e.g. `"Core Care Skills"` → `"core-care-skills"`.
pub fn topic_category_to_key(name: &str) -> String {
    let lowered = name.to_lowercase();
    non_alphanumeric_runs()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// The key of the first topic category, or `"other"` when there is none.
///
/// Source order is significant: authors control precedence by ordering categories.
pub fn primary_topic_category<S: AsRef<str>>(categories: &[S]) -> String {
    categories
        .first()
        .map(|first| topic_category_to_key(first.as_ref()))
        .unwrap_or_else(|| OTHER_CATEGORY_KEY.to_string())
}

/// The human label of the first topic category, or `"Other"`.
pub fn category_display_name<S: AsRef<str>>(categories: &[S]) -> String {
    categories
        .first()
        .map(|first| first.as_ref().to_string())
        .unwrap_or_else(|| OTHER_CATEGORY_NAME.to_string())
}

/// Translates a `category` query parameter from an old bookmark into a current key.
pub fn map_url_category_to_key(url_category: &str) -> String {
    if url_category.is_empty() {
        return ALL_CATEGORIES_KEY.to_string();
    }
    LEGACY_URL_CATEGORIES
        .iter()
        .find(|(legacy, _)| *legacy == url_category)
        .map(|(_, current)| current.to_string())
        .unwrap_or_else(|| url_category.to_string())
}

/// Picks the single accreditation label worth showing from a `|`-separated list.
///
/// Priority: Care Certificate, then Skills for Care, then Skills for Health (collapsed to
/// its short name), then whatever was listed first.
pub fn simplify_accreditation(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    if !raw.contains('|') {
        if raw.trim().starts_with(SKILLS_FOR_HEALTH_FRAMEWORK) {
            return SKILLS_FOR_HEALTH.to_string();
        }
        return raw.to_string();
    }

    let candidates: Vec<&str> = raw
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    if let Some(found) = candidates.iter().find(|c| c.contains("Care Certificate")) {
        return found.to_string();
    }
    if let Some(found) = candidates.iter().find(|c| c.contains("Skills for Care")) {
        return found.to_string();
    }
    if candidates.iter().any(|c| c.contains(SKILLS_FOR_HEALTH)) {
        return SKILLS_FOR_HEALTH.to_string();
    }
    candidates
        .first()
        .map(|c| c.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_collapse_punctuation_runs() {
        assert_eq!(topic_category_to_key("Core Care Skills"), "core-care-skills");
        assert_eq!(
            topic_category_to_key("  Health & Safety / Compliance!! "),
            "health-safety-compliance"
        );
        assert_eq!(topic_category_to_key(""), "");
        assert_eq!(topic_category_to_key("---"), "");
    }

    #[test]
    fn key_derivation_is_idempotent() {
        for name in ["Medication & Clinical Skills", "First Aid", "  x--y  ", "Ünïcode Care"] {
            let once = topic_category_to_key(name);
            assert_eq!(topic_category_to_key(&once), once);
        }
    }

    #[test]
    fn primary_category_uses_first_entry_in_source_order() {
        let list = vec!["Safeguarding".to_string(), "Core Care Skills".to_string()];
        assert_eq!(primary_topic_category(&list), "safeguarding");
        assert_eq!(primary_topic_category::<String>(&[]), "other");
        assert_eq!(category_display_name::<&str>(&[]), "Other");
    }

    #[test]
    fn legacy_url_categories_are_mapped() {
        assert_eq!(map_url_category_to_key("core-health-social-care"), "core-care-skills");
        assert_eq!(map_url_category_to_key("first-aid-training"), "first-aid");
        assert_eq!(map_url_category_to_key("unknown-slug"), "unknown-slug");
        assert_eq!(map_url_category_to_key(""), "all");
    }

    #[test]
    fn accreditation_priority_order() {
        assert_eq!(
            simplify_accreditation("Skills for Health UK Core Skills Training Framework|Care Certificate"),
            "Care Certificate"
        );
        assert_eq!(
            simplify_accreditation("CPD Certified|Skills for Care Endorsed"),
            "Skills for Care Endorsed"
        );
        assert_eq!(
            simplify_accreditation("CPD|Skills for Health UK Core Skills Training Framework"),
            "Skills for Health"
        );
        assert_eq!(simplify_accreditation("Foo|Bar"), "Foo");
    }

    #[test]
    fn accreditation_without_delimiter() {
        assert_eq!(
            simplify_accreditation("Skills for Health UK Core Skills Training Framework (CSTF)"),
            "Skills for Health"
        );
        assert_eq!(simplify_accreditation("CPD Certified"), "CPD Certified");
        assert_eq!(simplify_accreditation(""), "");
    }
}
