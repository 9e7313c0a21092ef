//! crates/care_training_core/src/domain.rs
//!
//! Defines the core data structures for the course catalogue and the form intake.
//! Loosely shaped JSON coming from the CMS is normalised here, once, at the
//! deserialisation boundary.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::pricing::parse_price_text;

//=========================================================================================
// Shared Value Types
//=========================================================================================

/// A price as it appears in CMS data: either a bare number or a formatted string like `"£1,250"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

/// Accepts text that the CMS exports either as a string or as a number; `null` reads as empty.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = string_or_number(deserializer)?;
    Ok((!text.trim().is_empty()).then_some(text))
}

/// A list of labels. `null` is empty and a lone string is a one-element list.
fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()),
        other => Err(serde::de::Error::custom(format!(
            "expected a list of strings, found {}",
            other
        ))),
    }
}

fn optional_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = string_list(deserializer)?;
    Ok((!items.is_empty()).then_some(items))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

/// A number that may arrive as a numeric string. Anything unreadable is `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32))
}

//=========================================================================================
// Course Catalogue
//=========================================================================================

/// A course as supplied by the raw data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub duration: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub hours: Option<f64>,
    #[serde(default)]
    pub price: Option<PriceValue>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub level: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub accreditation: String,
    #[serde(default, deserialize_with = "optional_text")]
    pub mapped_to: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub valid_for: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub location: String,
    #[serde(default, deserialize_with = "string_list")]
    pub trainers: Vec<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub featured: bool,
    #[serde(default, deserialize_with = "string_list")]
    pub learning_outcomes: Vec<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub who_should_attend: Option<String>,
    /// Legacy name of `who_should_attend`, still present in older exports.
    #[serde(default, deserialize_with = "optional_text")]
    pub who_can_join: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub topic_categories: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub industry_sectors: Vec<String>,
}

/// The raw course source injected at startup: either a list or an object keyed by id.
///
/// Records are kept as raw JSON until `into_records`, so one malformed record is
/// skipped instead of failing the whole source.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCourseSource {
    List(Vec<Value>),
    Keyed(BTreeMap<String, Value>),
}

impl RawCourseSource {
    pub fn into_records(self) -> Vec<CourseRecord> {
        let labelled: Vec<(String, Value)> = match self {
            RawCourseSource::List(values) => values
                .into_iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value))
                .collect(),
            RawCourseSource::Keyed(map) => map.into_iter().collect(),
        };
        labelled
            .into_iter()
            .filter_map(|(at, value)| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(record = %at, error = %e, "Skipping malformed course record");
                    None
                }
            })
            .collect()
    }
}

/// Read-only projection of a `CourseRecord`, recomputed on every listing call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayCourse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub hours: Option<f64>,
    pub price: Option<PriceValue>,
    pub level: String,
    pub accreditation: String,
    pub mapped_to: Option<String>,
    pub valid_for: String,
    pub location: String,
    pub trainers: Vec<String>,
    pub featured: bool,
    pub learning_outcomes: Vec<String>,
    pub who_should_attend: Option<String>,
    pub category: String,
    pub category_name: String,
    pub topic_categories: Vec<String>,
    /// Same list as `topic_categories`; older templates still read this name.
    pub topics: Vec<String>,
    pub industry_sectors: Vec<String>,
}

/// One topic category as offered to filter UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCategorySummary {
    pub key: String,
    pub name: String,
    pub count: usize,
}

/// Supplementary descriptive fields for a course, keyed by title in a `CourseDatabase`.
///
/// The remote JSON carries no fixed schema, so the entry keeps the raw object and only
/// exposes typed accessors for the fields the calendar merge reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseDatabaseEntry(Map<String, Value>);

impl CourseDatabaseEntry {
    /// Shallow, field-level merge: every field of `other` overwrites the one here.
    pub fn merge_from(&mut self, other: CourseDatabaseEntry) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// A non-empty string field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// A non-empty array field, keeping only its string elements.
    pub fn text_list(&self, name: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .0
            .get(name)?
            .as_array()?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        (!items.is_empty()).then_some(items)
    }

    pub fn price(&self) -> Option<f64> {
        match self.0.get("price")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_price_text(s),
            _ => None,
        }
    }

    pub fn who_should_attend(&self) -> Option<&str> {
        self.text("whoShouldAttend").or_else(|| self.text("whoCanJoin"))
    }
}

/// Course-by-title map. Titles are matched exactly, case-sensitively.
pub type CourseDatabase = HashMap<String, CourseDatabaseEntry>;

/// A global percentage-off promotion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteWideDiscount {
    pub active: bool,
    pub percentage: f64,
    #[serde(default)]
    pub label: String,
}

impl SiteWideDiscount {
    /// Whether the discount should be considered at all. Percentages outside
    /// `(0, 100]` are ignored.
    pub fn is_effective(&self) -> bool {
        self.active && self.percentage > 0.0 && self.percentage <= 100.0
    }
}

//=========================================================================================
// Calendar
//=========================================================================================

/// One calendar event instance of a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledCourse {
    #[serde(deserialize_with = "string_or_number")]
    pub title: String,
    #[serde(deserialize_with = "string_or_number")]
    pub date: String,
    #[serde(default)]
    pub price: Option<PriceValue>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub spots_left: Option<u32>,
    #[serde(default, deserialize_with = "optional_string_list")]
    pub topic_categories: Option<Vec<String>>,
    #[serde(default, deserialize_with = "optional_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "optional_string_list")]
    pub trainers: Option<Vec<String>>,
    #[serde(default, deserialize_with = "optional_string_list")]
    pub learning_outcomes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "optional_text")]
    pub requirements: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub accessibility_info: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub who_should_attend: Option<String>,
}

/// The price breakdown attached to a calendar course that matched the database.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPricing {
    pub original_price: f64,
    pub custom_price: Option<f64>,
    pub final_price: f64,
    #[serde(skip)]
    pub display_price: String,
    pub has_discount: bool,
    pub discount_percent: u32,
    pub site_wide_discount: Option<SiteWideDiscount>,
    pub site_wide_applied: bool,
}

/// A `ScheduledCourse` enriched with database fields and composed pricing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedCalendarCourse {
    pub title: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_date: Option<String>,
    pub price: Option<PriceValue>,
    pub spots_left: Option<u32>,
    pub location: String,
    pub topic_categories: Vec<String>,
    pub category: Option<String>,
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub level: Option<String>,
    pub image: Option<String>,
    pub trainers: Vec<String>,
    pub learning_outcomes: Vec<String>,
    pub requirements: Option<String>,
    pub accessibility_info: Option<String>,
    pub who_should_attend: Option<String>,
    #[serde(flatten)]
    pub pricing: Option<CalendarPricing>,
}

//=========================================================================================
// Form Intake
//=========================================================================================

/// Which public form a submission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Contact,
    Booking,
    Newsletter,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Contact => "contact",
            FormKind::Booking => "booking",
            FormKind::Newsletter => "newsletter",
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request metadata collected once the anti-bot screening has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionMetadata {
    pub ip: String,
    pub user_agent: String,
    pub referrer: String,
    /// Seconds between the form being rendered and submitted; `None` when the client sent no timestamp.
    pub time_taken: Option<i64>,
}

/// A submission that passed every check and is ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSubmission {
    pub id: Uuid,
    pub kind: FormKind,
    pub name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub course_title: Option<String>,
    pub course_date: Option<String>,
    pub attendees: Option<u32>,
    pub metadata: SubmissionMetadata,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn course_record_accepts_numeric_ids_and_missing_lists() {
        let record: CourseRecord = serde_json::from_value(json!({
            "id": 42,
            "title": "Moving and Handling",
            "price": "£85"
        }))
        .unwrap();

        assert_eq!(record.id, "42");
        assert!(record.topic_categories.is_empty());
        assert_eq!(record.price, Some(PriceValue::Text("£85".into())));
    }

    #[test]
    fn raw_source_accepts_keyed_objects() {
        let source: RawCourseSource = serde_json::from_value(json!({
            "a": { "id": "a", "title": "First Aid" },
            "b": { "id": "b", "title": "Safeguarding" }
        }))
        .unwrap();

        let titles: Vec<_> = source.into_records().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["First Aid", "Safeguarding"]);
    }

    #[test]
    fn course_record_tolerates_nulls_and_numeric_text() {
        let record: CourseRecord = serde_json::from_value(json!({
            "id": 1,
            "title": "Fire Safety",
            "description": null,
            "featured": null,
            "duration": 6,
            "hours": "6.5",
            "trainers": null,
            "topicCategories": "Health & Safety",
            "validFor": ""
        }))
        .unwrap();

        assert_eq!(record.description, "");
        assert!(!record.featured);
        assert_eq!(record.duration, "6");
        assert_eq!(record.hours, Some(6.5));
        assert!(record.trainers.is_empty());
        assert_eq!(record.topic_categories, vec!["Health & Safety".to_string()]);
        assert_eq!(record.valid_for, None);
    }

    #[test]
    fn raw_source_skips_malformed_records() {
        let source: RawCourseSource = serde_json::from_value(json!([
            { "id": 1, "title": "First Aid" },
            { "id": 2, "title": "Broken", "trainers": { "lead": "Jo" } },
            "not a course",
            { "id": 3, "title": "Safeguarding", "featured": "yes" }
        ]))
        .unwrap();

        let records = source.into_records();
        let ids: Vec<_> = records.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(records[1].featured);
    }

    #[test]
    fn scheduled_course_reads_text_spots_and_blank_fields() {
        let event: ScheduledCourse = serde_json::from_value(json!({
            "title": "First Aid",
            "date": "2025-03-04",
            "spotsLeft": "3",
            "location": null,
            "level": "",
            "trainers": null
        }))
        .unwrap();

        assert_eq!(event.spots_left, Some(3));
        assert_eq!(event.location, None);
        assert_eq!(event.level, None);
        assert_eq!(event.trainers, None);

        let event: ScheduledCourse =
            serde_json::from_value(json!({ "title": "X", "date": "d", "spotsLeft": "few" })).unwrap();
        assert_eq!(event.spots_left, None);
    }

    #[test]
    fn oversized_sitewide_discount_is_ignored() {
        let discount = |percentage| SiteWideDiscount {
            active: true,
            percentage,
            label: String::new(),
        };
        assert!(discount(100.0).is_effective());
        assert!(!discount(150.0).is_effective());
        assert!(!discount(0.0).is_effective());
    }

    #[test]
    fn database_entry_accessors_skip_blank_values() {
        let entry: CourseDatabaseEntry = serde_json::from_value(json!({
            "description": "  ",
            "price": "£1,200",
            "trainers": ["Jo", 3, "Sam"],
            "whoCanJoin": "Care staff"
        }))
        .unwrap();

        assert_eq!(entry.text("description"), None);
        assert_eq!(entry.price(), Some(1200.0));
        assert_eq!(entry.text_list("trainers"), Some(vec!["Jo".into(), "Sam".into()]));
        assert_eq!(entry.who_should_attend(), Some("Care staff"));
    }

    #[test]
    fn merged_course_flattens_pricing() {
        let merged = MergedCalendarCourse {
            title: "First Aid".into(),
            date: "12/03/2025".into(),
            original_date: Some("12/03/2025".into()),
            price: Some(PriceValue::Text("£80".into())),
            spots_left: None,
            location: "Maidstone Studios".into(),
            topic_categories: vec![],
            category: None,
            category_name: None,
            description: None,
            duration: None,
            level: None,
            image: None,
            trainers: vec![],
            learning_outcomes: vec![],
            requirements: None,
            accessibility_info: None,
            who_should_attend: None,
            pricing: Some(CalendarPricing {
                original_price: 100.0,
                custom_price: None,
                final_price: 80.0,
                display_price: "£80".into(),
                has_discount: true,
                discount_percent: 20,
                site_wide_discount: None,
                site_wide_applied: false,
            }),
        };

        let value = serde_json::to_value(&merged).unwrap();
        assert_eq!(value["price"], json!("£80"));
        assert_eq!(value["originalPrice"], json!(100.0));
        assert_eq!(value["hasDiscount"], json!(true));
        assert_eq!(value["originalDate"], json!("12/03/2025"));
    }
}
