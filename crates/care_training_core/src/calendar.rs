//! crates/care_training_core/src/calendar.rs
//!
//! Enriches calendar events with course database fields and composed pricing.

use crate::categories::{topic_category_to_key, OTHER_CATEGORY_KEY, OTHER_CATEGORY_NAME};
use crate::courses::CourseDataManager;
use crate::domain::{
    CourseDatabaseEntry, CourseRecord, MergedCalendarCourse, PriceValue, ScheduledCourse,
};
use crate::pricing::compose_calendar_price;

/// Venue shown when neither the event nor the course names one.
pub const DEFAULT_LOCATION: &str = "Maidstone Studios";

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

/// Event categories first, then the raw course's, then the event's single category string.
fn resolve_topic_categories(scheduled: &ScheduledCourse, raw: Option<&CourseRecord>) -> Vec<String> {
    if let Some(categories) = scheduled.topic_categories.as_ref().filter(|c| !c.is_empty()) {
        return categories.clone();
    }
    if let Some(raw) = raw.filter(|r| !r.topic_categories.is_empty()) {
        return raw.topic_categories.clone();
    }
    non_empty(&scheduled.category).map(|c| vec![c]).unwrap_or_default()
}

fn resolve_location(
    scheduled: &ScheduledCourse,
    entry: Option<&CourseDatabaseEntry>,
    raw: Option<&CourseRecord>,
) -> String {
    non_empty(&scheduled.location)
        .or_else(|| entry.and_then(|e| e.text("location")).map(str::to_string))
        .or_else(|| {
            raw.map(|r| r.location.clone())
                .filter(|l| !l.trim().is_empty())
        })
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string())
}

impl CourseDataManager {
    /// Merges one scheduled event with what is known about its course.
    ///
    /// Starts the database load without waiting for it, so the first calls of a page may
    /// only see the seeded database. The event's `date` is never reformatted.
    pub fn merge_course_data_for_calendar(&self, scheduled: &ScheduledCourse) -> MergedCalendarCourse {
        self.trigger_database_load();
        self.merge_scheduled(scheduled)
    }

    /// Merges a whole calendar, starting the database load at most once.
    pub fn merge_calendar(&self, scheduled: &[ScheduledCourse]) -> Vec<MergedCalendarCourse> {
        self.trigger_database_load();
        scheduled.iter().map(|s| self.merge_scheduled(s)).collect()
    }

    fn merge_scheduled(&self, scheduled: &ScheduledCourse) -> MergedCalendarCourse {
        let entry = self.course_database_entry(&scheduled.title);
        let raw = self.raw_course_by_title(&scheduled.title);
        let topic_categories = resolve_topic_categories(scheduled, raw);
        let location = resolve_location(scheduled, entry.as_ref(), raw);

        let Some(entry) = entry else {
            return MergedCalendarCourse {
                title: scheduled.title.clone(),
                date: scheduled.date.clone(),
                original_date: None,
                price: scheduled.price.clone(),
                spots_left: scheduled.spots_left,
                location,
                topic_categories,
                category: scheduled.category.clone(),
                category_name: None,
                description: scheduled.description.clone(),
                duration: scheduled.duration.clone(),
                level: scheduled.level.clone(),
                image: scheduled.image.clone(),
                trainers: scheduled.trainers.clone().unwrap_or_default(),
                learning_outcomes: scheduled.learning_outcomes.clone().unwrap_or_default(),
                requirements: scheduled.requirements.clone(),
                accessibility_info: scheduled.accessibility_info.clone(),
                who_should_attend: scheduled.who_should_attend.clone(),
                pricing: None,
            };
        };

        let pricing = compose_calendar_price(
            entry.price().unwrap_or(0.0),
            scheduled.price.as_ref(),
            self.sitewide_discount.as_ref(),
        );

        let category_name = entry
            .text("category")
            .map(str::to_string)
            .or_else(|| topic_categories.first().cloned())
            .or_else(|| non_empty(&scheduled.category));
        let (category, category_name) = match category_name {
            Some(name) => (topic_category_to_key(&name), name),
            None => (OTHER_CATEGORY_KEY.to_string(), OTHER_CATEGORY_NAME.to_string()),
        };

        let db_text = |name: &str, fallback: &Option<String>| {
            entry
                .text(name)
                .map(str::to_string)
                .or_else(|| fallback.clone())
        };
        let db_list = |name: &str, fallback: &Option<Vec<String>>| {
            entry
                .text_list(name)
                .or_else(|| fallback.clone())
                .unwrap_or_default()
        };

        MergedCalendarCourse {
            title: scheduled.title.clone(),
            date: scheduled.date.clone(),
            original_date: Some(scheduled.date.clone()),
            price: Some(PriceValue::Text(pricing.display_price.clone())),
            spots_left: scheduled.spots_left,
            location,
            topic_categories,
            category: Some(category),
            category_name: Some(category_name),
            description: db_text("description", &scheduled.description),
            duration: db_text("duration", &scheduled.duration),
            level: db_text("level", &scheduled.level),
            image: db_text("image", &scheduled.image),
            trainers: db_list("trainers", &scheduled.trainers),
            learning_outcomes: db_list("learningOutcomes", &scheduled.learning_outcomes),
            requirements: db_text("requirements", &scheduled.requirements),
            accessibility_info: db_text("accessibilityInfo", &scheduled.accessibility_info),
            who_should_attend: entry
                .who_should_attend()
                .map(str::to_string)
                .or_else(|| scheduled.who_should_attend.clone()),
            pricing: Some(pricing),
        }
    }
}
