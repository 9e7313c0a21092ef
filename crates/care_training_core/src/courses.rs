//! crates/care_training_core/src/courses.rs
//!
//! The course catalogue: display projection, lookups, search and the single-flight
//! load of the title-keyed course database.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::categories::{
    category_display_name, map_url_category_to_key, primary_topic_category,
    simplify_accreditation, topic_category_to_key, ALL_CATEGORIES_KEY, OTHER_CATEGORY_KEY,
    OTHER_CATEGORY_NAME,
};
use crate::domain::{
    CourseDatabase, CourseDatabaseEntry, CourseRecord, DisplayCourse, SiteWideDiscount,
    TopicCategorySummary,
};
use crate::ports::{CourseDataObserver, CourseDatabaseSource, TracingObserver};

const DEFAULT_VALID_FOR: &str = "Permanent";

//=========================================================================================
// Context and Load State
//=========================================================================================

/// Everything the server renders into the page before the catalogue is used.
#[derive(Debug, Clone, Default)]
pub struct CourseDataContext {
    pub raw_courses: Option<Vec<CourseRecord>>,
    /// Course database entries known before the remote file is fetched.
    pub course_database: CourseDatabase,
    pub sitewide_discount: Option<SiteWideDiscount>,
}

type SharedLoad = Shared<BoxFuture<'static, bool>>;

enum LoadState {
    Idle,
    Loading(SharedLoad),
    Loaded,
    Failed,
}

/// Observable view of the database load state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

//=========================================================================================
// Pure Helpers
//=========================================================================================

/// Merges a fetched database into the existing one, keyed by title.
///
/// Titles present in both are merged field by field with the remote value winning;
/// titles only present remotely are inserted as they are.
pub fn merge_course_database(existing: &mut CourseDatabase, remote: CourseDatabase) {
    for (title, entry) in remote {
        match existing.get_mut(&title) {
            Some(current) => current.merge_from(entry),
            None => {
                existing.insert(title, entry);
            }
        }
    }
}

/// Projects a raw course record into the shape the templates render.
pub fn transform_course_for_display(course: &CourseRecord) -> DisplayCourse {
    DisplayCourse {
        id: course.id.clone(),
        title: course.title.clone(),
        description: course.description.clone(),
        duration: course.duration.clone(),
        hours: course.hours,
        price: course.price.clone(),
        level: course.level.clone(),
        accreditation: simplify_accreditation(&course.accreditation),
        mapped_to: course.mapped_to.clone(),
        valid_for: course
            .valid_for
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_VALID_FOR.to_string()),
        location: course.location.clone(),
        trainers: course.trainers.clone(),
        featured: course.featured,
        learning_outcomes: course.learning_outcomes.clone(),
        who_should_attend: course
            .who_should_attend
            .clone()
            .or_else(|| course.who_can_join.clone()),
        category: primary_topic_category(&course.topic_categories),
        category_name: category_display_name(&course.topic_categories),
        topic_categories: course.topic_categories.clone(),
        topics: course.topic_categories.clone(),
        industry_sectors: course.industry_sectors.clone(),
    }
}

fn filter_by_search(courses: Vec<DisplayCourse>, query: &str) -> Vec<DisplayCourse> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return courses;
    }
    courses
        .into_iter()
        .filter(|c| {
            c.title.to_lowercase().contains(&needle)
                || c.description.to_lowercase().contains(&needle)
                || c.topics.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .collect()
}

//=========================================================================================
// CourseDataManager
//=========================================================================================

/// Read access to the course catalogue plus the lazily merged course database.
///
/// Cloning is cheap; clones share the database and its load state.
#[derive(Clone)]
pub struct CourseDataManager {
    pub(crate) raw_courses: Arc<Vec<CourseRecord>>,
    pub(crate) sitewide_discount: Option<SiteWideDiscount>,
    database: Arc<RwLock<CourseDatabase>>,
    source: Arc<dyn CourseDatabaseSource>,
    observer: Arc<dyn CourseDataObserver>,
    load_state: Arc<Mutex<LoadState>>,
}

impl CourseDataManager {
    pub fn new(context: CourseDataContext, source: Arc<dyn CourseDatabaseSource>) -> Self {
        Self::with_observer(context, source, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        context: CourseDataContext,
        source: Arc<dyn CourseDatabaseSource>,
        observer: Arc<dyn CourseDataObserver>,
    ) -> Self {
        Self {
            raw_courses: Arc::new(context.raw_courses.unwrap_or_default()),
            sitewide_discount: context.sitewide_discount,
            database: Arc::new(RwLock::new(context.course_database)),
            source,
            observer,
            load_state: Arc::new(Mutex::new(LoadState::Idle)),
        }
    }

    // --- Listing and Lookup ---

    /// All courses in display form. Empty means "not loaded yet", not "no courses".
    pub fn get_courses(&self) -> Vec<DisplayCourse> {
        if self.raw_courses.is_empty() {
            self.observer.course_source_missing();
            return Vec::new();
        }
        self.raw_courses
            .iter()
            .map(transform_course_for_display)
            .collect()
    }

    pub fn get_course_by_id(&self, id: &str) -> Option<DisplayCourse> {
        self.get_courses().into_iter().find(|c| c.id == id)
    }

    /// Exact, case-sensitive title match.
    pub fn get_course_by_title(&self, title: &str) -> Option<DisplayCourse> {
        self.raw_course_by_title(title)
            .map(transform_course_for_display)
    }

    pub(crate) fn raw_course_by_title(&self, title: &str) -> Option<&CourseRecord> {
        self.raw_courses.iter().find(|c| c.title == title)
    }

    pub fn get_courses_by_category(&self, category_key: &str) -> Vec<DisplayCourse> {
        let courses = self.get_courses();
        if category_key == ALL_CATEGORIES_KEY {
            return courses;
        }
        courses
            .into_iter()
            .filter(|c| c.category == category_key)
            .collect()
    }

    /// Same as `get_courses_by_category`, for a raw `category` query parameter.
    pub fn get_courses_by_url_category(&self, url_category: &str) -> Vec<DisplayCourse> {
        self.get_courses_by_category(&map_url_category_to_key(url_category))
    }

    /// Case-insensitive substring search over title, description and topics.
    pub fn search_courses(&self, query: &str) -> Vec<DisplayCourse> {
        filter_by_search(self.get_courses(), query)
    }

    /// A legacy-aware category filter and a search, over a single pass of the catalogue.
    pub fn find_courses(&self, url_category: &str, query: &str) -> Vec<DisplayCourse> {
        filter_by_search(self.get_courses_by_url_category(url_category), query)
    }

    /// Every topic category in first-seen order, with the number of courses tagged with it.
    pub fn get_topic_categories(&self) -> Vec<TopicCategorySummary> {
        let mut summaries: Vec<TopicCategorySummary> = Vec::new();
        for course in self.get_courses() {
            let tagged: Vec<(String, String)> = if course.topic_categories.is_empty() {
                vec![(OTHER_CATEGORY_KEY.to_string(), OTHER_CATEGORY_NAME.to_string())]
            } else {
                course
                    .topic_categories
                    .iter()
                    .map(|name| (topic_category_to_key(name), name.clone()))
                    .collect()
            };
            for (key, name) in tagged {
                match summaries.iter_mut().find(|s| s.key == key) {
                    Some(summary) => summary.count += 1,
                    None => summaries.push(TopicCategorySummary { key, name, count: 1 }),
                }
            }
        }
        summaries
    }

    // --- Course Database ---

    pub fn course_database_entry(&self, title: &str) -> Option<CourseDatabaseEntry> {
        read(&self.database).get(title).cloned()
    }

    pub fn course_database_snapshot(&self) -> CourseDatabase {
        read(&self.database).clone()
    }

    pub fn load_status(&self) -> LoadStatus {
        match &*lock(&self.load_state) {
            LoadState::Idle => LoadStatus::Idle,
            LoadState::Loading(_) => LoadStatus::Loading,
            LoadState::Loaded => LoadStatus::Loaded,
            LoadState::Failed => LoadStatus::Failed,
        }
    }

    /// Fetches and merges the remote course database once.
    ///
    /// Concurrent callers share the in-flight fetch. After a failure the next call fetches
    /// again. Never errors; returns whether the database is loaded.
    pub async fn ensure_course_database_loaded(&self) -> bool {
        match self.begin_load() {
            Some(pending) => pending.await,
            None => true,
        }
    }

    /// Starts the database load in the background without waiting for it.
    pub fn trigger_database_load(&self) {
        if self.load_status() == LoadStatus::Loaded {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                if let Some(pending) = self.begin_load() {
                    handle.spawn(pending);
                }
            }
            Err(_) => debug!("No async runtime; course database load not started"),
        }
    }

    /// The in-flight load, started if needed; `None` once the database is loaded.
    fn begin_load(&self) -> Option<SharedLoad> {
        let mut state = lock(&self.load_state);
        let in_flight = match &*state {
            LoadState::Loaded => return None,
            LoadState::Loading(pending) => Some(pending.clone()),
            LoadState::Idle | LoadState::Failed => None,
        };
        Some(in_flight.unwrap_or_else(|| {
            let pending = self.start_load();
            *state = LoadState::Loading(pending.clone());
            pending
        }))
    }

    fn start_load(&self) -> SharedLoad {
        let source = Arc::clone(&self.source);
        let database = Arc::clone(&self.database);
        let observer = Arc::clone(&self.observer);
        let load_state = Arc::clone(&self.load_state);

        async move {
            let loaded = match source.fetch_course_database().await {
                Ok(remote) => {
                    let entries = {
                        let mut database = write(&database);
                        merge_course_database(&mut database, remote);
                        database.len()
                    };
                    observer.database_loaded(entries);
                    true
                }
                Err(e) => {
                    observer.database_load_failed(&e);
                    false
                }
            };
            *lock(&load_state) = if loaded {
                LoadState::Loaded
            } else {
                LoadState::Failed
            };
            loaded
        }
        .boxed()
        .shared()
    }
}
