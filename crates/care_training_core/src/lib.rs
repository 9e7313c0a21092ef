pub mod calendar;
pub mod categories;
pub mod courses;
pub mod domain;
pub mod intake;
pub mod ports;
pub mod pricing;
pub mod validation;

pub use courses::{CourseDataContext, CourseDataManager, LoadStatus};
pub use domain::{
    CourseDatabase, CourseDatabaseEntry, CourseRecord, DisplayCourse, FormKind, FormSubmission,
    MergedCalendarCourse, PriceValue, RawCourseSource, ScheduledCourse, SiteWideDiscount,
    SubmissionMetadata, TopicCategorySummary,
};
pub use intake::{FieldError, FormInput, FormIntake, IntakeRejection};
pub use ports::{
    CourseDataObserver, CourseDatabaseSource, PortError, PortResult, SubmissionRepository,
    TracingObserver,
};
pub use validation::{AntiBotFields, AntiBotPolicy, AntiBotRejection, RequestContext};
