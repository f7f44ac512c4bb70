pub mod catalog;
pub mod notifier;
pub mod registration;
pub mod scheduling;

pub use notifier::{Audience, AudienceObserver, ScheduleEvent, ScheduleObserver, ScheduleSubject};
pub use scheduling::{CourseReschedule, SchedulingService, SessionPlacement};
