pub mod course;
pub mod day;
pub mod registration;
pub mod session;

pub use course::{Course, CourseScheduleUpdate, NewCourseRequest, PrerequisiteRequest};
pub use day::{Day, ParseDayError};
pub use registration::{
    ApproveRequest, CourseReference, CourseRequest, RegistrationDetail, RegistrationSet,
    RegistrationStatus, SemesterRequest,
};
pub use session::{NewRoomRequest, NewSessionRequest, Room, Session, UpdateSessionRequest};
