//! bday-core: birthday reminder scheduling engine

pub mod calendar;
pub mod delivery;
pub mod person;
pub mod preference;
pub mod reminders;
pub mod scheduler;
pub mod source;
pub mod upcoming;

pub use calendar::{
    days_until, days_until_text, format_birthday, is_leap_year, next_occurrence, section_for,
    DateError, MonthDay, Section,
};
pub use delivery::{Authorization, DeliveryError, DeliveryPrimitive, InMemoryDelivery};
pub use person::{BirthdayRecord, RecordError};
pub use preference::{effective_preference, NotificationPreference};
pub use reminders::{event_id, generate_candidates, CandidateEvent, DeliveryTime, EventKind};
pub use scheduler::{
    plan_batch, BirthdayScheduler, PassReport, PassStatus, PlannedBatch, RegistrationFailure,
    RejectedRecord, ScheduleError, SchedulerConfig, DEFAULT_CEILING,
};
pub use source::{ContactSnapshot, ContactSource};
pub use upcoming::{group_by_section, upcoming, UpcomingBirthday, GLANCE_LIMIT};
