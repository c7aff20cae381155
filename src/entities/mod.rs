pub mod audit_logs;
pub mod event_participations;
pub mod events;
pub mod gifts;
pub mod organizations;
pub mod users;

pub use audit_logs as audit_log_entity;
pub use event_participations as event_participation_entity;
pub use events as event_entity;
pub use events::EventStatus;
pub use gifts as gift_entity;
pub use organizations as organization_entity;
pub use users as user_entity;
