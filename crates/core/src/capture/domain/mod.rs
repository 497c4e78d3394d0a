pub mod camera;
pub mod capture_session;
pub mod tick_scheduler;
