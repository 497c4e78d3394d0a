pub mod track_engagement_use_case;
pub mod tracking_logger;
