pub mod bounding_box;
pub mod capture_error;
pub mod constants;
pub mod frame;
