pub mod ffmpeg_camera;
pub mod frame_clock_scheduler;
pub mod still_image_source;
