pub mod detection_result;
pub mod frame_analyzer;
pub mod skin_tone;
