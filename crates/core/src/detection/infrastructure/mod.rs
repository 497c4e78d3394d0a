pub mod skin_tone_analyzer;
