/// Maximum assignment title length in characters
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum assignment description length in characters
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Maximum feeling / sub-feeling label length in characters
pub const MAX_FEELING_LEN: usize = 100;

/// Maximum narration text length in characters
pub const MAX_VOICE_TEXT_LEN: usize = 300;

/// Sub-feelings allowed under one main color
pub const MAX_SUB_FEELINGS: usize = 10;

/// A sub-feeling carries either no final options or exactly this many
pub const FINAL_OPTION_COUNT: usize = 2;

/// Speech rate bounds for TTS narration
pub const MIN_SPEECH_RATE: f64 = 0.5;
pub const MAX_SPEECH_RATE: f64 = 2.0;

/// Default narration language
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Suffix appended to the title of a duplicated assignment
pub const COPY_SUFFIX: &str = " (Copy)";
