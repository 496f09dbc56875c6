use crate::utils::{default_as_true, default_ffmpeg_path, default_recording_max_concurrent,
                   default_recording_max_duration_mins, default_recording_tick_secs};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordingConfig {
    #[serde(default = "default_as_true")]
    pub enabled: bool,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg: String,
    /// relative to `data_dir` if not absolute
    #[serde(default = "default_recording_dir")]
    pub output_dir: String,
    #[serde(default = "default_recording_max_duration_mins")]
    pub max_duration_mins: i64,
    /// overlapping scheduled recordings per user
    #[serde(default = "default_recording_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_recording_tick_secs")]
    pub tick_secs: u64,
}

fn default_recording_dir() -> String { String::from("recordings") }

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ffmpeg: default_ffmpeg_path(),
            output_dir: default_recording_dir(),
            max_duration_mins: default_recording_max_duration_mins(),
            max_concurrent: default_recording_max_concurrent(),
            tick_secs: default_recording_tick_secs(),
        }
    }
}
