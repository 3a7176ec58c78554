use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationConfig {
    pub output_directory: String,
    pub camera_index: Option<i32>,         // device index for VideoCapture (default 0)
    pub preferred_width: Option<i32>,      // requested, not mandatory
    pub preferred_height: Option<i32>,
    pub jpeg_quality: Option<u8>,          // JPEG quality (0-100) for submitted frames
    pub cooldown_ms: Option<u64>,          // inter-capture interval for continuous modes
    pub ignore_person: Option<bool>,       // server-side hint, sent with every frame
    pub preview_window: Option<bool>,      // show the annotated frames in a highgui window
    pub filename_timestamp_format: String, // strftime format string
    pub log_level: Option<String>,         // Making it optional to potentially use CLI as primary
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        ApplicationConfig {
            output_directory: "./output".to_string(),
            camera_index: Some(0),
            preferred_width: Some(1280),
            preferred_height: Some(720),
            jpeg_quality: Some(90),
            cooldown_ms: Some(1200),
            ignore_person: Some(true),
            preview_window: Some(false),
            filename_timestamp_format: "%Yy%mm%dd%Hh%Mm%Ss".to_string(),
            log_level: Some("info".to_string()),
        }
    }
}
