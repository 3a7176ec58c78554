use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Camera Device Error: {0}")]
    Device(String),

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Policy: {0}")]
    Policy(String),

    #[error("File I/O Error: {0}")]
    Io(String),

    #[error("OpenCV Error: {0}")]
    OpenCV(String),
}

// Allow conversion from std::io::Error to AppError::Io
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<opencv::Error> for AppError {
    fn from(err: opencv::Error) -> Self {
        AppError::OpenCV(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}
