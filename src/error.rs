//! Error types for bleepd.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BleepdError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio device errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio stream failed: {message}")]
    AudioStream { message: String },

    // Recognizer errors
    #[error("Whisper model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Recognizer initialization failed: {message}")]
    RecognizerInit { message: String },

    #[error("Recognizer inference failed: {message}")]
    RecognizerFailed { message: String },

    // Lexicon errors
    #[error("Profanity lexicon not found at {path}")]
    LexiconNotFound { path: String },

    #[error("Failed to load profanity lexicon: {message}")]
    LexiconLoad { message: String },

    // Engine lifecycle errors
    #[error("Engine state error: {message}")]
    EngineState { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BleepdError>;
