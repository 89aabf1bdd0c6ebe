use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Fetch error: {message}")]
    Fetch { message: String },

    #[error("Parsing error: {message}")]
    Parsing { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GeneratorError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
