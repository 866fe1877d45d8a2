use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeederError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    // Feed document errors
    #[error("Malformed feed document: {0}")]
    MalformedDocument(String),

    #[error("Failed to persist feed document: {0}")]
    Persistence(String),

    // Per-item failures carry the identifier being processed
    #[error("Failed while processing {identifier}: {source}")]
    ItemFailed {
        identifier: String,
        #[source]
        source: Box<FeederError>,
    },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeederError {
    pub fn for_item(identifier: &str, source: FeederError) -> Self {
        FeederError::ItemFailed {
            identifier: identifier.to_string(),
            source: Box::new(source),
        }
    }
}

pub type FeederResult<T> = Result<T, FeederError>;
