pub type VersereelResult<T> = Result<T, VersereelError>;

#[derive(thiserror::Error, Debug)]
pub enum VersereelError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("content lookup error: {0}")]
    ContentLookup(String),

    #[error("asset fetch error: {0}")]
    AssetFetch(String),

    #[error("duration probe error: {0}")]
    DurationProbe(String),

    #[error("composition error: {0}")]
    Composition(String),

    #[error("font capability error: {0}")]
    FontCapability(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VersereelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn content_lookup(msg: impl Into<String>) -> Self {
        Self::ContentLookup(msg.into())
    }

    pub fn asset_fetch(msg: impl Into<String>) -> Self {
        Self::AssetFetch(msg.into())
    }

    pub fn duration_probe(msg: impl Into<String>) -> Self {
        Self::DurationProbe(msg.into())
    }

    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::FontCapability(msg.into())
    }

    /// True for failures the caller could have prevented before any I/O
    /// (bad request parameters, unknown fonts). Maps to a 4xx-equivalent
    /// status at an HTTP boundary.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::FontCapability(_))
    }
}
