//! Error types shared across Reelsmith crates.

use std::path::PathBuf;

/// Boxed cause carried by conversion failures.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for Reelsmith operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelsmithError {
    /// Missing or malformed preset/config field. Raised before any media I/O.
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Directory not found: {path}")]
    NotFound { path: PathBuf },

    #[error("No files found in {} with extensions: {}", dir.display(), extensions.join(", "))]
    EmptyPool {
        dir: PathBuf,
        extensions: Vec<String>,
    },

    #[error("Need at least {required} different items in the pool, found {available}")]
    InsufficientPool { required: usize, available: usize },

    #[error("Failed to convert image {}: {source}", path.display())]
    Conversion {
        path: PathBuf,
        #[source]
        source: BoxedCause,
    },

    #[error("Audio too short ({actual_secs:.3}s < {required_secs:.3}s): {}", path.display())]
    AudioTooShort {
        path: PathBuf,
        actual_secs: f64,
        required_secs: f64,
    },

    /// The encoding engine reported failure; `message` carries its diagnostics.
    #[error("Render error: {message}")]
    Render { message: String },

    /// Filter graph bookkeeping violated (duplicate or dangling label).
    #[error("Filter graph error: {message}")]
    Graph { message: String },

    #[error("Preset store error: {message}")]
    Preset { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using ReelsmithError.
pub type ReelsmithResult<T> = Result<T, ReelsmithError>;

impl ReelsmithError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph {
            message: msg.into(),
        }
    }

    pub fn preset(msg: impl Into<String>) -> Self {
        Self::Preset {
            message: msg.into(),
        }
    }

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn conversion(path: impl Into<PathBuf>, source: impl Into<BoxedCause>) -> Self {
        Self::Conversion {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Whether this error must abort a whole batch rather than a single item.
    ///
    /// Configuration errors and an unusable shared pool are detected before
    /// any item starts; everything else is scoped to the job that raised it.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InsufficientPool { .. })
    }

    /// Short machine-readable kind, used in progress events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "configuration",
            Self::NotFound { .. } => "not_found",
            Self::EmptyPool { .. } => "empty_pool",
            Self::InsufficientPool { .. } => "insufficient_pool",
            Self::Conversion { .. } => "conversion",
            Self::AudioTooShort { .. } => "audio_too_short",
            Self::Render { .. } => "render",
            Self::Graph { .. } => "graph",
            Self::Preset { .. } => "preset",
            Self::Io(_) => "io",
        }
    }
}
