//! Error Handling Module
//!
//! Defines the error type shared by the record model, the tree mapper and the
//! image stages. Uses thiserror for ergonomic error definitions.
//!
//! Failures raised while evaluating a matcher or applying a transform are
//! wrapped with the keypath of the terminal being processed, so the caller can
//! tell which entry of the record aborted the call.

use thiserror::Error;

/// Main error type for frame transform operations
#[derive(Error, Debug)]
pub enum FrameError {
    /// A matcher failed while evaluating a terminal
    #[error("match predicate failed for terminal at '{keypath}': {source}")]
    MatchPredicate {
        keypath: String,
        #[source]
        source: Box<FrameError>,
    },

    /// A transform failed on a matched terminal
    #[error("transform failed for terminal at '{keypath}': {source}")]
    Transform {
        keypath: String,
        #[source]
        source: Box<FrameError>,
    },

    /// A required key is absent from the record
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// Encoded bytes could not be decoded into an image
    #[error("Decode error: {0}")]
    Decode(String),

    /// The resizer cannot handle the given tensor
    #[error("Resize error: {0}")]
    Resize(String),

    /// The augmenter rejected its input
    #[error("Augmentation error: {0}")]
    Augment(String),

    /// Tensor shape, dtype or payload mismatch
    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),

    /// Keypaths that cannot form a nested record
    #[error("Invalid record structure: {0}")]
    Structure(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the image codec layer
    #[error("Image error: {0}")]
    Image(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Wrap an error raised by a transform applied at `keypath`
    pub fn transform(keypath: impl Into<String>, source: FrameError) -> Self {
        FrameError::Transform {
            keypath: keypath.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error raised by a matcher evaluated at `keypath`
    pub fn match_predicate(keypath: impl Into<String>, source: FrameError) -> Self {
        FrameError::MatchPredicate {
            keypath: keypath.into(),
            source: Box::new(source),
        }
    }

    /// Keypath of the terminal that caused the failure, when known
    pub fn keypath(&self) -> Option<&str> {
        match self {
            FrameError::MatchPredicate { keypath, .. } | FrameError::Transform { keypath, .. } => {
                Some(keypath)
            }
            _ => None,
        }
    }

    /// The innermost error, skipping keypath wrappers
    pub fn root_cause(&self) -> &FrameError {
        match self {
            FrameError::MatchPredicate { source, .. } | FrameError::Transform { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

impl From<image::ImageError> for FrameError {
    fn from(err: image::ImageError) -> Self {
        FrameError::Image(err.to_string())
    }
}

impl From<toml::de::Error> for FrameError {
    fn from(err: toml::de::Error) -> Self {
        FrameError::Config(err.to_string())
    }
}

/// Convenience Result type for frame transform operations
pub type Result<T> = std::result::Result<T, FrameError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| FrameError::Config(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| FrameError::Config(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| FrameError::MissingKey(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| FrameError::MissingKey(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameError::Decode("not an image".to_string());
        assert_eq!(format!("{}", err), "Decode error: not an image");
    }

    #[test]
    fn test_transform_error_names_keypath() {
        let err = FrameError::transform("observation/image_0", FrameError::Resize("rank 2".into()));
        let msg = err.to_string();
        assert!(msg.contains("observation/image_0"));
        assert!(msg.contains("rank 2"));
        assert_eq!(err.keypath(), Some("observation/image_0"));
        assert!(matches!(err.root_cause(), FrameError::Resize(_)));
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        let err = opt.context("_traj_index").unwrap_err();
        assert!(matches!(err, FrameError::MissingKey(ref k) if k == "_traj_index"));
    }

    #[test]
    fn test_result_context() {
        let parsed: std::result::Result<i32, _> = "twelve".parse::<i32>();
        let err = parsed.context("resize.size.height").unwrap_err();
        assert!(matches!(err, FrameError::Config(ref m) if m.starts_with("resize.size.height: ")));

        let ok: std::result::Result<i32, std::num::ParseIntError> = Ok(3);
        assert_eq!(ok.with_context(|| unreachable!()).unwrap(), 3);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FrameError = io_err.into();
        assert!(matches!(err, FrameError::Io(_)));
        assert!(err.keypath().is_none());
    }
}
