use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaceVoteError {
    #[error("Encoding store unavailable at {path}: {reason}. Run with --train first.")]
    MissingStore { path: PathBuf, reason: String },

    #[error("Could not load image {path}: {reason}")]
    ImageLoad { path: PathBuf, reason: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(PathBuf),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FaceVoteError {
    pub fn missing_store(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MissingStore {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn image_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ImageLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FaceVoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_store_message_names_path() {
        let err = FaceVoteError::missing_store("output/encodings.bincode", "not found");
        let msg = err.to_string();
        assert!(msg.contains("output/encodings.bincode"));
        assert!(msg.contains("--train"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FaceVoteError = io.into();
        assert!(matches!(err, FaceVoteError::Io(_)));
    }
}
