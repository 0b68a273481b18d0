pub mod cli;
pub mod common;
pub mod core;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::common::{Config, FaceVoteError, Result};
pub use crate::core::{DetectionModel, FaceBox, FaceRecognizer, RecognizedFace};
pub use crate::storage::{EncodingStore, EncodingTable, ImageFilter};
