pub mod config;
pub mod error;
pub mod paths;

pub use config::{Config, DisplayMode};
pub use error::{FaceVoteError, Result};
