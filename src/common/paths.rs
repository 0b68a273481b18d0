use directories::ProjectDirs;
use std::path::PathBuf;

// Defaults are relative to the working directory, matching the
// `training/<name>/<image>` layout the tool is run against.

pub const CONFIG_FILE_NAME: &str = "facevote.toml";

pub fn default_training_dir() -> PathBuf {
    PathBuf::from("training")
}

pub fn default_validation_dir() -> PathBuf {
    PathBuf::from("validation")
}

pub fn default_encodings_path() -> PathBuf {
    PathBuf::from("output/encodings.bincode")
}

pub fn default_output_dir() -> PathBuf {
    PathBuf::from("output/annotated")
}

pub fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

/// Config files checked in order when no `--config` is given.
pub fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("configs").join(CONFIG_FILE_NAME)];
    if let Some(dirs) = ProjectDirs::from("com", "facevote", "FaceVote") {
        candidates.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    candidates
}
