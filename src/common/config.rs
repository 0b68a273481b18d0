use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::common::error::{FaceVoteError, Result};
use crate::common::paths;
use crate::core::detector::DetectionModel;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "paths::default_training_dir")]
    pub training_dir: PathBuf,
    #[serde(default = "paths::default_validation_dir")]
    pub validation_dir: PathBuf,
    #[serde(default = "paths::default_encodings_path")]
    pub encodings_path: PathBuf,
    /// Where `FileDisplay` writes annotated images.
    #[serde(default = "paths::default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            training_dir: paths::default_training_dir(),
            validation_dir: paths::default_validation_dir(),
            encodings_path: paths::default_encodings_path(),
            output_dir: paths::default_output_dir(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_hog_detector")]
    pub hog_detector_path: PathBuf,
    #[serde(default = "default_cnn_detector")]
    pub cnn_detector_path: PathBuf,
    #[serde(default = "default_encoder")]
    pub encoder_path: PathBuf,
}

fn default_hog_detector() -> PathBuf { paths::default_models_dir().join("face_detector_fast.onnx") }
fn default_cnn_detector() -> PathBuf { paths::default_models_dir().join("face_detector_accurate.onnx") }
fn default_encoder() -> PathBuf { paths::default_models_dir().join("face_encoder.onnx") }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hog_detector_path: default_hog_detector(),
            cnn_detector_path: default_cnn_detector(),
            encoder_path: default_encoder(),
        }
    }
}

impl ModelConfig {
    pub fn detector_path(&self, model: DetectionModel) -> &Path {
        match model {
            DetectionModel::Hog => &self.hog_detector_path,
            DetectionModel::Cnn => &self.cnn_detector_path,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_detector_size")]
    pub input_width: u32,
    #[serde(default = "default_detector_size")]
    pub input_height: u32,
    #[serde(default = "default_confidence")]
    pub confidence_threshold: f32,
    #[serde(default = "default_nms_iou")]
    pub nms_iou: f32,
}

fn default_detector_size() -> u32 { 640 }
fn default_confidence() -> f32 { 0.5 }
fn default_nms_iou() -> f32 { 0.45 }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: default_detector_size(),
            input_height: default_detector_size(),
            confidence_threshold: default_confidence(),
            nms_iou: default_nms_iou(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EncoderConfig {
    #[serde(default = "default_encoder_input")]
    pub input_size: u32,
    #[serde(default = "default_normalization")]
    pub normalization_value: f32,
}

fn default_encoder_input() -> u32 { 112 }
fn default_normalization() -> f32 { 127.5 }

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            input_size: default_encoder_input(),
            normalization_value: default_normalization(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchingConfig {
    /// Maximum Euclidean distance at which two encodings count as the same face.
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
}

pub const DEFAULT_TOLERANCE: f32 = 0.6;

fn default_tolerance() -> f32 { DEFAULT_TOLERANCE }

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrainingConfig {
    #[serde(default = "default_extensions")]
    pub image_extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into(), "png".into()]
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self { image_extensions: default_extensions() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Ascii,
    File,
    Both,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_display_mode")]
    pub mode: DisplayMode,
    /// TrueType font for labels. Falls back to well-known system fonts when unset.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,
}

fn default_display_mode() -> DisplayMode { DisplayMode::Ascii }
fn default_font_scale() -> f32 { 16.0 }

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: default_display_mode(),
            font_path: None,
            font_scale: default_font_scale(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PerformanceConfig {
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u32,
}

fn default_optimization_level() -> u32 { 3 }

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { optimization_level: default_optimization_level() }
    }
}

impl Config {
    /// Resolves the config file (explicit path, then local, then user config dir)
    /// and falls back to built-in defaults when none exists.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        for candidate in paths::config_candidates() {
            if candidate.exists() {
                return Self::load_from_path(&candidate);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceVoteError::Config(format!(
                "Config file not found: {}", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FaceVoteError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.matching.tolerance > 0.0) {
            return Err(FaceVoteError::Config(format!(
                "Matching tolerance must be positive, got {}", self.matching.tolerance
            )));
        }

        if self.detector.confidence_threshold < 0.0 || self.detector.confidence_threshold > 1.0 {
            return Err(FaceVoteError::Config(format!(
                "Detection confidence must be between 0.0 and 1.0, got {}",
                self.detector.confidence_threshold
            )));
        }
        if self.detector.nms_iou <= 0.0 || self.detector.nms_iou > 1.0 {
            return Err(FaceVoteError::Config(format!(
                "NMS IoU threshold must be in (0.0, 1.0], got {}", self.detector.nms_iou
            )));
        }

        if self.detector.input_width == 0 || self.detector.input_width > 4096 {
            return Err(FaceVoteError::Config(format!(
                "Detector input width must be between 1 and 4096, got {}",
                self.detector.input_width
            )));
        }
        if self.detector.input_height == 0 || self.detector.input_height > 4096 {
            return Err(FaceVoteError::Config(format!(
                "Detector input height must be between 1 and 4096, got {}",
                self.detector.input_height
            )));
        }

        if self.encoder.input_size == 0 || self.encoder.input_size > 1024 {
            return Err(FaceVoteError::Config(format!(
                "Encoder input size must be between 1 and 1024, got {}",
                self.encoder.input_size
            )));
        }

        if self.training.image_extensions.is_empty() {
            return Err(FaceVoteError::Config(
                "At least one training image extension is required".into()
            ));
        }

        if self.display.font_scale <= 0.0 {
            return Err(FaceVoteError::Config(format!(
                "Font scale must be positive, got {}", self.display.font_scale
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.paths.training_dir, PathBuf::from("training"));
        assert_eq!(config.paths.validation_dir, PathBuf::from("validation"));
        assert_eq!(config.paths.encodings_path, PathBuf::from("output/encodings.bincode"));
        assert_eq!(config.matching.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.training.image_extensions, vec!["jpg", "jpeg", "png"]);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [matching]
            tolerance = 0.45

            [display]
            mode = "both"
            "#,
        )
        .unwrap();

        assert_eq!(config.matching.tolerance, 0.45);
        assert_eq!(config.display.mode, DisplayMode::Both);
        assert_eq!(config.detector.input_width, 640);
        assert_eq!(config.paths.encodings_path, PathBuf::from("output/encodings.bincode"));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../../configs/facevote.example.toml")).unwrap();
        assert_eq!(config.display.mode, DisplayMode::Ascii);
        assert_eq!(config.models.encoder_path, PathBuf::from("models/face_encoder.onnx"));
    }

    #[test]
    fn test_rejects_non_positive_tolerance() {
        let err = Config::from_toml("[matching]\ntolerance = 0.0\n").unwrap_err();
        assert!(matches!(err, FaceVoteError::Config(_)));
    }

    #[test]
    fn test_rejects_empty_extension_list() {
        let err = Config::from_toml("[training]\nimage_extensions = []\n").unwrap_err();
        assert!(matches!(err, FaceVoteError::Config(_)));
    }

    #[test]
    fn test_detector_path_follows_model() {
        let models = ModelConfig::default();
        assert_eq!(models.detector_path(DetectionModel::Hog), models.hog_detector_path.as_path());
        assert_eq!(models.detector_path(DetectionModel::Cnn), models.cnn_detector_path.as_path());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, FaceVoteError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facevote.toml");
        std::fs::write(&path, "[paths]\nencodings_path = \"store/faces.bin\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.paths.encodings_path, PathBuf::from("store/faces.bin"));
    }
}
