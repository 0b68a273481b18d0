use crate::common::{Config, FaceVoteError, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;

/// Face location in pixel coordinates, ordered the way face-recognition
/// tooling reports it: top, right, bottom, left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    pub confidence: f32,
}

impl FaceBox {
    pub fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self { top, right, bottom, left, confidence: 1.0 }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// Which detection model to run. `Hog` selects the fast detector,
/// `Cnn` the slower, more accurate one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DetectionModel {
    #[default]
    Hog,
    Cnn,
}

impl fmt::Display for DetectionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionModel::Hog => write!(f, "hog"),
            DetectionModel::Cnn => write!(f, "cnn"),
        }
    }
}

pub trait FaceDetector {
    /// Returns every face found in `image`.
    fn face_locations(&self, image: &DynamicImage) -> Result<Vec<FaceBox>>;
}

/// Raw detection in detector input space, before scaling and NMS.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    confidence: f32,
}

pub struct OnnxFaceDetector {
    session: Mutex<Session>,
    model: DetectionModel,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
    nms_iou: f32,
}

impl OnnxFaceDetector {
    pub fn new(config: &Config, model: DetectionModel) -> Result<Self> {
        let model_path = config.models.detector_path(model);
        if !model_path.exists() {
            return Err(FaceVoteError::Model(
                format!("Detector model '{}' not found at: {:?}", model, model_path)
            ));
        }

        let session = load_session(model_path, config.performance.optimization_level)?;

        tracing::debug!("Loaded {} detector from {:?}", model, model_path);

        Ok(Self {
            session: Mutex::new(session),
            model,
            input_width: config.detector.input_width,
            input_height: config.detector.input_height,
            confidence_threshold: config.detector.confidence_threshold,
            nms_iou: config.detector.nms_iou,
        })
    }

    pub fn model(&self) -> DetectionModel {
        self.model
    }

    fn image_to_array(&self, img: &DynamicImage) -> Array4<f32> {
        let rgb = img.to_rgb8();
        let width = rgb.width() as usize;
        let height = rgb.height() as usize;
        let mut array = Array4::<f32>::zeros((1, 3, height, width));

        let norm_factor = 1.0 / 255.0;
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            array[[0, 0, y, x]] = pixel[0] as f32 * norm_factor;
            array[[0, 1, y, x]] = pixel[1] as f32 * norm_factor;
            array[[0, 2, y, x]] = pixel[2] as f32 * norm_factor;
        }

        array
    }

    /// Runs the session and returns the first output as `(shape, values)`.
    fn infer(&self, input: Array4<f32>) -> Result<(Vec<usize>, Vec<f32>)> {
        let input = Tensor::from_array(input)?;
        let mut session = lock_session(&self.session)?;
        let outputs = session.run(ort::inputs![input])?;
        if outputs.len() == 0 {
            return Err(FaceVoteError::Model("Detector produced no output".into()));
        }

        let output = outputs[0].try_extract_array::<f32>()?;
        let shape = output.shape().to_vec();
        let values: Vec<f32> = output.iter().copied().collect();
        Ok((shape, values))
    }

    fn decode_params(&self) -> DecodeParams {
        DecodeParams {
            input_width: self.input_width,
            input_height: self.input_height,
            confidence_threshold: self.confidence_threshold,
            nms_iou: self.nms_iou,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DecodeParams {
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
    nms_iou: f32,
}

/// Decodes YOLO-style `[1, N, 5+]` or transposed `[1, 5+, N]` output into
/// boxes in detector input space, after thresholding and NMS.
fn decode_predictions(values: &[f32], shape: &[usize], params: &DecodeParams) -> Vec<Candidate> {
    let mut faces = Vec::new();

    let (num_predictions, prediction_length, is_transposed) = if shape.len() >= 3 {
        if shape[2] > shape[1] && shape[1] <= 10 {
            (shape[2], shape[1], true)
        } else {
            (shape[1], shape[2], false)
        }
    } else if shape.len() == 2 {
        (shape[0], shape[1], false)
    } else {
        tracing::warn!("Unexpected detector output shape: {:?}", shape);
        return faces;
    };

    if prediction_length < 4 || values.len() < num_predictions * prediction_length {
        tracing::warn!("Detector output does not match its shape: {:?}", shape);
        return faces;
    }

    let at = |i: usize, field: usize| -> f32 {
        if is_transposed {
            values[field * num_predictions + i]
        } else {
            values[i * prediction_length + field]
        }
    };

    let input_width = params.input_width as f32;
    let input_height = params.input_height as f32;

    for i in 0..num_predictions {
        let confidence = if prediction_length > 4 { at(i, 4) } else { 0.0 };
        if confidence < params.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(i, 0), at(i, 1), at(i, 2), at(i, 3));

        // Normalized outputs are scaled per axis into input pixel space
        let (cx, cy, w, h) = if cx > 1.0 || cy > 1.0 || w > 1.0 || h > 1.0 {
            (cx, cy, w, h)
        } else {
            (cx * input_width, cy * input_height, w * input_width, h * input_height)
        };

        let x1 = (cx - w / 2.0).max(0.0);
        let y1 = (cy - h / 2.0).max(0.0);
        let x2 = (cx + w / 2.0).min(input_width);
        let y2 = (cy + h / 2.0).min(input_height);

        if x2 > x1 && y2 > y1 {
            faces.push(Candidate { x1, y1, x2, y2, confidence });
        }
    }

    apply_nms(faces, params.nms_iou)
}

impl FaceDetector for OnnxFaceDetector {
    fn face_locations(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let orig_width = image.width() as f32;
        let orig_height = image.height() as f32;

        let img_array = if image.width() == self.input_width && image.height() == self.input_height {
            self.image_to_array(image)
        } else {
            let resized = image.resize_exact(self.input_width, self.input_height, FilterType::Triangle);
            self.image_to_array(&resized)
        };

        let (shape, values) = self.infer(img_array)?;
        let candidates = decode_predictions(&values, &shape, &self.decode_params());

        let scale_x = orig_width / self.input_width as f32;
        let scale_y = orig_height / self.input_height as f32;

        let faces: Vec<FaceBox> = candidates
            .into_iter()
            .map(|c| FaceBox {
                top: (c.y1 * scale_y).round() as u32,
                right: (c.x2 * scale_x).round().min(orig_width) as u32,
                bottom: (c.y2 * scale_y).round().min(orig_height) as u32,
                left: (c.x1 * scale_x).round() as u32,
                confidence: c.confidence,
            })
            .filter(|f| f.width() > 0 && f.height() > 0)
            .collect();

        tracing::debug!("{} detector found {} face(s)", self.model, faces.len());
        Ok(faces)
    }
}

pub(crate) fn load_session(model_path: &Path, level: u32) -> Result<Session> {
    let session = Session::builder()?
        .with_optimization_level(optimization_level(level))?
        .commit_from_file(model_path)?;
    Ok(session)
}

pub(crate) fn lock_session(session: &Mutex<Session>) -> Result<MutexGuard<'_, Session>> {
    session
        .lock()
        .map_err(|e| FaceVoteError::Model(format!("Session lock poisoned: {}", e)))
}

fn optimization_level(level: u32) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

fn apply_nms(mut boxes: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| calculate_iou(kept, &candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

fn calculate_iou(box1: &Candidate, box2: &Candidate) -> f32 {
    let x1 = box1.x1.max(box2.x1);
    let y1 = box1.y1.max(box2.y1);
    let x2 = box1.x2.min(box2.x2);
    let y2 = box1.y2.min(box2.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = (box1.x2 - box1.x1) * (box1.y2 - box1.y1);
    let area2 = (box2.x2 - box2.x1) * (box2.y2 - box2.y1);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
