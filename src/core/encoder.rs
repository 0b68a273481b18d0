use crate::common::{Config, FaceVoteError, Result};
use crate::core::detector::{load_session, lock_session, FaceBox};
use ort::session::Session;
use ort::value::Tensor;
use std::sync::Mutex;
use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;

/// Fixed-length feature vector describing one face.
pub type Encoding = Vec<f32>;

pub trait FaceEncoder {
    /// Produces one encoding per box, in the same order as `faces`.
    fn face_encodings(&self, image: &DynamicImage, faces: &[FaceBox]) -> Result<Vec<Encoding>>;
}

pub struct OnnxFaceEncoder {
    session: Mutex<Session>,
    input_size: u32,
    normalization_value: f32,
}

impl OnnxFaceEncoder {
    pub fn new(config: &Config) -> Result<Self> {
        let model_path = &config.models.encoder_path;
        if !model_path.exists() {
            return Err(FaceVoteError::Model(
                format!("Encoder model not found at: {:?}", model_path)
            ));
        }

        let session = load_session(model_path, config.performance.optimization_level)?;

        Ok(Self {
            session: Mutex::new(session),
            input_size: config.encoder.input_size,
            normalization_value: config.encoder.normalization_value,
        })
    }

    fn encode_one(&self, image: &DynamicImage, face: &FaceBox) -> Result<Encoding> {
        let face_img = image.crop_imm(face.left, face.top, face.width().max(1), face.height().max(1));
        let resized = face_img.resize_exact(self.input_size, self.input_size, FilterType::Triangle);

        let input = Tensor::from_array(self.preprocess_face(&resized))?;

        let mut session = lock_session(&self.session)?;
        let outputs = session.run(ort::inputs![input])?;
        if outputs.len() == 0 {
            return Err(FaceVoteError::Model("Encoder produced no output".into()));
        }

        let encoding: Encoding = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        Ok(encoding)
    }

    // ArcFace-style normalization: (p - n) / n per channel
    fn preprocess_face(&self, img: &DynamicImage) -> Array4<f32> {
        let rgb = img.to_rgb8();
        let size = self.input_size as usize;
        let norm_val = self.normalization_value;
        let mut array = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                array[[0, c, y, x]] = (pixel[c] as f32 - norm_val) / norm_val;
            }
        }

        array
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn face_encodings(&self, image: &DynamicImage, faces: &[FaceBox]) -> Result<Vec<Encoding>> {
        faces.iter().map(|face| self.encode_one(image, face)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_encoder_model_is_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.models.encoder_path = dir.path().join("encoder.onnx");

        let err = OnnxFaceEncoder::new(&config).err().unwrap();
        assert!(matches!(err, FaceVoteError::Model(msg) if msg.contains("encoder.onnx")));
    }
}
