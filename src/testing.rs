//! Test doubles for the detector, encoder and display seams.

use crate::common::Result;
use crate::core::detector::{FaceBox, FaceDetector};
use crate::core::encoder::{Encoding, FaceEncoder};
use crate::core::sink::DisplaySink;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

pub const TEST_IMAGE_SIZE: u32 = 64;

/// Writes a solid-colour image, creating parent directories.
pub fn write_image(path: &Path, color: [u8; 3]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(TEST_IMAGE_SIZE, TEST_IMAGE_SIZE, Rgb(color))
        .save(path)
        .unwrap();
}

/// Finds one centred face in any image that is not (nearly) black.
pub struct ColorDetector;

impl FaceDetector for ColorDetector {
    fn face_locations(&self, image: &DynamicImage) -> Result<Vec<FaceBox>> {
        let pixel = image.to_rgb8().get_pixel(0, 0).0;
        let brightness: u32 = pixel.iter().map(|&c| c as u32).sum();
        if brightness < 30 {
            return Ok(Vec::new());
        }
        let (w, h) = (image.width(), image.height());
        Ok(vec![FaceBox::new(h / 4, w * 3 / 4, h / 2, w / 4)])
    }
}

/// Encodes a face as the normalised colour of the image's top-left pixel.
pub struct ColorEncoder;

impl FaceEncoder for ColorEncoder {
    fn face_encodings(&self, image: &DynamicImage, faces: &[FaceBox]) -> Result<Vec<Encoding>> {
        let pixel = image.to_rgb8().get_pixel(0, 0).0;
        let encoding: Encoding = pixel.iter().map(|&c| c as f32 / 255.0).collect();
        Ok(faces.iter().map(|_| encoding.clone()).collect())
    }
}

/// Keeps every image it is asked to show.
#[derive(Default)]
pub struct RecordingSink {
    pub shown: Vec<(String, RgbImage)>,
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, image: &RgbImage, title: &str) -> Result<()> {
        self.shown.push((title.to_string(), image.clone()));
        Ok(())
    }
}
