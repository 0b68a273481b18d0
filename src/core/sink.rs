use crate::common::Result;
use image::RgbImage;

/// Where annotated images end up.
pub trait DisplaySink {
    fn show(&mut self, image: &RgbImage, title: &str) -> Result<()>;
}
