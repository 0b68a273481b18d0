//! Draws face boxes and name labels onto images.
//!
//! Drawing goes through [`DrawingSurface`] so label placement can be checked
//! without rasterizing anything. [`RgbSurface`] is the `imageproc` backed
//! implementation used at runtime.

use crate::common::config::DisplayConfig;
use crate::core::detector::FaceBox;
use crate::core::recognizer::RecognizedFace;
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Space between the label text and the edge of its background.
pub const LABEL_PADDING: u32 = 4;

const BOX_THICKNESS: u32 = 2;

const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub trait DrawingSurface {
    fn outline_rect(&mut self, rect: Rect, color: Rgb<u8>);
    fn fill_rect(&mut self, rect: Rect, color: Rgb<u8>);
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb<u8>);
    /// Width and height the text occupies when drawn.
    fn text_size(&self, text: &str) -> (u32, u32);
}

pub struct RgbSurface<'a> {
    image: &'a mut RgbImage,
    font: Option<&'a FontVec>,
    scale: f32,
}

impl<'a> RgbSurface<'a> {
    pub fn new(image: &'a mut RgbImage, font: Option<&'a FontVec>, scale: f32) -> Self {
        Self { image, font, scale }
    }
}

impl DrawingSurface for RgbSurface<'_> {
    fn outline_rect(&mut self, rect: Rect, color: Rgb<u8>) {
        draw_hollow_rect_mut(&mut *self.image, rect, color);
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgb<u8>) {
        draw_filled_rect_mut(&mut *self.image, rect, color);
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Rgb<u8>) {
        if let Some(font) = self.font {
            draw_text_mut(&mut *self.image, color, x, y, self.scale, font, text);
        }
    }

    fn text_size(&self, text: &str) -> (u32, u32) {
        match self.font {
            Some(font) => text_size(self.scale, font, text),
            // No font: reserve a half-em cell per character
            None => {
                let chars = text.chars().count() as f32;
                ((chars * self.scale * 0.5).ceil() as u32, self.scale.ceil() as u32)
            }
        }
    }
}

/// Outlines `face` and puts `name` on a filled label directly under the
/// box's bottom-left corner.
pub fn annotate_face(surface: &mut dyn DrawingSurface, face: &FaceBox, name: &str) {
    let (left, top, bottom) = (face.left as i32, face.top as i32, face.bottom as i32);
    let width = face.width().max(1);
    let height = face.height().max(1);

    for i in 0..BOX_THICKNESS {
        if width <= 2 * i || height <= 2 * i {
            break;
        }
        let rect = Rect::at(left + i as i32, top + i as i32).of_size(width - 2 * i, height - 2 * i);
        surface.outline_rect(rect, BOX_COLOR);
    }

    let (text_width, text_height) = surface.text_size(name);
    let label = Rect::at(left, bottom)
        .of_size(text_width + 2 * LABEL_PADDING, text_height + 2 * LABEL_PADDING);
    surface.fill_rect(label, BOX_COLOR);
    surface.draw_text(
        left + LABEL_PADDING as i32,
        bottom + LABEL_PADDING as i32,
        name,
        TEXT_COLOR,
    );
}

pub struct Annotator {
    font: Option<FontVec>,
    scale: f32,
}

impl Default for Annotator {
    fn default() -> Self {
        Self { font: None, scale: 16.0 }
    }
}

impl Annotator {
    pub fn new(font: Option<FontVec>, scale: f32) -> Self {
        Self { font, scale }
    }

    /// Loads the configured font, or the first readable system font.
    /// Labels are drawn without text if neither is available.
    pub fn from_config(config: &DisplayConfig) -> Self {
        let font = match &config.font_path {
            Some(path) => {
                let font = load_font(path);
                if font.is_none() {
                    tracing::warn!("Could not load font {}, labels will have no text", path.display());
                }
                font
            }
            None => load_system_font(),
        };

        Self::new(font, config.font_scale)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn annotate(&self, image: &mut RgbImage, faces: &[RecognizedFace]) {
        let mut surface = RgbSurface::new(image, self.font.as_ref(), self.scale);
        for face in faces {
            annotate_face(&mut surface, &face.face, face.label());
        }
    }
}

fn load_font(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

fn load_system_font() -> Option<FontVec> {
    for path in SYSTEM_FONTS {
        if let Some(font) = load_font(Path::new(path)) {
            tracing::debug!("Loaded system font: {}", path);
            return Some(font);
        }
    }
    tracing::debug!("No system font found, label text will be skipped");
    None
}
