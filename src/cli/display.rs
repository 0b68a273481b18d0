use crate::common::{DisplayMode, Result};
use crate::core::annotator::BOX_COLOR;
use crate::core::sink::DisplaySink;
use crossterm::terminal;
use image::RgbImage;
use std::fs;
use std::path::{Component, Path, PathBuf};

const ASCII_RAMP: &[char] = &[' ', '.', '·', ':', ';', '+', '=', 'x', 'X', '#', '@'];
const BOX_CHAR: char = '█';
const DEFAULT_WIDTH: usize = 80;
const DEFAULT_HEIGHT: usize = 30;

/// Prints the image as ASCII art sized to the terminal.
pub struct AsciiDisplay {
    width: usize,
    height: usize,
}

impl AsciiDisplay {
    pub fn new(width: Option<usize>, height: Option<usize>) -> Self {
        let (term_width, term_height) = terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

        Self {
            width: width.unwrap_or(term_width.min(DEFAULT_WIDTH * 2)).max(1),
            height: height.unwrap_or(term_height.saturating_sub(3).min(DEFAULT_HEIGHT * 2)).max(1),
        }
    }

    pub fn render(&self, image: &RgbImage) -> String {
        let (img_width, img_height) = image.dimensions();
        let mut lines = Vec::with_capacity(self.height);

        // Terminal cells are roughly twice as tall as wide; sampling a fixed
        // grid over the whole image keeps the picture recognisable.
        for term_y in 0..self.height {
            let mut line = String::with_capacity(self.width);
            for term_x in 0..self.width {
                let img_x = (term_x as f32 / self.width as f32 * img_width as f32) as u32;
                let img_y = (term_y as f32 / self.height as f32 * img_height as f32) as u32;

                if img_x >= img_width || img_y >= img_height {
                    line.push(' ');
                    continue;
                }

                let pixel = image.get_pixel(img_x, img_y);
                if *pixel == BOX_COLOR {
                    line.push(BOX_CHAR);
                    continue;
                }

                let [r, g, b] = pixel.0;
                let luma = (299 * r as usize + 587 * g as usize + 114 * b as usize) / 1000;
                let idx = (luma.min(255) * (ASCII_RAMP.len() - 1)) / 255;
                line.push(ASCII_RAMP[idx]);
            }
            lines.push(line);
        }

        lines.join("\n")
    }
}

impl DisplaySink for AsciiDisplay {
    fn show(&mut self, image: &RgbImage, title: &str) -> Result<()> {
        println!("── {} ──", title);
        println!("{}", self.render(image));
        Ok(())
    }
}

/// Saves each image under `dir` with a timestamped name.
pub struct FileDisplay {
    dir: PathBuf,
    last_saved: Option<PathBuf>,
}

impl FileDisplay {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_saved: None,
        }
    }

    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }

    /// `<title stem>_<timestamp>.png`, with a numeric suffix if that name is
    /// already taken. Directory parts of the title are kept, joined by `_`.
    fn output_path(&self, title: &str) -> PathBuf {
        let stem = title_stem(title);
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let base = format!("{}_{}", stem, timestamp);

        let mut path = self.dir.join(format!("{}.png", base));
        let mut suffix = 1;
        while path.exists() {
            path = self.dir.join(format!("{}_{}.png", base, suffix));
            suffix += 1;
        }
        path
    }
}

fn title_stem(title: &str) -> String {
    let parts: Vec<String> = Path::new(title)
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        "image".to_string()
    } else {
        parts.join("_")
    }
}

impl DisplaySink for FileDisplay {
    fn show(&mut self, image: &RgbImage, title: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.output_path(title);
        image.save(&path)?;
        println!("Saved annotated image to {}", path.display());
        self.last_saved = Some(path);
        Ok(())
    }
}

/// Fans out to several sinks in order.
pub struct MultiDisplay {
    sinks: Vec<Box<dyn DisplaySink>>,
}

impl MultiDisplay {
    pub fn new(sinks: Vec<Box<dyn DisplaySink>>) -> Self {
        Self { sinks }
    }
}

impl DisplaySink for MultiDisplay {
    fn show(&mut self, image: &RgbImage, title: &str) -> Result<()> {
        for sink in &mut self.sinks {
            sink.show(image, title)?;
        }
        Ok(())
    }
}

pub fn build_display(mode: DisplayMode, output_dir: &Path) -> Box<dyn DisplaySink> {
    match mode {
        DisplayMode::Ascii => Box::new(AsciiDisplay::new(None, None)),
        DisplayMode::File => Box::new(FileDisplay::new(output_dir)),
        DisplayMode::Both => {
            let sinks: Vec<Box<dyn DisplaySink>> = vec![
                Box::new(AsciiDisplay::new(None, None)),
                Box::new(FileDisplay::new(output_dir)),
            ];
            Box::new(MultiDisplay::new(sinks))
        }
    }
}
