use crate::common::{FaceVoteError, Result};
use crate::core::annotator::Annotator;
use crate::core::comparator::FaceComparator;
use crate::core::detector::{FaceBox, FaceDetector};
use crate::core::encoder::FaceEncoder;
use crate::core::sink::DisplaySink;
use crate::storage::{EncodingStore, EncodingTable};
use image::DynamicImage;
use std::path::Path;

pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedFace {
    pub face: FaceBox,
    /// `None` when no stored encoding matched.
    pub name: Option<String>,
}

impl RecognizedFace {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }
}

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(FaceVoteError::image_load(path, "file not found"));
    }
    image::open(path).map_err(|e| FaceVoteError::image_load(path, e))
}

/// Majority vote over every stored encoding the comparator accepts.
///
/// Each matching entry votes for its name; the name with the most votes
/// wins. On a tie the name whose first match comes earliest in the table
/// wins. Returns `None` if nothing matched.
pub fn resolve_identity(
    candidate: &[f32],
    table: &EncodingTable,
    comparator: &dyn FaceComparator,
) -> Option<String> {
    let matches = comparator.compare_faces(table.encodings(), candidate);

    let mut votes: Vec<(&str, usize)> = Vec::new();
    for (name, matched) in table.names().iter().map(String::as_str).zip(matches) {
        if !matched {
            continue;
        }
        match votes.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => votes.push((name, 1)),
        }
    }

    let mut winner: Option<(&str, usize)> = None;
    for (name, count) in votes {
        if winner.map_or(true, |(_, best)| count > best) {
            winner = Some((name, count));
        }
    }

    winner.map(|(name, _)| name.to_string())
}

/// Detector, encoder and comparator bound to one encoding store.
pub struct FaceRecognizer {
    detector: Box<dyn FaceDetector>,
    encoder: Box<dyn FaceEncoder>,
    comparator: Box<dyn FaceComparator>,
    store: EncodingStore,
    annotator: Annotator,
}

impl FaceRecognizer {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        encoder: Box<dyn FaceEncoder>,
        comparator: Box<dyn FaceComparator>,
        store: EncodingStore,
        annotator: Annotator,
    ) -> Self {
        Self {
            detector,
            encoder,
            comparator,
            store,
            annotator,
        }
    }

    pub fn store(&self) -> &EncodingStore {
        &self.store
    }

    pub fn encode_known_faces(&self, training_root: &Path) -> Result<EncodingTable> {
        self.store
            .encode_known_faces(training_root, self.detector.as_ref(), self.encoder.as_ref())
    }

    pub fn recognize(&self, image: &DynamicImage, table: &EncodingTable) -> Result<Vec<RecognizedFace>> {
        let locations = self.detector.face_locations(image)?;
        let encodings = self.encoder.face_encodings(image, &locations)?;

        if encodings.len() != locations.len() {
            return Err(FaceVoteError::Model(format!(
                "Encoder returned {} encoding(s) for {} face(s)",
                encodings.len(), locations.len()
            )));
        }

        Ok(locations
            .into_iter()
            .zip(encodings)
            .map(|(face, encoding)| RecognizedFace {
                face,
                name: resolve_identity(&encoding, table, self.comparator.as_ref()),
            })
            .collect())
    }

    /// Recognizes every face in the image at `image_path`, draws the
    /// results and hands the annotated image to `sink`.
    pub fn recognize_faces(&self, image_path: &Path, sink: &mut dyn DisplaySink) -> Result<Vec<RecognizedFace>> {
        let image = load_image(image_path)?;
        let table = self.store.load()?;

        let title = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_path.display().to_string());
        self.annotate_and_show(&image, &table, &title, sink)
    }

    /// Like [`recognize_faces`](Self::recognize_faces), against a table the
    /// caller already loaded and with a caller-chosen title.
    pub fn recognize_file(
        &self,
        image_path: &Path,
        table: &EncodingTable,
        title: &str,
        sink: &mut dyn DisplaySink,
    ) -> Result<Vec<RecognizedFace>> {
        let image = load_image(image_path)?;
        self.annotate_and_show(&image, table, title, sink)
    }

    fn annotate_and_show(
        &self,
        image: &DynamicImage,
        table: &EncodingTable,
        title: &str,
        sink: &mut dyn DisplaySink,
    ) -> Result<Vec<RecognizedFace>> {
        let faces = self.recognize(image, table)?;
        for face in &faces {
            tracing::info!("{}: {} at {:?}", title, face.label(), face.face);
        }
        if faces.is_empty() {
            tracing::info!("{}: no faces detected", title);
        }

        let mut canvas = image.to_rgb8();
        self.annotator.annotate(&mut canvas, &faces);
        sink.show(&canvas, title)?;

        Ok(faces)
    }
}
