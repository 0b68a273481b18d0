use crate::common::{FaceVoteError, Result};
use crate::core::recognizer::FaceRecognizer;
use crate::core::sink::DisplaySink;
use crate::storage::EncodingTable;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct Trainer {
    training_root: PathBuf,
}

impl Trainer {
    pub fn new(training_root: impl Into<PathBuf>) -> Self {
        Self { training_root: training_root.into() }
    }

    pub fn train(&self, recognizer: &FaceRecognizer) -> Result<EncodingTable> {
        tracing::info!("Training from {}", self.training_root.display());
        let table = recognizer.encode_known_faces(&self.training_root)?;
        println!(
            "Stored {} encoding(s) in {}",
            table.len(),
            recognizer.store().path().display()
        );
        Ok(table)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidationSummary {
    pub images: usize,
    pub faces: usize,
    pub unknown: usize,
    pub skipped: usize,
}

pub struct Validator {
    root: PathBuf,
}

impl Validator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Runs recognition on every regular file below the root against one
    /// load of the store. Files that are not decodable images are skipped;
    /// any other error stops the run. Each image is titled by its path
    /// relative to the root.
    pub fn validate(&self, recognizer: &FaceRecognizer, sink: &mut dyn DisplaySink) -> Result<ValidationSummary> {
        if !self.root.is_dir() {
            return Err(FaceVoteError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Validation directory not found: {}", self.root.display()),
            )));
        }

        let table = recognizer.store().load()?;
        let mut summary = ValidationSummary::default();

        for entry in WalkDir::new(&self.root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let title = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .display()
                .to_string();

            match recognizer.recognize_file(entry.path(), &table, &title, sink) {
                Ok(faces) => {
                    summary.images += 1;
                    summary.faces += faces.len();
                    summary.unknown += faces.iter().filter(|f| f.name.is_none()).count();
                }
                Err(FaceVoteError::ImageLoad { path, reason }) => {
                    tracing::warn!("Skipping {}: {}", path.display(), reason);
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Validated {} image(s): {} face(s), {} unknown, {} skipped",
            summary.images, summary.faces, summary.unknown, summary.skipped
        );
        Ok(summary)
    }
}

pub struct Tester {
    image_path: PathBuf,
}

impl Tester {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self { image_path: image_path.into() }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Fails early, before any model is loaded, if the image is missing.
    pub fn check_input(&self) -> Result<()> {
        if self.image_path.is_file() {
            Ok(())
        } else {
            Err(FaceVoteError::image_load(&self.image_path, "file not found"))
        }
    }

    pub fn test(&self, recognizer: &FaceRecognizer, sink: &mut dyn DisplaySink) -> Result<()> {
        let faces = recognizer.recognize_faces(&self.image_path, sink)?;
        for face in &faces {
            println!("{}", face.label());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotator::Annotator;
    use crate::core::comparator::DistanceComparator;
    use crate::storage::{EncodingStore, ImageFilter};
    use crate::testing::{write_image, ColorDetector, ColorEncoder, RecordingSink};
    use std::fs;

    fn recognizer(dir: &Path) -> FaceRecognizer {
        FaceRecognizer::new(
            Box::new(ColorDetector),
            Box::new(ColorEncoder),
            Box::new(DistanceComparator::new(0.1)),
            EncodingStore::new(dir.join("output").join("encodings.bincode"), ImageFilter::default()),
            Annotator::default(),
        )
    }

    fn trained(dir: &Path) -> FaceRecognizer {
        let training = dir.join("training");
        write_image(&training.join("alice").join("1.png"), [200, 0, 0]);
        write_image(&training.join("bob").join("1.png"), [0, 200, 0]);

        let recognizer = recognizer(dir);
        Trainer::new(&training).train(&recognizer).unwrap();
        recognizer
    }

    #[test]
    fn test_trainer_writes_store() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = trained(dir.path());
        let table = recognizer.store().load().unwrap();
        assert_eq!(table.names(), ["alice", "bob"]);
    }

    #[test]
    fn test_validator_visits_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = trained(dir.path());

        let validation = dir.path().join("validation");
        write_image(&validation.join("alice.png"), [200, 0, 0]);
        write_image(&validation.join("nested").join("deeper").join("bob.png"), [0, 200, 0]);
        write_image(&validation.join("nested").join("stranger.png"), [0, 0, 250]);
        write_image(&validation.join("empty.png"), [0, 0, 0]);

        let mut sink = RecordingSink::default();
        let summary = Validator::new(&validation).validate(&recognizer, &mut sink).unwrap();

        assert_eq!(summary, ValidationSummary { images: 4, faces: 3, unknown: 1, skipped: 0 });
        assert_eq!(sink.shown.len(), 4);
    }

    #[test]
    fn test_validator_titles_by_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = trained(dir.path());

        let validation = dir.path().join("validation");
        write_image(&validation.join("alice").join("1.png"), [200, 0, 0]);
        write_image(&validation.join("bob").join("1.png"), [0, 200, 0]);

        let mut sink = RecordingSink::default();
        Validator::new(&validation).validate(&recognizer, &mut sink).unwrap();

        let titles: Vec<PathBuf> = sink.shown.iter().map(|(t, _)| PathBuf::from(t)).collect();
        assert_eq!(titles, [Path::new("alice").join("1.png"), Path::new("bob").join("1.png")]);
    }

    #[test]
    fn test_validator_reads_store_once() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = trained(dir.path());

        let validation = dir.path().join("validation");
        write_image(&validation.join("a.png"), [200, 0, 0]);
        write_image(&validation.join("b.png"), [200, 0, 0]);

        // Store removed after the first image is shown; the run still labels both.
        struct RemovingSink<'a> {
            store: &'a Path,
            names: Vec<String>,
        }
        impl DisplaySink for RemovingSink<'_> {
            fn show(&mut self, _image: &image::RgbImage, title: &str) -> Result<()> {
                let _ = fs::remove_file(self.store);
                self.names.push(title.to_string());
                Ok(())
            }
        }

        let store_path = recognizer.store().path().to_path_buf();
        let mut sink = RemovingSink { store: &store_path, names: Vec::new() };
        let summary = Validator::new(&validation).validate(&recognizer, &mut sink).unwrap();

        assert_eq!(summary.images, 2);
        assert_eq!(summary.unknown, 0);
        assert_eq!(sink.names, ["a.png", "b.png"]);
    }

    #[test]
    fn test_validator_skips_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = trained(dir.path());

        let validation = dir.path().join("validation");
        write_image(&validation.join("alice.png"), [200, 0, 0]);
        fs::write(validation.join("notes.txt"), "not an image").unwrap();

        let mut sink = RecordingSink::default();
        let summary = Validator::new(&validation).validate(&recognizer, &mut sink).unwrap();
        assert_eq!(summary.images, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_validator_without_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let validation = dir.path().join("validation");
        write_image(&validation.join("alice.png"), [200, 0, 0]);

        let mut sink = RecordingSink::default();
        let err = Validator::new(&validation)
            .validate(&recognizer(dir.path()), &mut sink)
            .unwrap_err();
        assert!(matches!(err, FaceVoteError::MissingStore { .. }));
    }

    #[test]
    fn test_tester_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = trained(dir.path());

        let mut sink = RecordingSink::default();
        let tester = Tester::new(dir.path().join("missing.jpg"));
        assert!(matches!(tester.check_input(), Err(FaceVoteError::ImageLoad { .. })));

        let err = tester.test(&recognizer, &mut sink).unwrap_err();
        assert!(matches!(err, FaceVoteError::ImageLoad { .. }));
    }

    #[test]
    fn test_tester_shows_single_image() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = trained(dir.path());

        let visitor = dir.path().join("visitor.png");
        write_image(&visitor, [0, 200, 0]);

        let mut sink = RecordingSink::default();
        Tester::new(&visitor).test(&recognizer, &mut sink).unwrap();
        assert_eq!(sink.shown.len(), 1);
    }
}
