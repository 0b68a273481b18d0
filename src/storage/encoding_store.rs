use crate::common::{FaceVoteError, Result};
use crate::core::detector::FaceDetector;
use crate::core::encoder::{Encoding, FaceEncoder};
use crate::core::recognizer::load_image;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const STORAGE_VERSION: u32 = 1;

/// Parallel name/encoding sequences. `encodings[i]` belongs to `names[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingTable {
    names: Vec<String>,
    encodings: Vec<Encoding>,
}

impl EncodingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, encoding: Encoding) {
        self.names.push(name.into());
        self.encodings.push(encoding);
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Encoding)> {
        self.names.iter().map(String::as_str).zip(self.encodings.iter())
    }

    fn is_consistent(&self) -> bool {
        self.names.len() == self.encodings.len()
    }
}

#[derive(Serialize)]
struct StoredTableRef<'a> {
    version: u32,
    table: &'a EncodingTable,
}

#[derive(Deserialize)]
struct StoredTable {
    version: u32,
    table: EncodingTable,
}

/// Case-insensitive extension allow-list for training images.
#[derive(Debug, Clone)]
pub struct ImageFilter {
    extensions: Vec<String>,
}

impl ImageFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn check(&self, path: &Path) -> Result<()> {
        let allowed = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|a| a.eq_ignore_ascii_case(e)))
            .unwrap_or(false);

        if allowed {
            Ok(())
        } else {
            Err(FaceVoteError::UnsupportedFileType(path.to_path_buf()))
        }
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new(["jpg", "jpeg", "png"])
    }
}

pub struct EncodingStore {
    path: PathBuf,
    filter: ImageFilter,
}

impl EncodingStore {
    pub fn new(path: impl Into<PathBuf>, filter: ImageFilter) -> Self {
        Self {
            path: path.into(),
            filter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encodes every face under `training_root/<name>/<image>` and replaces
    /// the stored table with the result.
    pub fn encode_known_faces(
        &self,
        training_root: &Path,
        detector: &dyn FaceDetector,
        encoder: &dyn FaceEncoder,
    ) -> Result<EncodingTable> {
        if !training_root.is_dir() {
            return Err(FaceVoteError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Training directory not found: {}", training_root.display()),
            )));
        }

        let mut table = EncodingTable::new();
        let mut images = 0usize;

        let walker = WalkDir::new(training_root)
            .min_depth(2)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Err(e) = self.filter.check(path) {
                tracing::debug!("Skipping: {}", e);
                continue;
            }

            let Some(name) = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
            else {
                tracing::warn!("Skipping {:?}: identity directory name is not valid UTF-8", path);
                continue;
            };

            let image = load_image(path)?;
            let locations = detector.face_locations(&image)?;
            let encodings = encoder.face_encodings(&image, &locations)?;
            images += 1;

            if encodings.is_empty() {
                tracing::debug!("No faces found in {}", path.display());
            }

            for encoding in encodings {
                table.push(name, encoding);
            }
        }

        tracing::info!(
            "Encoded {} face(s) from {} image(s) under {}",
            table.len(), images, training_root.display()
        );

        self.save(&table)?;
        Ok(table)
    }

    pub fn save(&self, table: &EncodingTable) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredTableRef {
            version: STORAGE_VERSION,
            table,
        };
        let encoded = bincode::serialize(&stored)
            .map_err(|e| FaceVoteError::Other(anyhow::anyhow!("Failed to serialize encodings: {}", e)))?;
        fs::write(&self.path, encoded)?;

        tracing::debug!("Wrote {} encoding(s) to {}", table.len(), self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<EncodingTable> {
        let data = fs::read(&self.path)
            .map_err(|e| FaceVoteError::missing_store(&self.path, e))?;

        let stored: StoredTable = bincode::deserialize(&data)
            .map_err(|e| FaceVoteError::missing_store(&self.path, format!("corrupt store: {}", e)))?;

        if stored.version > STORAGE_VERSION {
            return Err(FaceVoteError::missing_store(
                &self.path,
                format!("unsupported store version {}", stored.version),
            ));
        }

        if !stored.table.is_consistent() {
            return Err(FaceVoteError::missing_store(
                &self.path,
                "names and encodings differ in length",
            ));
        }

        Ok(stored.table)
    }
}
