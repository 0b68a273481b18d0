pub mod annotator;
pub mod comparator;
pub mod detector;
pub mod encoder;
pub mod recognizer;
pub mod sink;

pub use annotator::{annotate_face, Annotator, DrawingSurface, RgbSurface};
pub use comparator::{DistanceComparator, FaceComparator};
pub use detector::{DetectionModel, FaceBox, FaceDetector, OnnxFaceDetector};
pub use encoder::{Encoding, FaceEncoder, OnnxFaceEncoder};
pub use recognizer::{resolve_identity, FaceRecognizer, RecognizedFace, UNKNOWN_NAME};
pub use sink::DisplaySink;
