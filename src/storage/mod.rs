pub mod encoding_store;

pub use encoding_store::{EncodingStore, EncodingTable, ImageFilter};
