pub mod agents;
pub mod display;

pub use agents::{Tester, Trainer, ValidationSummary, Validator};
pub use display::{build_display, AsciiDisplay, FileDisplay, MultiDisplay};
