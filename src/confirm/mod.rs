//! 确认层：预览与人工确认

pub mod gate;
pub mod preview;

pub use gate::{ConfirmationGate, Decision, DEFAULT_EDITABLE, DEFAULT_MAX_INVALID_CHOICES};
pub use preview::{param_label, ActionPreview};
