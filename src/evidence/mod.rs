pub mod bundle;
pub mod category;
pub mod media;
pub mod validation;

pub use bundle::{AttachmentSummary, DraftReport, EvidenceBundle};
pub use category::{map_category, HazardType};
pub use media::{format_file_size, MediaAsset, MediaKind, MediaSource};
pub use validation::{validate, validate_file, Violation};
