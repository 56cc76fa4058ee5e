//! Configuration domain - the map configuration model and the validator and
//! reconstructor that guard it.

pub mod document;
pub mod reconstructor;
pub mod types;
pub mod validator;

pub use document::ArtifactDocument;
pub use reconstructor::{ConfigReconstructor, Reconstruction};
pub use types::*;
pub use validator::{REQUIRED_FIELDS, ValidationReport, validate_configuration};
