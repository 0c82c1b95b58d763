//! Intake Processing Library
//!
//! Content checks that run before anything reaches storage: the magic-byte
//! signature table, the per-category [`FileValidator`] and the heuristic
//! [`ContentInspector`].

pub mod inspector;
pub mod signatures;
pub mod validator;

pub use inspector::{ContentInspector, InspectionError};
pub use signatures::{check_signature, lookup_signature, MagicSignature, SignatureCheck};
pub use validator::{content_type_from_extension, FileValidator, ValidationError};
