//! Validation modules

pub mod metadata;

pub use metadata::{
    is_reserved_key, validate_metadata_key, validate_metadata_value, validate_user_metadata,
    MAX_METADATA_KEYS, MAX_METADATA_KEY_LENGTH, MAX_METADATA_VALUE_LENGTH, SYSTEM_METADATA_KEYS,
};
