//! Core contracts shared by the datagen crates.
//!
//! This crate defines field type tags, model option keys with their
//! defaults, sink table-name keys and primary-key purposes.

pub mod error;
pub mod keys;
pub mod options;
pub mod types;

pub use error::{Error, Result};
pub use keys::{PrimaryKeyKind, TableNameKey, convert_keys};
pub use options::{OptionKey, OptionKind, OptionValue, parse_column_families};
pub use types::{ComparisonKind, FieldType};

/// Current contract version for model documents.
pub const MODEL_VERSION: &str = "0.1";
