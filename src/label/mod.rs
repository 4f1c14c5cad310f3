//! Label catalog and template integrity checking.

mod catalog;
mod integrity;

pub use catalog::{InMemoryLabelCatalog, Label, LabelCatalog, LabelId};
pub use integrity::{hash_bytes, hash_file, IntegrityStatus};
