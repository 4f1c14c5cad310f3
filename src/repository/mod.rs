//! Persistence boundary: `Find/Save/Delete/List` per task kind, over an
//! in-memory store with derived reverse indices.

mod filter;
mod memory;
mod traits;

pub use filter::TaskFilter;
pub use memory::InMemoryTaskRepository;
pub use traits::{EpicRepo, PbiRepo, SbiRepo, TaskRepo};
