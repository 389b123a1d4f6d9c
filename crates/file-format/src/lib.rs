pub mod errors;
pub mod load;
pub mod migrate;
pub mod save;
pub mod store;

pub use errors::{LoadError, StoreError};
pub use load::{load_project, LoadedProject};
pub use save::{project_file, save_project, ProjectFile, FORMAT_VERSION};
pub use store::{FileStore, MemoryStore, ProjectStore};
