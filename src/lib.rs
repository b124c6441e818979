pub mod config;
pub mod constants;
pub mod error;
pub mod fault;
pub mod io;
pub mod logger;
pub mod memory;
pub mod translation;
pub mod vm_manager;
pub mod walker;

// Re-export commonly used items for convenience
pub use config::Geometry;
pub use constants::Word;
pub use error::{ConfigError, VmError};
pub use fault::PagingStats;
pub use memory::{BackingStore, PhysicalMemory, SwapStore};
pub use translation::VirtualAddress;
pub use vm_manager::VirtualMemory;
