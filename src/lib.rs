// Library crate - market-structure engine and its host surfaces

pub mod types;
pub mod structure;
pub mod data;
pub mod api;

// Re-export commonly used types
pub use types::*;
pub use structure::{EngineConfig, LevelSource, StructureEngine, StructureReport};
