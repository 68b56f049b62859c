// mod.rs - Input genome module

pub mod genome;
pub mod index;

// Re-export main types for convenience
pub use genome::{discover_genomes, GenomeInfo};
pub use index::{index_genomes, read_metadata, IndexReport, MetadataEntry};
