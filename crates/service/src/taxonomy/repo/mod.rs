pub mod memory;
pub mod seaorm;

pub use memory::MemoryTaxonomyStore;
pub use seaorm::SeaOrmTaxonomyStore;
