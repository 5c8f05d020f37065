pub mod builder;
pub mod engine;
pub mod idmap;
pub mod index;
pub mod schema;

pub use builder::{resolve_hits, DenseBuildReport, DenseBuilder};
pub use engine::VectorEngineKind;
pub use idmap::IdMap;
pub use index::LanceFlatIndex;
