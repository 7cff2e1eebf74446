pub mod classifier;
pub mod config;
pub mod content;
pub mod criteria;
pub mod error;
pub mod pipeline;
pub mod store;
pub mod structure;
pub mod types;
pub mod walker;

pub use classifier::{FileClassifier, RoleAccumulator};
pub use config::Config;
pub use criteria::{evaluate_criteria, StructureProperty};
pub use error::RolemapError;
pub use pipeline::{AnalysisOutcome, AnalysisPipeline};
pub use store::{CriteriaStore, InMemoryCriteriaStore, JsonFileCriteriaStore};
pub use structure::ProjectStructure;
pub use types::*;
pub use walker::{CancelToken, FileWalker};
