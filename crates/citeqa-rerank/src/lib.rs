//! Reordering of fused candidates and the offline training that produces the
//! learned model.

pub mod model;
pub mod reranker;
pub mod train;

pub use model::LogisticModel;
pub use reranker::Reranker;
pub use train::{train, TrainOptions, TrainReport, TrainingRow};
