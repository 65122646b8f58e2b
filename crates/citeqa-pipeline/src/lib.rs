//! Query-time question answering: retrieve, fuse, rerank, gate, extract.

pub mod answer;
pub mod eval;
pub mod features;
pub mod fusion;
pub mod gate;
pub mod open;
pub mod pipeline;
pub mod retriever;
pub mod snippet;

pub use open::open_pipeline;
pub use pipeline::{Capabilities, QaPipeline};
