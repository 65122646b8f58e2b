//! Dense vector index over chunk embeddings.
//!
//! Serving uses [`LanceVectorIndex`] (LanceDB, cosine distance). [`FlatIndex`]
//! is an exact in-memory inner-product index used for feature export and tests.
//! Both report positions; callers translate them through the
//! [`citeqa_core::mapping::IdMapping`] written by [`build::build_vector_index`].

pub mod build;
pub mod flat;
pub mod index_build;
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use build::{build_vector_index, BuildReport};
pub use flat::FlatIndex;
pub use search::LanceVectorIndex;
