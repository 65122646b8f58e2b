#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod jsonl;
pub mod mapping;
pub mod score;
pub mod text;
pub mod traits;
pub mod types;
