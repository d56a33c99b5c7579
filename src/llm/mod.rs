pub mod client;

pub use client::{mean_vector, LlmClient};
