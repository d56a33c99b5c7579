pub mod llama;
pub mod memory;
