//! Langbase Pipes transport used as the interview's text-generation backend.

mod client;
mod types;


pub use client::*;
pub use types::*;
