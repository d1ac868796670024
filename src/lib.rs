//! Seogen - Resumable SEO Metadata Generation
//!
//! Pairs media files with their transcripts, asks a generative model for
//! bilingual titles, descriptions, keywords and summaries, and checkpoints
//! results so long batch runs can be interrupted and resumed.

pub mod checkpoint;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pairing;
pub mod parser;
pub mod record;
pub mod report;
pub mod workflow;

#[cfg(test)]
mod testing;
