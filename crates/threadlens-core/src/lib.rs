//! # threadlens core
//!
//! Pure retrieval logic for threadlens: reconstructing subthreads from a
//! forum reply graph, assembling retrievable windows, the flat
//! inner-product index, query-time retrieval, and context assembly.
//!
//! This crate contains no tokio, HTTP, or filesystem I/O. Every stage is a
//! function from input records to output records so it can be tested on
//! its own. Embedding, OCR, completion, and persistence live in the
//! `threadlens` app crate.

pub mod context;
pub mod embedding;
pub mod index;
pub mod models;
pub mod retrieve;
pub mod text;
pub mod thread;
pub mod window;
