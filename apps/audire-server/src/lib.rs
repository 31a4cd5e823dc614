//! Audire Server Library
//!
//! Extracts audit findings from uploaded .docx/.pdf documents, renders the
//! documents as HTML for review and writes approved findings back for
//! export. The server binary is in main.rs; this crate exposes the pieces
//! for integration tests and benchmarks.
//!
//! # Modules
//!
//! - `pdf`: page reconstruction from layout, rulings and font styles
//! - `docx`: table reading, HTML conversion, reinjection
//! - `findings`: classification, collection, ids, refinement
//! - `export`: rebuilt documents and office conversion
//! - `storage`: uploaded documents and their lifetime

pub mod app;
pub mod config;
pub mod docx;
pub mod error;
pub mod export;
pub mod findings;
pub mod pdf;
pub mod pipeline;
pub mod prompts;
pub mod routes;
pub mod state;
pub mod storage;
