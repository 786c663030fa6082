//! Data structures for the Ogg container and the Theora headers.
//!
//! This module contains the parsed representations used by the processing
//! pipeline:
//! - [`page`]: wire-level Ogg pages
//! - [`stream`]: per-stream packet reassembly and [`stream::Packet`]
//! - [`theora`]: identification, comment and setup headers plus the decode
//!   context

pub mod page;
pub mod stream;
pub mod theora;
