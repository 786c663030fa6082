#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! An Ogg file is a sequence of pages. Each page belongs to one logical
//! stream, identified by a serial number, and carries segments of that
//! stream's packets. Streams announce themselves with beginning-of-stream
//! (BOS) pages, all of which precede any other page.
//!
//! A Theora stream starts with three header packets:
//!
//! - **Identification**: frame size, picture region, frame rate, pixel format
//! - **Comment**: vendor string and `tag=value` pairs
//! - **Setup**: loop filter limits, quantization parameters, Huffman trees
//!
//! ## Quick Start
//!
//! 1. Open a file (or any [`std::io::Read`]) with [`process::session::Session`]
//! 2. Inspect the headers through [`Session::info`](process::session::Session::info)
//!    and [`Session::comment`](process::session::Session::comment)
//! 3. Pull content packets with [`Session::next_packet`](process::session::Session::next_packet)
//!
//! ```rust,no_run
//! use ogv::process::OpenOptions;
//! use ogv::process::session::Session;
//!
//! let file = std::fs::File::open("clip.ogv")?;
//! let session = Session::from_reader(file, &OpenOptions::default().strict(true))?;
//!
//! for packet in session {
//!     let packet = packet?;
//!     println!("{} bytes", packet.data.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Processing pipeline from bytes to negotiated video stream.
///
/// 1. **Page Sync** ([`process::sync`]): Finds and verifies pages in raw bytes.
///
/// 2. **Registry** ([`process::registry`]): Routes pages to logical streams.
///
/// 3. **Negotiation** ([`process::negotiate`]): Locates the Theora stream and
///    collects its headers.
///
/// 4. **Session** ([`process::session`]): The opened video.
pub mod process;

/// Data structures for the container and the codec headers.
///
/// - **Pages** ([`structs::page`]): Ogg page framing
/// - **Streams** ([`structs::stream`]): Packet reassembly
/// - **Theora** ([`structs::theora`]): Header packets and decode context
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading
/// - **CRC Validation** ([`utils::crc`]): Page checksums
/// - **Error Handling** ([`utils::errors`]): Error types
pub mod utils;
