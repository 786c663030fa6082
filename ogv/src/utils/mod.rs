//! Utility functions and supporting infrastructure.
//!
//! Provides bitstream reading for header parsing, the Ogg page CRC and the
//! error types shared by every layer.

pub mod bitstream_io;
pub mod crc;
pub mod errors;
