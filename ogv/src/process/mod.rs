/// Page boundary detection in raw container bytes.
///
/// Provides the [`PageSync`](sync::PageSync) that cuts verified
/// [`Page`](crate::structs::page::Page)s out of a byte source.
pub mod sync;

/// Per-serial bookkeeping of logical streams.
///
/// Provides the [`StreamRegistry`](registry::StreamRegistry) that routes pages
/// to their stream.
pub mod registry;

/// Page reading and routing over a byte source.
pub mod demux;

/// Theora stream discovery and header collection.
///
/// Provides the [`Negotiator`](negotiate::Negotiator) state machine.
pub mod negotiate;

/// The opened video: negotiated headers, decoder and the remaining packets.
pub mod session;

use sync::DEFAULT_CHUNK_SIZE;

/// Settings applied when opening a [`Session`](session::Session).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Recoverable problems logged at or above this level become errors.
    /// `Warn` makes checksum failures and page holes fatal.
    pub fail_level: log::Level,
    /// Bytes requested from the byte source per read, clamped to
    /// `1..=`[`MAX_CHUNK_SIZE`](sync::MAX_CHUNK_SIZE).
    pub read_chunk_size: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            fail_level: log::Level::Error,
            read_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl OpenOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.fail_level = if strict {
            log::Level::Warn
        } else {
            log::Level::Error
        };
        self
    }

    pub fn read_chunk_size(mut self, read_chunk_size: usize) -> Self {
        self.read_chunk_size = read_chunk_size;
        self
    }
}
