use std::collections::VecDeque;
use std::io::{self, Read};

use log::{debug, trace};

use crate::log_or_err;
use crate::structs::page::{CAPTURE_PATTERN, MAX_PAGE_LEN, PAGE_HEADER_LEN, Page};
use crate::utils::crc::{CRC_FIELD_OFFSET, CRC_OGG_PAGE_ALG, Crc32};
use crate::utils::errors::{PageError, SessionError};

/// Default number of bytes requested from the byte source per read.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Upper bound for the read size; larger requests are clamped.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Outcome of [`PageSync::next_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// A page was written into the caller's slot.
    Page,
    /// The byte source reported end of input before another full page.
    EndOfInput,
}

/// Finds page boundaries in a continuous byte stream.
///
/// Bytes are accumulated until a complete page, identified by its capture
/// pattern and verified by its checksum, can be cut from the front of the
/// buffer. Garbage between pages is skipped, and a candidate that fails
/// verification is abandoned one byte in so scanning resumes right after its
/// capture pattern.
///
/// # Example
///
/// ```rust
/// use ogv::process::sync::PageSync;
/// use ogv::structs::page::{HEADER_TYPE_BOS, Page};
///
/// let bytes = Page::new(HEADER_TYPE_BOS, 0, 1, 0, &[3], b"abc").to_bytes();
///
/// let mut sync = PageSync::default();
/// let mut page = Page::default();
///
/// sync.push_bytes(&bytes[..10]);
/// assert!(!sync.page_out(&mut page)?);
///
/// sync.push_bytes(&bytes[10..]);
/// assert!(sync.page_out(&mut page)?);
/// assert_eq!(page.body(), b"abc");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct PageSync {
    buffer: VecDeque<u8>,
    chunk: Vec<u8>,
    crc: Crc32,
    chunk_size: usize,
    pub(crate) fail_level: log::Level,
    pages_extracted: usize,
    bytes_skipped: usize,
    bytes_read: u64,
}

impl Default for PageSync {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, log::Level::Error)
    }
}

impl PageSync {
    /// `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn new(chunk_size: usize, fail_level: log::Level) -> Self {
        Self {
            buffer: VecDeque::with_capacity(MAX_PAGE_LEN),
            chunk: Vec::new(),
            crc: Crc32::new(&CRC_OGG_PAGE_ALG),
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
            fail_level,
            pages_extracted: 0,
            bytes_skipped: 0,
            bytes_read: 0,
        }
    }

    /// Appends raw bytes to the accumulation buffer.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
        self.bytes_read += data.len() as u64;
    }

    /// Pulls the next page, reading from `source` as often as needed.
    ///
    /// The page overwrites `slot`. Interrupted reads are retried; any other
    /// read failure is returned as [`SessionError::Io`].
    pub fn next_page<R: Read>(
        &mut self,
        source: &mut R,
        slot: &mut Page,
    ) -> Result<SyncStatus, SessionError> {
        loop {
            if self.page_out(slot)? {
                return Ok(SyncStatus::Page);
            }

            self.chunk.resize(self.chunk_size, 0);
            match source.read(&mut self.chunk) {
                Ok(0) => {
                    debug!(
                        "End of input after {} bytes, {} bytes left unsynced",
                        self.bytes_read,
                        self.buffer.len()
                    );
                    return Ok(SyncStatus::EndOfInput);
                }
                Ok(n) => {
                    self.buffer.extend(&self.chunk[..n]);
                    self.bytes_read += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SessionError::read(e)),
            }
        }
    }

    /// Cuts one verified page from the front of the buffer into `slot`.
    ///
    /// Returns `Ok(false)` when more data is needed.
    pub fn page_out(&mut self, slot: &mut Page) -> Result<bool, PageError> {
        loop {
            if !self.at_capture_pattern(0) && !self.resync() {
                return Ok(false);
            }

            if self.buffer.len() < PAGE_HEADER_LEN {
                return Ok(false);
            }

            let version = self.buffer[4];
            if version != 0 {
                self.consume_front(1);
                log_or_err!(self, log::Level::Debug, PageError::UnsupportedVersion(version));
                continue;
            }

            let header_len = PAGE_HEADER_LEN + self.buffer[26] as usize;
            if self.buffer.len() < header_len {
                return Ok(false);
            }

            let body_len: usize = self
                .buffer
                .range(PAGE_HEADER_LEN..header_len)
                .map(|&lace| lace as usize)
                .sum();
            let page_len = header_len + body_len;
            if self.buffer.len() < page_len {
                return Ok(false);
            }

            let (header, body) = self.buffer.make_contiguous()[..page_len].split_at(header_len);
            let calculated = self.crc.page_checksum(header, body);
            let read = u32::from_le_bytes([
                header[CRC_FIELD_OFFSET],
                header[CRC_FIELD_OFFSET + 1],
                header[CRC_FIELD_OFFSET + 2],
                header[CRC_FIELD_OFFSET + 3],
            ]);

            if calculated != read {
                let error = PageError::CrcMismatch {
                    serial: u32::from_le_bytes([header[14], header[15], header[16], header[17]]),
                    sequence: u32::from_le_bytes([header[18], header[19], header[20], header[21]]),
                    calculated,
                    read,
                };
                self.consume_front(1);
                log_or_err!(self, log::Level::Warn, error);
                continue;
            }

            slot.fill(header, body);
            self.consume_front(page_len);
            self.pages_extracted += 1;

            trace!(
                "Page {} of stream {:#010X}: {} bytes, flags {:#04X}",
                slot.sequence(),
                slot.serial(),
                page_len,
                slot.header_type()
            );

            return Ok(true);
        }
    }

    /// Drops bytes up to the next capture pattern. Returns `false` when none
    /// is in the buffer yet; a possible pattern prefix at the end is kept.
    fn resync(&mut self) -> bool {
        let found = (0..self.buffer.len().saturating_sub(CAPTURE_PATTERN.len() - 1))
            .find(|&offset| self.at_capture_pattern(offset));

        let skip = found.unwrap_or_else(|| {
            self.buffer
                .len()
                .saturating_sub(CAPTURE_PATTERN.len() - 1)
        });

        if skip > 0 {
            debug!("Skipped {skip} bytes while searching for a page");
            self.bytes_skipped += skip;
            self.consume_front(skip);
        }

        found.is_some()
    }

    fn at_capture_pattern(&self, offset: usize) -> bool {
        self.buffer.len() >= offset + CAPTURE_PATTERN.len()
            && self
                .buffer
                .range(offset..offset + CAPTURE_PATTERN.len())
                .eq(CAPTURE_PATTERN)
    }

    fn consume_front(&mut self, cnt: usize) {
        self.buffer.drain(..cnt);
    }

    pub fn pages_extracted(&self) -> usize {
        self.pages_extracted
    }

    pub fn bytes_skipped(&self) -> usize {
        self.bytes_skipped
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes buffered but not yet part of an extracted page.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
