use std::io::Read;

use crate::process::OpenOptions;
use crate::process::registry::{Routed, StreamRegistry};
use crate::process::sync::{PageSync, SyncStatus};
use crate::structs::page::Page;
use crate::structs::stream::Packet;
use crate::utils::errors::{SessionError, StreamError};

/// Pulls pages from a byte source and routes each one to its logical stream.
///
/// Owns the byte source, the synchronizer and the registry. A single page
/// slot is overwritten by every read.
#[derive(Debug)]
pub struct Demuxer<R> {
    page: Page,
    registry: StreamRegistry,
    sync: PageSync,
    source: R,
    eof: bool,
}

impl<R: Read> Demuxer<R> {
    pub fn new(source: R, options: &OpenOptions) -> Self {
        Self {
            page: Page::default(),
            registry: StreamRegistry::new(),
            sync: PageSync::new(options.read_chunk_size, options.fail_level),
            source,
            eof: false,
        }
    }

    /// Reads the next page into the slot and routes it.
    ///
    /// Returns `None` once the byte source is exhausted; [`is_eof`] is set
    /// from then on and no further reads are attempted.
    ///
    /// [`is_eof`]: Demuxer::is_eof
    pub fn next_page(&mut self) -> Result<Option<Routed>, SessionError> {
        if self.eof {
            return Ok(None);
        }

        match self.sync.next_page(&mut self.source, &mut self.page)? {
            SyncStatus::Page => Ok(Some(self.registry.route(&self.page))),
            SyncStatus::EndOfInput => {
                self.eof = true;
                Ok(None)
            }
        }
    }

    /// Takes the next complete packet of `serial`, if it is tracked.
    pub fn packet_out(&mut self, serial: u32) -> Result<Option<Packet>, StreamError> {
        match self.registry.entry_for_mut(serial) {
            Some(stream) => stream.packet_out(),
            None => Ok(None),
        }
    }

    /// The most recently read page, `None` before the first one.
    pub fn page(&self) -> Option<&Page> {
        (!self.page.is_empty()).then_some(&self.page)
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StreamRegistry {
        &mut self.registry
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn pages_read(&self) -> usize {
        self.sync.pages_extracted()
    }

    pub fn bytes_read(&self) -> u64 {
        self.sync.bytes_read()
    }

    pub fn bytes_skipped(&self) -> usize {
        self.sync.bytes_skipped()
    }
}
