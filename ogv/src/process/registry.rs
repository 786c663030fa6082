use std::collections::HashMap;

use log::{debug, trace};

use crate::structs::page::Page;
use crate::structs::stream::StreamState;

/// What [`StreamRegistry::route`] did with a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Appended to an already tracked stream.
    Appended,
    /// A beginning-of-stream page started tracking a new stream.
    Created,
    /// Unknown serial without the BOS flag; the page was ignored.
    Dropped,
}

/// Logical streams currently tracked, keyed by serial number.
///
/// Entries are owned by the registry; evicting or clearing drops them.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: HashMap<u32, StreamState>,
    evicted: usize,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `page` to its stream, creating the stream on a BOS page.
    ///
    /// A page whose serial mismatches cannot happen here; a stream error from
    /// reassembly is queued on the stream itself and surfaces through
    /// [`StreamState::packet_out`].
    pub fn route(&mut self, page: &Page) -> Routed {
        let serial = page.serial();

        let routed = match self.streams.get_mut(&serial) {
            Some(stream) => {
                stream_page_in(stream, page);
                Routed::Appended
            }
            None if page.is_bos() => {
                debug!("New logical stream {serial:#010X}");
                let mut stream = StreamState::new(serial);
                stream_page_in(&mut stream, page);
                self.streams.insert(serial, stream);
                Routed::Created
            }
            None => Routed::Dropped,
        };

        trace!("Page {} of stream {serial:#010X}: {routed:?}", page.sequence());
        routed
    }

    /// Stops tracking `serial`. Returns `false` if it was not tracked.
    pub fn evict(&mut self, serial: u32) -> bool {
        match self.streams.remove(&serial) {
            Some(stream) => {
                debug!(
                    "Evicted stream {serial:#010X} after {} pages",
                    stream.pages()
                );
                self.evicted += 1;
                true
            }
            None => false,
        }
    }

    pub fn entry_for(&self, serial: u32) -> Option<&StreamState> {
        self.streams.get(&serial)
    }

    pub fn entry_for_mut(&mut self, serial: u32) -> Option<&mut StreamState> {
        self.streams.get_mut(&serial)
    }

    pub fn contains(&self, serial: u32) -> bool {
        self.streams.contains_key(&serial)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Serials of all tracked streams, in no particular order.
    pub fn serials(&self) -> impl Iterator<Item = u32> + '_ {
        self.streams.keys().copied()
    }

    /// Number of streams evicted so far.
    pub fn evicted(&self) -> usize {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }
}

fn stream_page_in(stream: &mut StreamState, page: &Page) {
    // Serial equality is guaranteed by the map key.
    if let Err(e) = stream.page_in(page) {
        debug!("{e}");
    }
}
