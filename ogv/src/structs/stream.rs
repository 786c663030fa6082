//! Per-stream packet reassembly
//!
//! Pages of one logical stream are fed in order; packets come out once their
//! final lacing segment (a value below 255) has been seen. A packet may span
//! any number of pages.

use std::collections::VecDeque;

use log::{trace, warn};

use crate::structs::page::Page;
use crate::utils::errors::StreamError;

/// A codec packet reassembled from one or more pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Vec<u8>,
    /// First packet of the logical stream.
    pub bos: bool,
    /// Last packet of the logical stream.
    pub eos: bool,
    /// Granule position of the page this packet ends on, or -1 when another
    /// packet ends later on the same page.
    pub granule_position: i64,
    pub packet_number: u64,
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Packet reassembly state for a single logical stream.
#[derive(Debug)]
pub struct StreamState {
    serial: u32,
    partial: Vec<u8>,
    continuing: bool,
    queue: VecDeque<Result<Packet, StreamError>>,
    next_sequence: Option<u32>,
    packet_number: u64,
    bos_pending: bool,
    pages: usize,
    eos: bool,
}

impl StreamState {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            partial: Vec::new(),
            continuing: false,
            queue: VecDeque::new(),
            next_sequence: None,
            packet_number: 0,
            bos_pending: false,
            pages: 0,
            eos: false,
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Number of pages accepted so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Whether the end-of-stream page has been seen.
    pub fn is_eos(&self) -> bool {
        self.eos
    }

    /// Complete packets (and holes) waiting to be taken.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Appends a page's segments to the stream.
    pub fn page_in(&mut self, page: &Page) -> Result<(), StreamError> {
        if page.serial() != self.serial {
            return Err(StreamError::SerialMismatch {
                expected: self.serial,
                found: page.serial(),
            });
        }

        let sequence = page.sequence();
        if let Some(expected) = self.next_sequence {
            if sequence != expected {
                warn!(
                    "Stream {:#010X}: page sequence jumped from {expected} to {sequence}",
                    self.serial
                );
                self.partial.clear();
                self.continuing = false;
                self.packet_number += 1;
                self.queue.push_back(Err(StreamError::Hole {
                    serial: self.serial,
                    expected,
                    found: sequence,
                }));
            }
        }
        self.next_sequence = Some(sequence.wrapping_add(1));
        self.pages += 1;

        if page.is_bos() {
            self.bos_pending = true;
        }
        if page.is_eos() {
            self.eos = true;
        }

        let segments = page.segments();
        let body = page.body();
        let mut lace_index = 0;
        let mut offset = 0;

        if page.is_continued() && !self.continuing {
            // Tail of a packet whose head was lost; drop it.
            while let Some(&lace) = segments.get(lace_index) {
                offset += lace as usize;
                lace_index += 1;
                if lace < 255 {
                    break;
                }
            }
        } else if !page.is_continued() && self.continuing {
            trace!(
                "Stream {:#010X}: discarding {} bytes of an unterminated packet",
                self.serial,
                self.partial.len()
            );
            self.partial.clear();
            self.continuing = false;
        }

        let first_new = self.queue.len();
        for &lace in &segments[lace_index.min(segments.len())..] {
            let end = (offset + lace as usize).min(body.len());
            self.partial.extend_from_slice(&body[offset.min(end)..end]);
            offset = end;
            self.continuing = lace == 255;

            if lace < 255 {
                let packet = Packet {
                    data: std::mem::take(&mut self.partial),
                    bos: std::mem::take(&mut self.bos_pending),
                    eos: false,
                    granule_position: -1,
                    packet_number: self.packet_number,
                };
                self.packet_number += 1;
                self.queue.push_back(Ok(packet));
            }
        }

        let completed = self.queue.len() - first_new;
        if completed > 0 {
            if let Some(Ok(last)) = self.queue.back_mut() {
                last.granule_position = page.granule_position();
                last.eos = page.is_eos();
            }
        }

        trace!(
            "Stream {:#010X}: page {sequence} completed {completed} packets",
            self.serial
        );

        Ok(())
    }

    /// Takes the next complete packet, if any.
    ///
    /// A gap in page sequence numbers is reported once, in order, as
    /// [`StreamError::Hole`].
    pub fn packet_out(&mut self) -> Result<Option<Packet>, StreamError> {
        self.queue.pop_front().transpose()
    }
}
