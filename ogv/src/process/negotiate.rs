use std::fmt::{Display, Formatter};
use std::io::Read;

use log::{debug, info};

use crate::log_or_err;
use crate::process::OpenOptions;
use crate::process::demux::Demuxer;
use crate::process::registry::Routed;
use crate::structs::page::Page;
use crate::structs::stream::Packet;
use crate::structs::theora::decoder::Decoder;
use crate::structs::theora::{HeaderDecoder, HeaderStatus, Headers};
use crate::utils::errors::{HeaderError, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Scanning the beginning-of-stream pages for a Theora stream.
    SeekingTarget,
    /// Target found; pulling its remaining header packets.
    CollectingTargetHeaders,
    Ready,
    Failed,
}

impl Display for NegotiationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationState::SeekingTarget => write!(f, "seeking target"),
            NegotiationState::CollectingTargetHeaders => write!(f, "collecting target headers"),
            NegotiationState::Ready => write!(f, "ready"),
            NegotiationState::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a successful negotiation.
#[derive(Debug)]
pub struct Negotiated {
    pub decoder: Decoder,
    /// The content packet that completed the headers.
    pub first_packet: Packet,
    pub headers: Headers,
    pub serial: u32,
}

/// Finds the Theora stream of a multiplexed file and collects its headers.
///
/// Discovery only looks at the leading run of beginning-of-stream pages: the
/// first page without the BOS flag ends it. Every other stream is evicted
/// from the registry as soon as it is known to be irrelevant, so after
/// success the registry tracks the target alone.
///
/// A negotiator is single use; [`run`](Negotiator::run) leaves it in
/// [`Ready`](NegotiationState::Ready) or [`Failed`](NegotiationState::Failed).
#[derive(Debug)]
pub struct Negotiator {
    state: NegotiationState,
    target: Option<u32>,
    headers: HeaderDecoder,
    fail_level: log::Level,
}

impl Negotiator {
    pub fn new(options: &OpenOptions) -> Self {
        Self {
            state: NegotiationState::SeekingTarget,
            target: None,
            headers: HeaderDecoder::default(),
            fail_level: options.fail_level,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn target(&self) -> Option<u32> {
        self.target
    }

    pub fn run<R: Read>(&mut self, demux: &mut Demuxer<R>) -> Result<Negotiated, SessionError> {
        let result = self
            .seek_target(demux)
            .and_then(|serial| self.collect_headers(demux, serial));

        match &result {
            Ok(_) => self.state = NegotiationState::Ready,
            Err(e) => {
                debug!("Negotiation failed while {}: {e}", self.state);
                self.state = NegotiationState::Failed;
            }
        }

        result
    }

    fn seek_target<R: Read>(&mut self, demux: &mut Demuxer<R>) -> Result<u32, SessionError> {
        self.state = NegotiationState::SeekingTarget;

        while demux.next_page()?.is_some() {
            let Some(page) = demux.page().filter(|page| page.is_bos()) else {
                break;
            };
            let serial = page.serial();

            if let Some(target) = self.target {
                if serial != target {
                    demux.registry_mut().evict(serial);
                }
                continue;
            }

            let packet = match demux.packet_out(serial) {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    return Err(SessionError::BadHeaders {
                        serial,
                        reason: HeaderError::MissingFirstPacket,
                    });
                }
                Err(e) => {
                    return Err(SessionError::BadHeaders {
                        serial,
                        reason: e.into(),
                    });
                }
            };

            match self.headers.header_in(&packet) {
                Ok(_) => {
                    info!("Found Theora stream {serial:#010X}");
                    self.target = Some(serial);
                }
                Err(e) if e.is_not_format() => {
                    debug!("Stream {serial:#010X} is not Theora");
                    demux.registry_mut().evict(serial);
                }
                Err(reason) => return Err(SessionError::BadHeaders { serial, reason }),
            }
        }

        self.target.ok_or_else(|| SessionError::NoTargetStreamFound {
            discarded: demux.registry().evicted(),
        })
    }

    fn collect_headers<R: Read>(
        &mut self,
        demux: &mut Demuxer<R>,
        serial: u32,
    ) -> Result<Negotiated, SessionError> {
        self.state = NegotiationState::CollectingTargetHeaders;
        let bad_headers = |reason: HeaderError| SessionError::BadHeaders { serial, reason };

        while !demux.is_eof() {
            loop {
                let packet = match demux.packet_out(serial) {
                    Ok(Some(packet)) => packet,
                    Ok(None) => break,
                    Err(e) => {
                        log_or_err!(self, log::Level::Warn, bad_headers(e.into()));
                        continue;
                    }
                };

                match self.headers.header_in(&packet).map_err(bad_headers)? {
                    HeaderStatus::NeedMore(remaining) => {
                        debug!("Stream {serial:#010X}: {remaining} header packets to go");
                    }
                    HeaderStatus::Complete => return self.finish(serial, packet),
                }
            }

            if demux.next_page()? == Some(Routed::Created) {
                if let Some(late) = demux.page().map(Page::serial) {
                    debug!("Ignoring stream {late:#010X} starting after the headers");
                    demux.registry_mut().evict(late);
                }
            }
        }

        Err(SessionError::IncompleteHeaders { serial })
    }

    fn finish(&mut self, serial: u32, first_packet: Packet) -> Result<Negotiated, SessionError> {
        let bad_headers = |reason: HeaderError| SessionError::BadHeaders { serial, reason };

        let headers = std::mem::take(&mut self.headers)
            .into_headers()
            .map_err(bad_headers)?;
        let decoder = headers.decoder().map_err(bad_headers)?;

        let info = decoder.info();
        info!(
            "Theora {}.{}.{} stream {serial:#010X}: {}x{} {} @ {:.3} fps",
            info.version_major,
            info.version_minor,
            info.version_revision,
            info.pic_width,
            info.pic_height,
            info.pixel_format,
            info.frame_rate()
        );

        Ok(Negotiated {
            decoder,
            first_packet,
            headers,
            serial,
        })
    }
}
