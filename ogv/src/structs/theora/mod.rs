//! Theora header packets and the decode context built from them.
//!
//! Headers arrive as three packets, each starting with a type byte (high bit
//! set) and the string `theora`:
//!
//! | type   | header                                  |
//! |--------|-----------------------------------------|
//! | `0x80` | identification ([`info::Info`])         |
//! | `0x81` | comment ([`comment::Comment`])          |
//! | `0x82` | setup ([`setup::Setup`])                |
//!
//! [`HeaderDecoder::header_in`] accepts them one at a time and reports how
//! far along the sequence is.

pub mod comment;
pub mod decoder;
pub mod info;
pub mod setup;

use log::debug;

use crate::structs::stream::Packet;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{HeaderError, HeaderKind};
use comment::Comment;
use decoder::Decoder;
use info::Info;
use setup::Setup;

pub const THEORA_MAGIC: &[u8; 6] = b"theora";

const PACKET_TYPE_IDENTIFICATION: u8 = 0x80;
const PACKET_TYPE_COMMENT: u8 = 0x81;
const PACKET_TYPE_SETUP: u8 = 0x82;

/// Progress reported by [`HeaderDecoder::header_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// Header accepted; more are required. Counts down 3, 2, 1.
    NeedMore(u8),
    /// All headers are in and a content packet has arrived.
    Complete,
}

/// The complete header set of one stream.
#[derive(Debug, Clone)]
pub struct Headers {
    pub setup: Setup,
    pub comment: Comment,
    pub info: Info,
}

/// Accumulates the identification, comment and setup headers of one stream.
#[derive(Debug, Default)]
pub struct HeaderDecoder {
    setup: Option<Setup>,
    comment: Option<Comment>,
    info: Option<Info>,
}

impl HeaderDecoder {
    /// Feeds one packet.
    ///
    /// Returns [`HeaderError::NotFormat`] for packets of other codecs and
    /// [`HeaderStatus::Complete`] for the first content packet after the
    /// setup header. That content packet is not consumed; the caller still
    /// owns it.
    pub fn header_in(&mut self, packet: &Packet) -> Result<HeaderStatus, HeaderError> {
        let data = packet.data.as_slice();
        let packet_type = data.first().copied().unwrap_or(0);

        if packet_type & 0x80 == 0 {
            if self.is_complete() {
                return Ok(HeaderStatus::Complete);
            }
            return Err(if self.info.is_none() {
                HeaderError::NotFormat
            } else {
                HeaderError::UnexpectedDataPacket
            });
        }

        if data.get(1..7) != Some(THEORA_MAGIC.as_slice()) {
            return Err(HeaderError::NotFormat);
        }

        let mut reader = BsIoSliceReader::from_slice(&data[7..]);

        match packet_type {
            PACKET_TYPE_IDENTIFICATION => {
                if self.info.is_some() {
                    return Err(HeaderError::Duplicate(HeaderKind::Identification));
                }
                if !packet.bos {
                    return Err(HeaderError::IdentificationNotFirst);
                }

                let info = Info::read(&mut reader, data.len()).map_err(|reason| {
                    HeaderError::Invalid {
                        kind: HeaderKind::Identification,
                        reason,
                    }
                })?;
                debug!(
                    "Theora identification header: {}x{} @ {}/{} fps",
                    info.pic_width, info.pic_height, info.fps_numerator, info.fps_denominator
                );
                self.info = Some(info);

                Ok(HeaderStatus::NeedMore(3))
            }
            PACKET_TYPE_COMMENT => {
                if self.info.is_none() {
                    return Err(HeaderError::OutOfOrder {
                        kind: HeaderKind::Comment,
                        missing: HeaderKind::Identification,
                    });
                }
                if self.comment.is_some() {
                    return Err(HeaderError::Duplicate(HeaderKind::Comment));
                }

                let comment = Comment::read(&mut reader).map_err(|reason| HeaderError::Invalid {
                    kind: HeaderKind::Comment,
                    reason,
                })?;
                debug!(
                    "Theora comment header: vendor {:?}, {} comments",
                    comment.vendor,
                    comment.user_comments.len()
                );
                self.comment = Some(comment);

                Ok(HeaderStatus::NeedMore(2))
            }
            PACKET_TYPE_SETUP => {
                if self.info.is_none() {
                    return Err(HeaderError::OutOfOrder {
                        kind: HeaderKind::Setup,
                        missing: HeaderKind::Identification,
                    });
                }
                if self.comment.is_none() {
                    return Err(HeaderError::OutOfOrder {
                        kind: HeaderKind::Setup,
                        missing: HeaderKind::Comment,
                    });
                }
                if self.setup.is_some() {
                    return Err(HeaderError::Duplicate(HeaderKind::Setup));
                }

                let setup = Setup::read(&mut reader).map_err(|reason| HeaderError::Invalid {
                    kind: HeaderKind::Setup,
                    reason,
                })?;
                debug!("Theora setup header accepted");
                self.setup = Some(setup);

                Ok(HeaderStatus::NeedMore(1))
            }
            other => Err(HeaderError::UnknownType(other)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.info.is_some() && self.comment.is_some() && self.setup.is_some()
    }

    pub fn info(&self) -> Option<&Info> {
        self.info.as_ref()
    }

    pub fn comment(&self) -> Option<&Comment> {
        self.comment.as_ref()
    }

    pub fn setup(&self) -> Option<&Setup> {
        self.setup.as_ref()
    }

    /// Hands out the accepted headers once all three are in.
    pub fn into_headers(self) -> Result<Headers, HeaderError> {
        match (self.info, self.comment, self.setup) {
            (Some(info), Some(comment), Some(setup)) => Ok(Headers {
                setup,
                comment,
                info,
            }),
            _ => Err(HeaderError::Incomplete),
        }
    }
}

impl Headers {
    /// Allocates a decode context.
    pub fn decoder(&self) -> Result<Decoder, HeaderError> {
        Ok(Decoder::new(&self.info, &self.setup)?)
    }
}
