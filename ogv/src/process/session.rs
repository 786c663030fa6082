use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, trace};

use crate::process::OpenOptions;
use crate::process::demux::Demuxer;
use crate::process::negotiate::{Negotiated, Negotiator};
use crate::process::registry::{Routed, StreamRegistry};
use crate::structs::page::Page;
use crate::structs::stream::{Packet, StreamState};
use crate::structs::theora::Headers;
use crate::structs::theora::comment::Comment;
use crate::structs::theora::decoder::Decoder;
use crate::structs::theora::info::Info;
use crate::structs::theora::setup::Setup;
use crate::utils::errors::SessionError;

/// An Ogg file whose Theora stream has been located and whose headers have
/// been decoded.
///
/// Opening reads only as far as the first content packet of the video
/// stream. [`next_packet`](Session::next_packet) continues from there.
///
/// Resources are released in reverse order of acquisition when the session
/// is dropped: decoder, headers, stream registry, synchronizer, byte source.
/// A failed open releases whatever it had acquired the same way.
///
/// # Example
///
/// ```rust,no_run
/// use ogv::process::session::Session;
///
/// let mut session = Session::open("video.ogv")?;
/// let info = session.info();
/// println!("{}x{}", info.pic_width, info.pic_height);
///
/// while let Some(packet) = session.next_packet()? {
///     let frame = session.decoder().granule_frame(packet.granule_position);
///     println!("packet {} ends frame {frame}", packet.packet_number);
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Session<R> {
    decoder: Decoder,
    pending: Option<Packet>,
    headers: Headers,
    serial: u32,
    demux: Demuxer<R>,
}

impl Session<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        Self::open_with(path, &OpenOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(SessionError::open)?;
        debug!("Opened {}", path.display());

        Self::from_reader(file, options)
    }
}

impl<R: Read> Session<R> {
    /// Negotiates over an arbitrary byte source.
    pub fn from_reader(source: R, options: &OpenOptions) -> Result<Self, SessionError> {
        let mut demux = Demuxer::new(source, options);
        let Negotiated {
            decoder,
            first_packet,
            headers,
            serial,
        } = Negotiator::new(options).run(&mut demux)?;

        debug!(
            "Headers complete after {} pages, {} bytes",
            demux.pages_read(),
            demux.bytes_read()
        );

        Ok(Session {
            decoder,
            pending: Some(first_packet),
            headers,
            serial,
            demux,
        })
    }

    /// Next content packet of the Theora stream, or `None` at end of input.
    ///
    /// Pages of other streams read along the way are discarded.
    pub fn next_packet(&mut self) -> Result<Option<Packet>, SessionError> {
        if let Some(packet) = self.pending.take() {
            return Ok(Some(packet));
        }

        loop {
            match self.demux.packet_out(self.serial) {
                Ok(Some(packet)) => {
                    trace!(
                        "Packet {}: {} bytes, granule {}",
                        packet.packet_number,
                        packet.data.len(),
                        packet.granule_position
                    );
                    return Ok(Some(packet));
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("Skipping lost data: {e}");
                    continue;
                }
            }

            match self.demux.next_page()? {
                None => return Ok(None),
                Some(Routed::Created) => {
                    if let Some(late) = self.demux.page().map(Page::serial) {
                        debug!("Ignoring stream {late:#010X} starting mid-file");
                        self.demux.registry_mut().evict(late);
                    }
                }
                Some(_) => {}
            }
        }
    }

    pub fn info(&self) -> &Info {
        &self.headers.info
    }

    pub fn comment(&self) -> &Comment {
        &self.headers.comment
    }

    pub fn setup(&self) -> &Setup {
        &self.headers.setup
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn target_serial(&self) -> u32 {
        self.serial
    }

    pub fn registry(&self) -> &StreamRegistry {
        self.demux.registry()
    }

    /// Reassembly state of the Theora stream.
    pub fn target_stream(&self) -> Option<&StreamState> {
        self.demux.registry().entry_for(self.serial)
    }

    pub fn is_eof(&self) -> bool {
        self.demux.is_eof()
    }

    pub fn pages_read(&self) -> usize {
        self.demux.pages_read()
    }

    pub fn bytes_read(&self) -> u64 {
        self.demux.bytes_read()
    }

    pub fn bytes_skipped(&self) -> usize {
        self.demux.bytes_skipped()
    }
}

impl<R: Read> Iterator for Session<R> {
    type Item = Result<Packet, SessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}
