#![allow(dead_code)]

use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;

use bitstream_io::{BigEndian, BitWrite, BitWriter};
use ogv::structs::page::{HEADER_TYPE_BOS, HEADER_TYPE_CONTINUED, HEADER_TYPE_EOS, Page};

pub const VIDEO_SERIAL: u32 = 0x5EED_0001;
pub const AUDIO_SERIAL: u32 = 0x0A0D_1000;

/// Identification header fields, in wire order.
#[derive(Debug, Clone)]
pub struct VideoParams {
    pub version: (u8, u8, u8),
    pub width_mbs: u16,
    pub height_mbs: u16,
    pub pic_width: u32,
    pub pic_height: u32,
    pub pic_x: u8,
    /// Offset from the bottom of the frame, as stored.
    pub pic_y: u8,
    pub fps: (u32, u32),
    pub aspect: (u32, u32),
    pub colorspace: u8,
    pub bitrate: u32,
    pub quality: u8,
    pub keyframe_shift: u8,
    pub pixel_format: u8,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            version: (3, 2, 1),
            width_mbs: 20,
            height_mbs: 15,
            pic_width: 318,
            pic_height: 236,
            pic_x: 1,
            pic_y: 3,
            fps: (30000, 1001),
            aspect: (1, 1),
            colorspace: 2,
            bitrate: 0,
            quality: 38,
            keyframe_shift: 6,
            pixel_format: 0,
        }
    }
}

fn header_writer(packet_type: u8) -> BitWriter<Vec<u8>, BigEndian> {
    let mut prefix = vec![packet_type];
    prefix.extend_from_slice(b"theora");

    BitWriter::endian(prefix, BigEndian)
}

pub fn identification(params: &VideoParams) -> Vec<u8> {
    let mut w = header_writer(0x80);
    let write = |w: &mut BitWriter<Vec<u8>, BigEndian>| -> io::Result<()> {
        w.write_unsigned_var(8, params.version.0)?;
        w.write_unsigned_var(8, params.version.1)?;
        w.write_unsigned_var(8, params.version.2)?;
        w.write_unsigned_var(16, params.width_mbs)?;
        w.write_unsigned_var(16, params.height_mbs)?;
        w.write_unsigned_var(24, params.pic_width)?;
        w.write_unsigned_var(24, params.pic_height)?;
        w.write_unsigned_var(8, params.pic_x)?;
        w.write_unsigned_var(8, params.pic_y)?;
        w.write_unsigned_var(32, params.fps.0)?;
        w.write_unsigned_var(32, params.fps.1)?;
        w.write_unsigned_var(24, params.aspect.0)?;
        w.write_unsigned_var(24, params.aspect.1)?;
        w.write_unsigned_var(8, params.colorspace)?;
        w.write_unsigned_var(24, params.bitrate)?;
        w.write_unsigned_var(6, params.quality)?;
        w.write_unsigned_var(5, params.keyframe_shift)?;
        w.write_unsigned_var(2, params.pixel_format)?;
        w.write_unsigned_var(3, 0u8)?;
        w.byte_align()
    };
    write(&mut w).unwrap();

    w.into_writer()
}

pub fn comment(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut packet = vec![0x81];
    packet.extend_from_slice(b"theora");

    packet.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    packet.extend_from_slice(vendor.as_bytes());
    packet.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        packet.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        packet.extend_from_slice(comment.as_bytes());
    }

    packet
}

/// Setup header with one base matrix, a single quant range and 80 two-leaf
/// Huffman trees. `range_size` is the width of that range; 63 is valid.
pub fn setup_with_range(range_size: u8) -> Vec<u8> {
    let mut w = header_writer(0x82);
    let write = |w: &mut BitWriter<Vec<u8>, BigEndian>| -> io::Result<()> {
        // Loop filter limits: 7-bit values.
        w.write_unsigned_var(3, 7u8)?;
        for qi in 0..64u8 {
            w.write_unsigned_var(7, 30 - qi / 4)?;
        }

        // AC then DC scales: 16-bit values.
        for scale in [100u16, 200] {
            w.write_unsigned_var(4, 15u8)?;
            for _ in 0..64 {
                w.write_unsigned_var(16, scale)?;
            }
        }

        // One base matrix.
        w.write_unsigned_var(9, 0u16)?;
        for _ in 0..64 {
            w.write_unsigned_var(8, 16u8)?;
        }

        // Intra luma ranges; index width is zero with a single matrix.
        w.write_unsigned_var(6, range_size - 1)?;

        // Every other (type, plane) copies its predecessor.
        w.write_bit(false)?;
        w.write_bit(false)?;
        for _ in 0..3 {
            w.write_bit(false)?;
            w.write_bit(false)?;
        }

        for token in 0..80u8 {
            w.write_bit(false)?;
            w.write_bit(true)?;
            w.write_unsigned_var(5, token % 32)?;
            w.write_bit(true)?;
            w.write_unsigned_var(5, (token + 1) % 32)?;
        }

        w.byte_align()
    };
    write(&mut w).unwrap();

    w.into_writer()
}

pub fn setup() -> Vec<u8> {
    setup_with_range(63)
}

pub fn theora_headers(params: &VideoParams) -> [Vec<u8>; 3] {
    [
        identification(params),
        comment(
            "Xiph.Org libtheora 1.1 20090822 (Thusnelda)",
            &["TITLE=Test pattern", "ENCODER=ogvd tests"],
        ),
        setup(),
    ]
}

/// First packet of a Vorbis stream; only its prefix matters here.
pub fn vorbis_identification() -> Vec<u8> {
    let mut packet = vec![0x01];
    packet.extend_from_slice(b"vorbis");
    packet.extend_from_slice(&[0, 0, 0, 0, 2, 0x44, 0xAC, 0, 0]);
    packet.resize(30, 0);
    packet
}

/// Content packet; bit 6 of the first byte selects intra (clear) or inter.
pub fn frame(intra: bool, len: usize) -> Vec<u8> {
    let mut packet = vec![if intra { 0x00 } else { 0x40 }];
    packet.resize(len.max(1), 0x5A);
    packet
}

fn lacing(packet: &[u8], segments: &mut Vec<u8>) {
    segments.extend(std::iter::repeat_n(255u8, packet.len() / 255));
    segments.push((packet.len() % 255) as u8);
}

/// Writes pages of one logical stream with consecutive sequence numbers.
#[derive(Debug)]
pub struct StreamWriter {
    pub serial: u32,
    pub sequence: u32,
}

impl StreamWriter {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            sequence: 0,
        }
    }

    /// A page holding `packets`, each complete.
    pub fn page(&mut self, header_type: u8, granule: i64, packets: &[&[u8]]) -> Vec<u8> {
        let mut segments = Vec::new();
        let mut body = Vec::new();
        for packet in packets {
            lacing(packet, &mut segments);
            body.extend_from_slice(packet);
        }

        self.raw_page(header_type, granule, &segments, &body)
    }

    pub fn bos(&mut self, packet: &[u8]) -> Vec<u8> {
        self.page(HEADER_TYPE_BOS, 0, &[packet])
    }

    pub fn eos(&mut self, granule: i64, packets: &[&[u8]]) -> Vec<u8> {
        self.page(HEADER_TYPE_EOS, granule, packets)
    }

    /// Two pages carrying `packet`; the first ends after 255 bytes.
    pub fn spanning(&mut self, packet: &[u8], granule: i64) -> Vec<u8> {
        assert!(packet.len() > 255);

        let mut bytes = self.raw_page(0, -1, &[255], &packet[..255]);
        let mut segments = Vec::new();
        lacing(&packet[255..], &mut segments);
        bytes.extend(self.raw_page(HEADER_TYPE_CONTINUED, granule, &segments, &packet[255..]));
        bytes
    }

    pub fn raw_page(&mut self, header_type: u8, granule: i64, segments: &[u8], body: &[u8]) -> Vec<u8> {
        let page = Page::new(header_type, granule, self.serial, self.sequence, segments, body);
        self.sequence += 1;
        page.to_bytes()
    }
}

/// A complete single-stream file: headers on their own pages, then `frames`
/// content packets, one per page.
pub fn theora_file(params: &VideoParams, frames: usize) -> Vec<u8> {
    let [id, comment, setup] = theora_headers(params);
    let mut video = StreamWriter::new(VIDEO_SERIAL);

    let mut bytes = video.bos(&id);
    bytes.extend(video.page(0, 0, &[&comment, &setup]));

    let shift = params.keyframe_shift as i64;
    for i in 0..frames {
        let packet = frame(i == 0, 40 + i);
        let granule = 1i64 << shift | i as i64;
        let page = if i + 1 == frames {
            video.eos(granule, &[&packet])
        } else {
            video.page(0, granule, &[&packet])
        };
        bytes.extend(page);
    }

    bytes
}

/// Byte source that counts how often it is dropped.
#[derive(Debug)]
pub struct TrackedSource<R> {
    pub inner: R,
    pub drops: Rc<Cell<usize>>,
}

impl<R> TrackedSource<R> {
    pub fn new(inner: R) -> (Self, Rc<Cell<usize>>) {
        let drops = Rc::new(Cell::new(0));
        (
            Self {
                inner,
                drops: drops.clone(),
            },
            drops,
        )
    }
}

impl<R: Read> Read for TrackedSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Drop for TrackedSource<R> {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Serves `limit` bytes, then fails every read.
#[derive(Debug)]
pub struct FailingSource<'a> {
    pub data: &'a [u8],
    pub limit: usize,
}

impl Read for FailingSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.limit == 0 {
            return Err(io::Error::from_raw_os_error(5));
        }

        let n = buf.len().min(self.limit).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        self.limit -= n;
        Ok(n)
    }
}
