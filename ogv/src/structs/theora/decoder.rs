//! Decode context allocated once all three headers are in.

use std::fmt::{Display, Formatter};

use log::debug;

use crate::structs::stream::Packet;
use crate::structs::theora::info::Info;
use crate::structs::theora::setup::{PLANES, QUANT_INDICES, QUANT_TYPES, Setup};
use crate::utils::errors::DecoderError;

/// Plane, block and superblock layout of a coded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Width and height of the luma plane and of each chroma plane.
    pub plane_sizes: [(u32, u32); PLANES],
    /// 8x8 fragments per plane.
    pub fragments: [u32; PLANES],
    /// 32x32 superblocks per plane.
    pub superblocks: [u32; PLANES],
    pub macroblocks: u32,
}

impl FrameGeometry {
    pub fn new(info: &Info) -> Result<Self, DecoderError> {
        let (width, height) = (info.frame_width, info.frame_height);
        if width == 0 || height == 0 || width % 16 != 0 || height % 16 != 0 {
            return Err(DecoderError::InvalidFrameSize { width, height });
        }

        let (hdec, vdec) = info.pixel_format.chroma_shift();
        let chroma = (width >> hdec, height >> vdec);
        let plane_sizes = [(width, height), chroma, chroma];

        let overflow = || DecoderError::TooManyFragments { width, height };
        let mut fragments = [0u32; PLANES];
        let mut superblocks = [0u32; PLANES];
        for (pli, &(w, h)) in plane_sizes.iter().enumerate() {
            fragments[pli] = (w / 8).checked_mul(h / 8).ok_or_else(overflow)?;
            superblocks[pli] = w.div_ceil(32).checked_mul(h.div_ceil(32)).ok_or_else(overflow)?;
        }
        fragments
            .iter()
            .try_fold(0u32, |total, &n| total.checked_add(n))
            .ok_or_else(overflow)?;

        Ok(FrameGeometry {
            plane_sizes,
            fragments,
            superblocks,
            macroblocks: (width / 16) * (height / 16),
        })
    }

    pub fn total_fragments(&self) -> u32 {
        self.fragments.iter().sum()
    }
}

/// How a content packet codes its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Intra,
    Inter,
    /// Zero-length packet: repeat the previous frame.
    Duplicate,
}

impl Display for FrameKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameKind::Intra => write!(f, "intra"),
            FrameKind::Inter => write!(f, "inter"),
            FrameKind::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// Decoding state built from validated headers.
#[derive(Debug, Clone)]
pub struct Decoder {
    info: Info,
    geometry: FrameGeometry,
    loop_filter_limits: [u8; 64],
    dequant: Vec<[u16; 64]>,
}

impl Decoder {
    pub fn new(info: &Info, setup: &Setup) -> Result<Self, DecoderError> {
        let geometry = FrameGeometry::new(info)?;

        let mut dequant = Vec::with_capacity(QUANT_TYPES * PLANES * QUANT_INDICES);
        for qti in 0..QUANT_TYPES {
            for pli in 0..PLANES {
                for qi in 0..QUANT_INDICES {
                    dequant.push(setup.quant.matrix(qti, pli, qi));
                }
            }
        }

        debug!(
            "Decoder allocated: {} macroblocks, {} fragments",
            geometry.macroblocks,
            geometry.total_fragments()
        );

        Ok(Decoder {
            info: info.clone(),
            geometry,
            loop_filter_limits: setup.loop_filter_limits,
            dequant,
        })
    }

    pub fn info(&self) -> &Info {
        &self.info
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn loop_filter_limit(&self, qi: usize) -> u8 {
        self.loop_filter_limits[qi]
    }

    /// Dequantization matrix for quantizer type `qti` (0 intra, 1 inter),
    /// plane `pli` and quality index `qi`.
    pub fn dequant(&self, qti: usize, pli: usize, qi: usize) -> &[u16; 64] {
        &self.dequant[(qti * PLANES + pli) * QUANT_INDICES + qi]
    }

    /// Classifies a content packet; header packets yield `None`.
    pub fn frame_kind(&self, packet: &Packet) -> Option<FrameKind> {
        match packet.data.first() {
            None => Some(FrameKind::Duplicate),
            Some(byte) if byte & 0x80 != 0 => None,
            Some(byte) if byte & 0x40 == 0 => Some(FrameKind::Intra),
            Some(_) => Some(FrameKind::Inter),
        }
    }

    /// Frame index for a granule position, or -1 when there is none.
    pub fn granule_frame(&self, granule_position: i64) -> i64 {
        if granule_position < 0 {
            return -1;
        }

        let shift = self.info.keyframe_granule_shift as u32;
        let keyframe = granule_position >> shift;
        let delta = granule_position - (keyframe << shift);

        keyframe + delta - self.info.counts_frames_from_one() as i64
    }

    /// End time in seconds of the frame at `granule_position`, or -1.
    pub fn granule_time(&self, granule_position: i64) -> f64 {
        if granule_position < 0 {
            return -1.0;
        }

        (self.granule_frame(granule_position) + 1) as f64 * self.info.fps_denominator as f64
            / self.info.fps_numerator as f64
    }

    /// Whether `granule_position` falls on a keyframe.
    pub fn is_keyframe_granule(&self, granule_position: i64) -> bool {
        let shift = self.info.keyframe_granule_shift as u32;
        granule_position >= 0 && granule_position & ((1i64 << shift) - 1) == 0
    }
}
