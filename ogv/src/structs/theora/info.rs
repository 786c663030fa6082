//! Theora identification header
//!
//! The first packet of a Theora stream. It fixes the coded frame size, the
//! visible picture region, timing and the chroma layout for the rest of the
//! stream.

use std::fmt::{Display, Formatter};

use anyhow::{Result, bail, ensure};
use log::trace;

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::IdentificationError;

/// Size of a well-formed identification header packet.
pub const IDENTIFICATION_HEADER_LEN: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Unspecified,
    ItuRec470M,
    ItuRec470BG,
    Reserved(u8),
}

impl From<u8> for ColorSpace {
    fn from(value: u8) -> Self {
        match value {
            0 => ColorSpace::Unspecified,
            1 => ColorSpace::ItuRec470M,
            2 => ColorSpace::ItuRec470BG,
            n => ColorSpace::Reserved(n),
        }
    }
}

impl Display for ColorSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorSpace::Unspecified => write!(f, "Unspecified"),
            ColorSpace::ItuRec470M => write!(f, "ITU-R BT.470 M"),
            ColorSpace::ItuRec470BG => write!(f, "ITU-R BT.470 BG"),
            ColorSpace::Reserved(n) => write!(f, "Reserved ({n})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Yuv420,
    Yuv422,
    Yuv444,
}

impl PixelFormat {
    /// Horizontal and vertical chroma decimation as right shifts.
    pub fn chroma_shift(&self) -> (u32, u32) {
        match self {
            PixelFormat::Yuv420 => (1, 1),
            PixelFormat::Yuv422 => (1, 0),
            PixelFormat::Yuv444 => (0, 0),
        }
    }
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelFormat::Yuv420 => write!(f, "4:2:0"),
            PixelFormat::Yuv422 => write!(f, "4:2:2"),
            PixelFormat::Yuv444 => write!(f, "4:4:4"),
        }
    }
}

/// Parsed identification header.
///
/// `pic_y` is measured from the top of the frame; the bitstream stores it
/// from the bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub version_major: u8,
    pub version_minor: u8,
    pub version_revision: u8,
    pub frame_width: u32,
    pub frame_height: u32,
    pub pic_width: u32,
    pub pic_height: u32,
    pub pic_x: u32,
    pub pic_y: u32,
    pub fps_numerator: u32,
    pub fps_denominator: u32,
    pub aspect_numerator: u32,
    pub aspect_denominator: u32,
    pub colorspace: ColorSpace,
    pub pixel_format: PixelFormat,
    pub target_bitrate: u32,
    pub quality: u8,
    pub keyframe_granule_shift: u8,
}

impl Info {
    /// Reads the header body following the 7-byte packet prefix.
    pub fn read(reader: &mut BsIoSliceReader, packet_len: usize) -> Result<Self> {
        ensure!(
            packet_len >= IDENTIFICATION_HEADER_LEN,
            IdentificationError::TooShort(packet_len)
        );

        let version_major: u8 = reader.get_n(8)?;
        let version_minor: u8 = reader.get_n(8)?;
        let version_revision: u8 = reader.get_n(8)?;

        if version_major != 3 || version_minor > 2 {
            bail!(IdentificationError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
                revision: version_revision,
            });
        }

        let width_mbs: u16 = reader.get_n(16)?;
        let height_mbs: u16 = reader.get_n(16)?;
        if width_mbs == 0 || height_mbs == 0 {
            bail!(IdentificationError::ZeroFrameSize {
                width_mbs,
                height_mbs
            });
        }
        let frame_width = (width_mbs as u32) << 4;
        let frame_height = (height_mbs as u32) << 4;

        let pic_width: u32 = reader.get_n(24)?;
        let pic_height: u32 = reader.get_n(24)?;
        let pic_x: u32 = reader.get_n(8)?;
        let pic_y_bottom: u32 = reader.get_n(8)?;

        if pic_width + pic_x > frame_width || pic_height + pic_y_bottom > frame_height {
            bail!(IdentificationError::PictureOutsideFrame {
                pic_width,
                pic_height,
                pic_x,
                pic_y: pic_y_bottom,
                frame_width,
                frame_height,
            });
        }

        let fps_numerator: u32 = reader.get_n(32)?;
        let fps_denominator: u32 = reader.get_n(32)?;
        if fps_numerator == 0 || fps_denominator == 0 {
            bail!(IdentificationError::ZeroFrameRate {
                numerator: fps_numerator,
                denominator: fps_denominator,
            });
        }

        let aspect_numerator: u32 = reader.get_n(24)?;
        let aspect_denominator: u32 = reader.get_n(24)?;
        let colorspace = ColorSpace::from(reader.get_n::<u8>(8)?);
        let target_bitrate: u32 = reader.get_n(24)?;
        let quality: u8 = reader.get_n(6)?;
        let keyframe_granule_shift: u8 = reader.get_n(5)?;

        let pixel_format = match reader.get_n::<u8>(2)? {
            0 => PixelFormat::Yuv420,
            2 => PixelFormat::Yuv422,
            3 => PixelFormat::Yuv444,
            _ => bail!(IdentificationError::ReservedPixelFormat),
        };

        let reserved: u8 = reader.get_n(3)?;
        ensure!(
            reserved == 0,
            IdentificationError::ReservedBitsNonZero(reserved)
        );

        let info = Info {
            version_major,
            version_minor,
            version_revision,
            frame_width,
            frame_height,
            pic_width,
            pic_height,
            pic_x,
            pic_y: frame_height - pic_height - pic_y_bottom,
            fps_numerator,
            fps_denominator,
            aspect_numerator,
            aspect_denominator,
            colorspace,
            pixel_format,
            target_bitrate,
            quality,
            keyframe_granule_shift,
        };

        trace!(
            "Theora {}.{}.{}: {}x{} frame, {}x{}+{}+{} picture, {}/{} fps",
            info.version_major,
            info.version_minor,
            info.version_revision,
            info.frame_width,
            info.frame_height,
            info.pic_width,
            info.pic_height,
            info.pic_x,
            info.pic_y,
            info.fps_numerator,
            info.fps_denominator
        );

        Ok(info)
    }

    /// Frame rate in frames per second.
    pub fn frame_rate(&self) -> f64 {
        self.fps_numerator as f64 / self.fps_denominator as f64
    }

    /// Whether the stream uses the 3.2.1 granule numbering, where the first
    /// frame is frame 1.
    pub fn counts_frames_from_one(&self) -> bool {
        (self.version_major, self.version_minor, self.version_revision) >= (3, 2, 1)
    }
}
