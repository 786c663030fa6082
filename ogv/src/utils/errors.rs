use std::fmt::{Display, Formatter};
use std::io;

/// Logs `$err` at `$level`, or returns it when `$level` is at or above the
/// configured `fail_level` of `$state`.
#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum PageError {
    #[error(
        "CRC mismatch on page {sequence} of stream {serial:#010X}. Calculated {calculated:#010X}, Read {read:#010X}"
    )]
    CrcMismatch {
        serial: u32,
        sequence: u32,
        calculated: u32,
        read: u32,
    },

    #[error("Unsupported page structure version {0}")]
    UnsupportedVersion(u8),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Page of stream {found:#010X} routed to stream {expected:#010X}")]
    SerialMismatch { expected: u32, found: u32 },

    #[error("Missing pages in stream {serial:#010X}: expected sequence {expected}, got {found}")]
    Hole {
        serial: u32,
        expected: u32,
        found: u32,
    },
}

/// The three Theora header packets, in stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Identification,
    Comment,
    Setup,
}

impl Display for HeaderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HeaderKind::Identification => write!(f, "identification"),
            HeaderKind::Comment => write!(f, "comment"),
            HeaderKind::Setup => write!(f, "setup"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    #[error("Packet is not a Theora header")]
    NotFormat,

    #[error("Beginning-of-stream page did not yield a complete first packet")]
    MissingFirstPacket,

    #[error("Identification header must be the first packet of the stream")]
    IdentificationNotFirst,

    #[error("Duplicate {0} header")]
    Duplicate(HeaderKind),

    #[error("{kind} header received before the {missing} header")]
    OutOfOrder { kind: HeaderKind, missing: HeaderKind },

    #[error("Unknown header packet type {0:#04X}")]
    UnknownType(u8),

    #[error("Data packet received before all headers")]
    UnexpectedDataPacket,

    #[error("Header sequence is incomplete")]
    Incomplete,

    #[error("Invalid {kind} header: {reason}")]
    Invalid {
        kind: HeaderKind,
        reason: anyhow::Error,
    },

    #[error("Cannot allocate decoder: {0}")]
    Decoder(#[from] DecoderError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl HeaderError {
    /// `true` when the packet simply belongs to another codec.
    pub fn is_not_format(&self) -> bool {
        matches!(self, HeaderError::NotFormat)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum IdentificationError {
    #[error("Identification header too short: {0} bytes")]
    TooShort(usize),

    #[error("Unsupported Theora version {major}.{minor}.{revision}")]
    UnsupportedVersion { major: u8, minor: u8, revision: u8 },

    #[error("Frame size must be non-zero. Read {width_mbs}x{height_mbs} macroblocks")]
    ZeroFrameSize { width_mbs: u16, height_mbs: u16 },

    #[error(
        "Picture region {pic_width}x{pic_height}+{pic_x}+{pic_y} exceeds frame {frame_width}x{frame_height}"
    )]
    PictureOutsideFrame {
        pic_width: u32,
        pic_height: u32,
        pic_x: u32,
        pic_y: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("Frame rate must be non-zero. Read {numerator}/{denominator}")]
    ZeroFrameRate { numerator: u32, denominator: u32 },

    #[error("Pixel format value 1 is reserved")]
    ReservedPixelFormat,

    #[error("Reserved bits should be 0. Read {0:#03b}")]
    ReservedBitsNonZero(u8),
}

#[derive(thiserror::Error, Debug)]
pub enum CommentError {
    #[error("{field} length {length} exceeds the {remaining} bytes left in the packet")]
    LengthExceedsPacket {
        field: &'static str,
        length: usize,
        remaining: usize,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum SetupError {
    #[error("Number of base matrices must be <= 384. Read {0}")]
    TooManyBaseMatrices(usize),

    #[error("Base matrix index {index} out of range ({count} matrices)")]
    BaseMatrixIndexOutOfRange { index: usize, count: usize },

    #[error("Quant ranges for type {qti} plane {pli} cover {total} qi values, expected 63")]
    QuantRangeOverflow { qti: usize, pli: usize, total: usize },

    #[error("Huffman tree {0} is deeper than 32 bits")]
    HuffmanTreeTooDeep(usize),

    #[error("Huffman tree {0} has more than 32 tokens")]
    HuffmanTreeTooManyTokens(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum DecoderError {
    #[error("Frame dimensions {width}x{height} must be non-zero multiples of 16")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("Fragment count overflows for a {width}x{height} frame")]
    TooManyFragments { width: u32, height: u32 },
}

/// Broad category of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDomain {
    Io,
    Format,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Failed to {action} video: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Bad headers in Theora stream {serial:#010X}: {reason}")]
    BadHeaders {
        serial: u32,
        #[source]
        reason: HeaderError,
    },

    #[error("Failed to find a Theora stream in the video file ({discarded} other streams discarded)")]
    NoTargetStreamFound { discarded: usize },

    #[error("Failed to find all necessary Theora headers in stream {serial:#010X}")]
    IncompleteHeaders { serial: u32 },

    #[error("Corrupt video file: {0}")]
    Corrupt(#[from] PageError),
}

impl SessionError {
    pub fn domain(&self) -> ErrorDomain {
        match self {
            SessionError::Io { .. } => ErrorDomain::Io,
            _ => ErrorDomain::Format,
        }
    }

    /// Stable error code: the OS error number for I/O failures (or -1 when
    /// the platform reported none), a fixed value per kind otherwise.
    pub fn code(&self) -> i32 {
        match self {
            SessionError::Io { source, .. } => source.raw_os_error().unwrap_or(-1),
            SessionError::BadHeaders { .. } => 1,
            SessionError::NoTargetStreamFound { .. } => 2,
            SessionError::IncompleteHeaders { .. } => 3,
            SessionError::Corrupt(_) => 4,
        }
    }

    pub(crate) fn read(source: io::Error) -> Self {
        SessionError::Io {
            action: "read",
            source,
        }
    }

    pub(crate) fn open(source: io::Error) -> Self {
        SessionError::Io {
            action: "open",
            source,
        }
    }
}

#[test]
fn session_error_codes() {
    let err = SessionError::read(io::Error::from_raw_os_error(5));
    assert_eq!(err.domain(), ErrorDomain::Io);
    assert_eq!(err.code(), 5);

    let err = SessionError::BadHeaders {
        serial: 7,
        reason: HeaderError::MissingFirstPacket,
    };
    assert_eq!(err.domain(), ErrorDomain::Format);
    assert_eq!(err.code(), 1);
    assert!(err.to_string().contains("0x00000007"));

    assert_eq!(
        SessionError::NoTargetStreamFound { discarded: 2 }.code(),
        2
    );
    assert_eq!(SessionError::IncompleteHeaders { serial: 1 }.code(), 3);
}
