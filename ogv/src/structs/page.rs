//! Ogg page structure
//!
//! A page is stored the way it appears on the wire: a header (fixed 27 bytes
//! followed by the lacing table) and a body. Field accessors decode the
//! header in place.

use crate::utils::crc::{CRC_FIELD_OFFSET, Crc32};

pub const CAPTURE_PATTERN: &[u8; 4] = b"OggS";

/// Length of the fixed part of a page header, up to the lacing table.
pub const PAGE_HEADER_LEN: usize = 27;

/// Largest possible page: full lacing table with 255-byte segments.
pub const MAX_PAGE_LEN: usize = PAGE_HEADER_LEN + 255 + 255 * 255;

pub const HEADER_TYPE_CONTINUED: u8 = 0x01;
pub const HEADER_TYPE_BOS: u8 = 0x02;
pub const HEADER_TYPE_EOS: u8 = 0x04;

/// One Ogg page.
///
/// A default page is empty; its field accessors read as zero until it is
/// filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    header: Vec<u8>,
    body: Vec<u8>,
}

impl Page {
    /// Builds a page and stamps its checksum.
    ///
    /// `segments` is the lacing table; the caller keeps it consistent with
    /// `body`.
    pub fn new(
        header_type: u8,
        granule_position: i64,
        serial: u32,
        sequence: u32,
        segments: &[u8],
        body: &[u8],
    ) -> Self {
        let mut header = Vec::with_capacity(PAGE_HEADER_LEN + segments.len());
        header.extend_from_slice(CAPTURE_PATTERN);
        header.push(0);
        header.push(header_type);
        header.extend_from_slice(&granule_position.to_le_bytes());
        header.extend_from_slice(&serial.to_le_bytes());
        header.extend_from_slice(&sequence.to_le_bytes());
        header.extend_from_slice(&[0; 4]);
        header.push(segments.len() as u8);
        header.extend_from_slice(segments);

        let crc = Crc32::default().page_checksum(&header, body);
        header[CRC_FIELD_OFFSET..CRC_FIELD_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());

        Self {
            header,
            body: body.to_vec(),
        }
    }

    /// Overwrites this page with new wire data, reusing the allocations.
    pub(crate) fn fill(&mut self, header: &[u8], body: &[u8]) {
        self.header.clear();
        self.header.extend_from_slice(header);
        self.body.clear();
        self.body.extend_from_slice(body);
    }

    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.header.len() < PAGE_HEADER_LEN
    }

    pub fn version(&self) -> u8 {
        self.field::<1>(4)[0]
    }

    pub fn header_type(&self) -> u8 {
        self.field::<1>(5)[0]
    }

    /// The first packet on this page continues one from the previous page.
    pub fn is_continued(&self) -> bool {
        self.header_type() & HEADER_TYPE_CONTINUED != 0
    }

    pub fn is_bos(&self) -> bool {
        self.header_type() & HEADER_TYPE_BOS != 0
    }

    pub fn is_eos(&self) -> bool {
        self.header_type() & HEADER_TYPE_EOS != 0
    }

    pub fn granule_position(&self) -> i64 {
        i64::from_le_bytes(self.field::<8>(6))
    }

    pub fn serial(&self) -> u32 {
        u32::from_le_bytes(self.field::<4>(14))
    }

    pub fn sequence(&self) -> u32 {
        u32::from_le_bytes(self.field::<4>(18))
    }

    pub fn checksum(&self) -> u32 {
        u32::from_le_bytes(self.field::<4>(CRC_FIELD_OFFSET))
    }

    /// The lacing table.
    pub fn segments(&self) -> &[u8] {
        self.header.get(PAGE_HEADER_LEN..).unwrap_or_default()
    }

    /// Number of packets that end on this page.
    pub fn packets_completed(&self) -> usize {
        self.segments().iter().filter(|&&lace| lace < 255).count()
    }

    /// Serializes the page as it appears in a file.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.body);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.len() + self.body.len());
        self.write_to(&mut out);
        out
    }

    fn field<const N: usize>(&self, offset: usize) -> [u8; N] {
        self.header
            .get(offset..offset + N)
            .and_then(|bytes| bytes.try_into().ok())
            .unwrap_or([0; N])
    }
}

#[test]
fn page_fields() {
    let page = Page::new(
        HEADER_TYPE_BOS,
        0x0102_0304,
        0xDEAD_BEEF,
        7,
        &[255, 10],
        &[0xAA; 265],
    );

    assert!(page.is_bos());
    assert!(!page.is_eos());
    assert!(!page.is_continued());
    assert_eq!(page.version(), 0);
    assert_eq!(page.granule_position(), 0x0102_0304);
    assert_eq!(page.serial(), 0xDEAD_BEEF);
    assert_eq!(page.sequence(), 7);
    assert_eq!(page.segments(), &[255, 10]);
    assert_eq!(page.packets_completed(), 1);
    assert_eq!(page.to_bytes().len(), PAGE_HEADER_LEN + 2 + 265);

    let bytes = page.to_bytes();
    let crc = Crc32::default().page_checksum(&bytes[..PAGE_HEADER_LEN + 2], page.body());
    assert_eq!(crc, page.checksum());
}

#[test]
fn empty_page_reads_as_zero() {
    let page = Page::default();

    assert!(page.is_empty());
    assert!(!page.is_bos());
    assert_eq!(page.version(), 0);
    assert_eq!(page.serial(), 0);
    assert_eq!(page.sequence(), 0);
    assert_eq!(page.granule_position(), 0);
    assert_eq!(page.checksum(), 0);
    assert!(page.segments().is_empty());
    assert_eq!(page.packets_completed(), 0);
}
