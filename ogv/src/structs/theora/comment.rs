//! Theora comment header (vendor string and `TAG=value` user comments)

use anyhow::{Result, bail};

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::CommentError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub vendor: String,
    pub user_comments: Vec<String>,
}

impl Comment {
    /// Reads the header body following the 7-byte packet prefix.
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let vendor = read_string(reader, "vendor string")?;

        let count = read_length(reader, "comment count", 4)?;
        let mut user_comments = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            user_comments.push(read_string(reader, "user comment")?);
        }

        Ok(Comment {
            vendor,
            user_comments,
        })
    }

    /// Values of every comment whose tag matches `tag`, ignoring case.
    pub fn query<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags()
            .filter(move |(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, value)| value)
    }

    pub fn query_count(&self, tag: &str) -> usize {
        self.query(tag).count()
    }

    /// `(tag, value)` pairs; comments without `=` are skipped.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.user_comments
            .iter()
            .filter_map(|comment| comment.split_once('='))
    }
}

/// Reads a little-endian length and checks that `unit`-sized items of that
/// count fit in the rest of the packet.
fn read_length(reader: &mut BsIoSliceReader, field: &'static str, unit: usize) -> Result<usize> {
    let length = reader.get_u32_le()? as usize;
    let remaining = (reader.available()? >> 3) as usize;

    if length.saturating_mul(unit) > remaining {
        bail!(CommentError::LengthExceedsPacket {
            field,
            length,
            remaining,
        });
    }

    Ok(length)
}

fn read_string(reader: &mut BsIoSliceReader, field: &'static str) -> Result<String> {
    let length = read_length(reader, field, 1)?;
    let bytes = reader.get_bytes(length)?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[test]
fn comment_query() {
    let comment = Comment {
        vendor: "Xiph.Org libtheora 1.1 20090822 (Thusnelda)".into(),
        user_comments: vec![
            "TITLE=Song".into(),
            "artist=One".into(),
            "ARTIST=Two".into(),
            "garbage".into(),
        ],
    };

    assert_eq!(comment.query("Artist").collect::<Vec<_>>(), ["One", "Two"]);
    assert_eq!(comment.query_count("title"), 1);
    assert_eq!(comment.query_count("garbage"), 0);
    assert_eq!(comment.tags().count(), 3);
}
