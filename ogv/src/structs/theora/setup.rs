//! Theora setup header
//!
//! Carries the loop filter limits, the quantization parameters and the 80
//! Huffman trees used to decode DCT tokens. Everything a decoder needs beyond
//! frame geometry comes from here.

use std::io;

use anyhow::{Result, bail};
use log::trace;

use crate::utils::bitstream_io::{BitstreamIoReader, BsIoSliceReader, ilog};
use crate::utils::errors::SetupError;

pub const HUFFMAN_TABLES: usize = 80;
pub const MAX_BASE_MATRICES: usize = 384;

/// Quantizer type index: intra (0) or inter (1) coded blocks.
pub const QUANT_TYPES: usize = 2;
pub const PLANES: usize = 3;
pub const QUANT_INDICES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    pub loop_filter_limits: [u8; 64],
    pub quant: QuantParams,
    pub huffman_tables: Vec<HuffmanTree>,
}

impl Setup {
    /// Reads the header body following the 7-byte packet prefix.
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let loop_filter_limits = Self::read_loop_filter_limits(reader)?;
        let quant = QuantParams::read(reader)?;

        let mut huffman_tables = Vec::with_capacity(HUFFMAN_TABLES);
        for index in 0..HUFFMAN_TABLES {
            huffman_tables.push(HuffmanTree::read(reader, index)?);
        }

        trace!(
            "Theora setup: {} base matrices, {} huffman tables",
            quant.base_matrices.len(),
            huffman_tables.len()
        );

        Ok(Setup {
            loop_filter_limits,
            quant,
            huffman_tables,
        })
    }

    fn read_loop_filter_limits(reader: &mut BsIoSliceReader) -> Result<[u8; 64]> {
        let bits: u32 = reader.get_n(3)?;

        let mut limits = [0u8; 64];
        for limit in limits.iter_mut() {
            *limit = reader.get_n(bits)?;
        }

        Ok(limits)
    }
}

/// A run of `qi` values interpolated between two base matrices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantRanges {
    /// Width of each range; the widths add up to 63.
    pub sizes: Vec<u8>,
    /// Base matrix at each range boundary, one more than `sizes`.
    pub base_matrix_indices: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantParams {
    pub ac_scale: [u16; 64],
    pub dc_scale: [u16; 64],
    pub base_matrices: Vec<[u8; 64]>,
    /// Indexed by quantizer type, then plane.
    pub ranges: [[QuantRanges; PLANES]; QUANT_TYPES],
}

impl QuantParams {
    fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let ac_scale = Self::read_scale(reader)?;
        let dc_scale = Self::read_scale(reader)?;

        let count = reader.get_n::<u16>(9)? as usize + 1;
        if count > MAX_BASE_MATRICES {
            bail!(SetupError::TooManyBaseMatrices(count));
        }

        let mut base_matrices = Vec::with_capacity(count);
        for _ in 0..count {
            let mut matrix = [0u8; 64];
            for coefficient in matrix.iter_mut() {
                *coefficient = reader.get_n(8)?;
            }
            base_matrices.push(matrix);
        }

        let index_bits = ilog(count as u32 - 1);
        let mut ranges: [[QuantRanges; PLANES]; QUANT_TYPES] = Default::default();

        for qti in 0..QUANT_TYPES {
            for pli in 0..PLANES {
                let new_ranges = if qti > 0 || pli > 0 {
                    reader.get()?
                } else {
                    true
                };

                if !new_ranges {
                    let copy_previous_type = qti > 0 && reader.get()?;
                    let (qtj, plj) = if copy_previous_type {
                        (qti - 1, pli)
                    } else {
                        let i = 3 * qti + pli - 1;
                        (i / 3, i % 3)
                    };
                    ranges[qti][pli] = ranges[qtj][plj].clone();
                    continue;
                }

                let read_index = |reader: &mut BsIoSliceReader| -> Result<usize> {
                    let index = reader.get_n::<u16>(index_bits)? as usize;
                    if index >= count {
                        bail!(SetupError::BaseMatrixIndexOutOfRange { index, count });
                    }
                    Ok(index)
                };

                let mut current = QuantRanges::default();
                current.base_matrix_indices.push(read_index(reader)?);

                let mut qi = 0usize;
                while qi < 63 {
                    let size = reader.get_n::<u8>(ilog(62 - qi as u32))? as usize + 1;
                    qi += size;
                    current.sizes.push(size as u8);
                    current.base_matrix_indices.push(read_index(reader)?);
                }

                if qi > 63 {
                    bail!(SetupError::QuantRangeOverflow { qti, pli, total: qi });
                }

                ranges[qti][pli] = current;
            }
        }

        Ok(QuantParams {
            ac_scale,
            dc_scale,
            base_matrices,
            ranges,
        })
    }

    fn read_scale(reader: &mut BsIoSliceReader) -> Result<[u16; 64]> {
        let bits = reader.get_n::<u32>(4)? + 1;

        let mut scale = [0u16; 64];
        for value in scale.iter_mut() {
            *value = reader.get_n(bits)?;
        }

        Ok(scale)
    }

    /// Dequantization matrix for quantizer type `qti`, plane `pli` and
    /// quality index `qi`, in zig-zag order.
    pub fn matrix(&self, qti: usize, pli: usize, qi: usize) -> [u16; 64] {
        let ranges = &self.ranges[qti][pli];

        let mut start = 0usize;
        let mut range = 0usize;
        for (index, &size) in ranges.sizes.iter().enumerate() {
            range = index;
            if qi <= start + size as usize {
                break;
            }
            start += size as usize;
        }

        let size = ranges.sizes[range] as u32;
        let end = start as u32 + size;
        let qi = qi as u32;
        let low = &self.base_matrices[ranges.base_matrix_indices[range]];
        let high = &self.base_matrices[ranges.base_matrix_indices[range + 1]];

        let mut matrix = [0u16; 64];
        for (ci, value) in matrix.iter_mut().enumerate() {
            let base = (2 * (end - qi) * low[ci] as u32
                + 2 * (qi - start as u32) * high[ci] as u32
                + size)
                / (2 * size);

            let (scale, minimum) = match (ci, qti) {
                (0, 0) => (self.dc_scale[qi as usize], 16),
                (_, 0) => (self.ac_scale[qi as usize], 8),
                (0, _) => (self.dc_scale[qi as usize], 32),
                (_, _) => (self.ac_scale[qi as usize], 16),
            };

            *value = ((scale as u32 * base / 100) * 4).clamp(minimum, 4096) as u16;
        }

        matrix
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanNode {
    Leaf(u8),
    Branch { zero: usize, one: usize },
}

/// A token decoding tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
}

impl HuffmanTree {
    fn read(reader: &mut BsIoSliceReader, index: usize) -> Result<Self> {
        let mut tree = HuffmanTree { nodes: Vec::new() };
        let mut tokens = 0usize;
        tree.read_node(reader, index, 0, &mut tokens)?;

        Ok(tree)
    }

    fn read_node(
        &mut self,
        reader: &mut BsIoSliceReader,
        index: usize,
        depth: u32,
        tokens: &mut usize,
    ) -> Result<usize> {
        let node = self.nodes.len();

        if reader.get()? {
            if *tokens >= 32 {
                bail!(SetupError::HuffmanTreeTooManyTokens(index));
            }
            *tokens += 1;
            self.nodes.push(HuffmanNode::Leaf(reader.get_n(5)?));
            return Ok(node);
        }

        if depth >= 32 {
            bail!(SetupError::HuffmanTreeTooDeep(index));
        }

        self.nodes.push(HuffmanNode::Branch { zero: 0, one: 0 });
        let zero = self.read_node(reader, index, depth + 1, tokens)?;
        let one = self.read_node(reader, index, depth + 1, tokens)?;
        self.nodes[node] = HuffmanNode::Branch { zero, one };

        Ok(node)
    }

    pub fn token_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, HuffmanNode::Leaf(_)))
            .count()
    }

    /// Decodes one token.
    pub fn decode<R: io::Read + io::Seek>(
        &self,
        reader: &mut BitstreamIoReader<R>,
    ) -> io::Result<u8> {
        let mut node = 0;
        loop {
            match self.nodes[node] {
                HuffmanNode::Leaf(token) => return Ok(token),
                HuffmanNode::Branch { zero, one } => {
                    node = if reader.get()? { one } else { zero };
                }
            }
        }
    }
}

#[test]
fn huffman_tree_decodes_tokens() -> Result<()> {
    // Tree: 0 -> (0 -> token 3, 1 -> token 7), 1 -> token 12
    // Bits: 0 0 1 00011 1 00111 1 01100
    // Then decode "1", "01", "00": 1 0 1 0 0
    let bits = "0010001110011110110010100";
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.bytes().enumerate() {
        if bit == b'1' {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }

    let mut reader = BsIoSliceReader::from_slice(&bytes);
    let tree = HuffmanTree::read(&mut reader, 0)?;
    assert_eq!(tree.token_count(), 3);

    assert_eq!(tree.decode(&mut reader)?, 12);
    assert_eq!(tree.decode(&mut reader)?, 7);
    assert_eq!(tree.decode(&mut reader)?, 3);
    Ok(())
}
