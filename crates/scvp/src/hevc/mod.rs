//! HEVC parameter set parsing and rewriting for merged tile pictures.

use omaf_model::{HEVC_STARTCODES_LEN, Nalu};
use thiserror::Error;

pub mod annexb;
pub mod bits;
pub mod pps;
pub mod sps;
pub mod synth;

pub use annexb::{ParameterSets, find_parameter_sets, split_annex_b};
pub use pps::{PpsInfo, PpsTiles, parse_pps, rewrite_pps};
pub use sps::{SpsInfo, parse_sps, rewrite_sps};
pub use synth::{minimal_pps, minimal_sps, minimal_sps_with_ctb_size, minimal_vps};

const NAL_HEADER_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitstreamError {
    #[error("bitstream ended unexpectedly")]
    UnexpectedEnd,
    #[error("exp-golomb code does not fit in 32 bits")]
    ExpGolombOverflow,
    #[error("expected nal unit type {expected}, found {found}")]
    WrongNaluType { expected: u8, found: u8 },
    #[error("rbsp has no stop bit")]
    MissingStopBit,
    #[error("unsupported syntax: {0}")]
    Unsupported(&'static str),
    #[error("value {value} does not fit in the {field} field")]
    ValueOutOfRange { field: &'static str, value: u64 },
    #[error("sei payload type {found} is not the expected {expected}")]
    WrongPayloadType { expected: u32, found: u32 },
    #[error("no start code found")]
    MissingStartCode,
}

pub(crate) fn nalu_type_of(header: u8) -> u8 {
    (header >> 1) & 0x3f
}

/// Splits a NAL unit into its two header bytes and unescaped RBSP.
pub(crate) fn split_nalu(
    nalu: &Nalu,
    expected_type: u8,
) -> Result<([u8; NAL_HEADER_LEN], Vec<u8>), BitstreamError> {
    let body = nalu.body();
    if body.len() < NAL_HEADER_LEN {
        return Err(BitstreamError::UnexpectedEnd);
    }
    let found = nalu_type_of(body[0]);
    if found != expected_type {
        return Err(BitstreamError::WrongNaluType {
            expected: expected_type,
            found,
        });
    }
    let header = [body[0], body[1]];
    Ok((header, bits::unescape_rbsp(&body[NAL_HEADER_LEN..])))
}

/// Start code, header and escaped RBSP as one Annex-B buffer.
pub(crate) fn assemble_annex_b(header: [u8; NAL_HEADER_LEN], rbsp: &[u8]) -> Vec<u8> {
    let escaped = bits::escape_rbsp(rbsp);
    let mut data = Vec::with_capacity(HEVC_STARTCODES_LEN as usize + NAL_HEADER_LEN + escaped.len());
    data.extend_from_slice(&[0, 0, 0, 1]);
    data.extend_from_slice(&header);
    data.extend_from_slice(&escaped);
    data
}

pub(crate) fn nal_header(nalu_type: u8) -> [u8; NAL_HEADER_LEN] {
    // nuh_layer_id 0, nuh_temporal_id_plus1 1
    [nalu_type << 1, 0x01]
}

/// Wraps an Annex-B buffer produced by the rewriters as a [`Nalu`].
pub fn nalu_from_annex_b(data: Vec<u8>) -> Result<Nalu, BitstreamError> {
    let start_codes_size = if data.starts_with(&[0, 0, 0, 1]) {
        4
    } else if data.starts_with(&[0, 0, 1]) {
        3
    } else {
        return Err(BitstreamError::MissingStartCode);
    };
    let header = *data
        .get(start_codes_size)
        .ok_or(BitstreamError::UnexpectedEnd)?;
    Ok(Nalu {
        nalu_type: nalu_type_of(header),
        start_codes_size: start_codes_size as u8,
        data,
    })
}

/// Steps over a `profile_tier_level(1, max_sub_layers_minus1)` structure.
pub(crate) fn skip_profile_tier_level(
    reader: &mut bits::BitReader<'_>,
    max_sub_layers_minus1: u8,
) -> Result<(), BitstreamError> {
    const PROFILE_BITS: usize = 88;
    const LEVEL_BITS: usize = 8;
    if max_sub_layers_minus1 > 6 {
        return Err(BitstreamError::Unsupported("sps_max_sub_layers_minus1 above 6"));
    }
    reader.skip_bits(PROFILE_BITS + LEVEL_BITS)?;
    let sub_layers = max_sub_layers_minus1 as usize;
    let mut profile_present = [false; 8];
    let mut level_present = [false; 8];
    for layer in 0..sub_layers {
        profile_present[layer] = reader.read_bit()?;
        level_present[layer] = reader.read_bit()?;
    }
    if sub_layers > 0 {
        reader.skip_bits(2 * (8 - sub_layers))?;
    }
    for layer in 0..sub_layers {
        if profile_present[layer] {
            reader.skip_bits(PROFILE_BITS)?;
        }
        if level_present[layer] {
            reader.skip_bits(LEVEL_BITS)?;
        }
    }
    Ok(())
}

/// Main profile, main tier, no sub-layers.
pub(crate) fn write_main_profile_tier_level(writer: &mut bits::BitWriter, level_idc: u8) {
    writer.write_bits(0, 2);
    writer.write_bit(false);
    writer.write_bits(1, 5);
    writer.write_bits(0x6000_0000, 32);
    writer.write_bit(true);
    writer.write_bit(false);
    writer.write_bit(false);
    writer.write_bit(true);
    writer.write_bits(0, 43);
    writer.write_bit(false);
    writer.write_bits(level_idc as u64, 8);
}
