use std::ops::Range;

use omaf_model::{HEVC_SPS_NALU_TYPE, Nalu, PicResolution};

use super::bits::{BitReader, BitWriter, trailing_stop_bit_position};
use super::{BitstreamError, assemble_annex_b, skip_profile_tier_level, split_nalu};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpsInfo {
    pub vps_id: u8,
    pub max_sub_layers_minus1: u8,
    pub sps_id: u32,
    pub chroma_format_idc: u32,
    pub width: u32,
    pub height: u32,
    /// Left, right, top, bottom offsets in chroma units.
    pub conformance_window: Option<[u32; 4]>,
    /// Luma coding tree block edge in pixels.
    pub ctb_size: u32,
    /// Bits from `pic_width_in_luma_samples` through the conformance window.
    size_bits: Range<usize>,
    stop_bit: usize,
}

impl SpsInfo {
    pub fn resolution(&self) -> PicResolution {
        PicResolution::new(self.width, self.height)
    }
}

const MIN_LOG2_CTB_SIZE: u64 = 4;
const MAX_LOG2_CTB_SIZE: u64 = 6;

fn parse_rbsp(rbsp: &[u8]) -> Result<SpsInfo, BitstreamError> {
    let stop_bit = trailing_stop_bit_position(rbsp).ok_or(BitstreamError::MissingStopBit)?;
    let mut reader = BitReader::new(rbsp);
    let vps_id = reader.read_bits(4)? as u8;
    let max_sub_layers_minus1 = reader.read_bits(3)? as u8;
    let _temporal_id_nesting = reader.read_bit()?;
    skip_profile_tier_level(&mut reader, max_sub_layers_minus1)?;
    let sps_id = reader.read_ue()?;
    let chroma_format_idc = reader.read_ue()?;
    if chroma_format_idc == 3 {
        let _separate_colour_plane = reader.read_bit()?;
    }
    let size_start = reader.position();
    let width = reader.read_ue()?;
    let height = reader.read_ue()?;
    let conformance_window = if reader.read_bit()? {
        Some([
            reader.read_ue()?,
            reader.read_ue()?,
            reader.read_ue()?,
            reader.read_ue()?,
        ])
    } else {
        None
    };
    let size_end = reader.position();
    let ctb_size = read_ctb_size(&mut reader, max_sub_layers_minus1)?;
    if reader.position() > stop_bit {
        return Err(BitstreamError::UnexpectedEnd);
    }
    Ok(SpsInfo {
        vps_id,
        max_sub_layers_minus1,
        sps_id,
        chroma_format_idc,
        width,
        height,
        conformance_window,
        ctb_size,
        size_bits: size_start..size_end,
        stop_bit,
    })
}

/// Reads from the bit depths through
/// `log2_diff_max_min_luma_coding_block_size`.
fn read_ctb_size(reader: &mut BitReader, max_sub_layers_minus1: u8) -> Result<u32, BitstreamError> {
    let _bit_depth_luma_minus8 = reader.read_ue()?;
    let _bit_depth_chroma_minus8 = reader.read_ue()?;
    let _log2_max_pic_order_cnt_lsb_minus4 = reader.read_ue()?;
    let ordering_info_for_all = reader.read_bit()?;
    let first = if ordering_info_for_all {
        0
    } else {
        max_sub_layers_minus1
    };
    for _ in first..=max_sub_layers_minus1 {
        let _max_dec_pic_buffering_minus1 = reader.read_ue()?;
        let _max_num_reorder_pics = reader.read_ue()?;
        let _max_latency_increase_plus1 = reader.read_ue()?;
    }
    let log2_min_cb = reader.read_ue()? as u64 + 3;
    let log2_ctb = log2_min_cb + reader.read_ue()? as u64;
    if !(MIN_LOG2_CTB_SIZE..=MAX_LOG2_CTB_SIZE).contains(&log2_ctb) {
        return Err(BitstreamError::ValueOutOfRange {
            field: "log2_diff_max_min_luma_coding_block_size",
            value: log2_ctb,
        });
    }
    Ok(1 << log2_ctb)
}

pub fn parse_sps(sps: &Nalu) -> Result<SpsInfo, BitstreamError> {
    let (_, rbsp) = split_nalu(sps, HEVC_SPS_NALU_TYPE)?;
    parse_rbsp(&rbsp)
}

/// Rewrites the coded picture size of an SPS and drops its conformance
/// window. Every other syntax element is carried over bit for bit.
pub fn rewrite_sps(sps: &Nalu, width: u32, height: u32) -> Result<Vec<u8>, BitstreamError> {
    if width == 0 || height == 0 {
        return Err(BitstreamError::ValueOutOfRange {
            field: "pic_width_in_luma_samples",
            value: 0,
        });
    }
    let (header, rbsp) = split_nalu(sps, HEVC_SPS_NALU_TYPE)?;
    let info = parse_rbsp(&rbsp)?;
    let reader = BitReader::new(&rbsp);

    let mut writer = BitWriter::new();
    writer.extend_from_bits(reader.slice(0, info.size_bits.start)?);
    writer.write_ue(width);
    writer.write_ue(height);
    writer.write_bit(false);
    writer.extend_from_bits(reader.slice(info.size_bits.end, info.stop_bit)?);
    Ok(assemble_annex_b(header, &writer.finish_rbsp()))
}
