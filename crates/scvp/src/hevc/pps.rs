use std::ops::Range;

use omaf_model::{HEVC_PPS_NALU_TYPE, Nalu, TileArrangement};

use super::bits::{BitReader, BitWriter, trailing_stop_bit_position};
use super::{BitstreamError, assemble_annex_b, split_nalu};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpsTiles {
    pub columns: u32,
    pub rows: u32,
    pub uniform_spacing: bool,
    /// Explicit widths in CTUs, all but the last column.
    pub column_widths: Vec<u32>,
    /// Explicit heights in CTUs, all but the last row.
    pub row_heights: Vec<u32>,
    pub loop_filter_across_tiles: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PpsInfo {
    pub pps_id: u32,
    pub sps_id: u32,
    pub entropy_coding_sync: bool,
    pub tiles: Option<PpsTiles>,
    /// Bits from `tiles_enabled_flag` through the end of the tile section.
    tile_bits: Range<usize>,
    stop_bit: usize,
}

fn parse_rbsp(rbsp: &[u8]) -> Result<PpsInfo, BitstreamError> {
    let stop_bit = trailing_stop_bit_position(rbsp).ok_or(BitstreamError::MissingStopBit)?;
    let mut reader = BitReader::new(rbsp);
    let pps_id = reader.read_ue()?;
    let sps_id = reader.read_ue()?;
    // dependent slices, output flag, extra slice header bits, sign hiding, cabac init
    reader.skip_bits(7)?;
    let _num_ref_idx_l0_default_active_minus1 = reader.read_ue()?;
    let _num_ref_idx_l1_default_active_minus1 = reader.read_ue()?;
    let _init_qp_minus26 = reader.read_se()?;
    // constrained intra pred, transform skip
    reader.skip_bits(2)?;
    if reader.read_bit()? {
        let _diff_cu_qp_delta_depth = reader.read_ue()?;
    }
    let _cb_qp_offset = reader.read_se()?;
    let _cr_qp_offset = reader.read_se()?;
    // slice chroma qp offsets, weighted pred, weighted bipred, transquant bypass
    reader.skip_bits(4)?;

    let tile_start = reader.position();
    let tiles_enabled = reader.read_bit()?;
    let entropy_coding_sync = reader.read_bit()?;
    let tiles = if tiles_enabled {
        let columns = reader.read_ue()? + 1;
        let rows = reader.read_ue()? + 1;
        let uniform_spacing = reader.read_bit()?;
        let mut column_widths = Vec::new();
        let mut row_heights = Vec::new();
        if !uniform_spacing {
            for _ in 1..columns {
                column_widths.push(reader.read_ue()? + 1);
            }
            for _ in 1..rows {
                row_heights.push(reader.read_ue()? + 1);
            }
        }
        let loop_filter_across_tiles = reader.read_bit()?;
        Some(PpsTiles {
            columns,
            rows,
            uniform_spacing,
            column_widths,
            row_heights,
            loop_filter_across_tiles,
        })
    } else {
        None
    };
    let tile_end = reader.position();
    if tile_end > stop_bit {
        return Err(BitstreamError::UnexpectedEnd);
    }
    Ok(PpsInfo {
        pps_id,
        sps_id,
        entropy_coding_sync,
        tiles,
        tile_bits: tile_start..tile_end,
        stop_bit,
    })
}

pub fn parse_pps(pps: &Nalu) -> Result<PpsInfo, BitstreamError> {
    let (_, rbsp) = split_nalu(pps, HEVC_PPS_NALU_TYPE)?;
    parse_rbsp(&rbsp)
}

fn write_tile_section(
    writer: &mut BitWriter,
    arrangement: &TileArrangement,
    entropy_coding_sync: bool,
) -> Result<(), BitstreamError> {
    let columns = arrangement.tile_cols_num();
    let rows = arrangement.tile_rows_num();
    if columns == 0 || rows == 0 {
        return Err(BitstreamError::ValueOutOfRange {
            field: "num_tile_columns_minus1",
            value: 0,
        });
    }
    if let Some(zero) = arrangement
        .column_widths
        .iter()
        .chain(arrangement.row_heights.iter())
        .find(|size| **size == 0)
    {
        return Err(BitstreamError::ValueOutOfRange {
            field: "column_width_minus1",
            value: *zero as u64,
        });
    }
    writer.write_bit(true);
    writer.write_bit(entropy_coding_sync);
    writer.write_ue(columns as u32 - 1);
    writer.write_ue(rows as u32 - 1);
    writer.write_bit(false);
    for width in &arrangement.column_widths[..columns - 1] {
        writer.write_ue(*width as u32 - 1);
    }
    for height in &arrangement.row_heights[..rows - 1] {
        writer.write_ue(*height as u32 - 1);
    }
    writer.write_bit(false);
    Ok(())
}

/// Rewrites the tile section of a PPS with an explicit, non-uniform grid.
/// Tiles are forced on and in-loop filtering across tile edges is disabled.
pub fn rewrite_pps(pps: &Nalu, arrangement: &TileArrangement) -> Result<Vec<u8>, BitstreamError> {
    let (header, rbsp) = split_nalu(pps, HEVC_PPS_NALU_TYPE)?;
    let info = parse_rbsp(&rbsp)?;
    let reader = BitReader::new(&rbsp);

    let mut writer = BitWriter::new();
    writer.extend_from_bits(reader.slice(0, info.tile_bits.start)?);
    write_tile_section(&mut writer, arrangement, info.entropy_coding_sync)?;
    writer.extend_from_bits(reader.slice(info.tile_bits.end, info.stop_bit)?);
    Ok(assemble_annex_b(header, &writer.finish_rbsp()))
}
