//! Minimal Main-profile parameter sets for streams whose bitstream is not at
//! hand. CTBs are 64x64 unless asked otherwise.

use omaf_model::{HEVC_PPS_NALU_TYPE, HEVC_SPS_NALU_TYPE, HEVC_VPS_NALU_TYPE, Nalu};

use super::bits::BitWriter;
use super::{nal_header, write_main_profile_tier_level};

const LEVEL_IDC_5_1: u8 = 153;

fn wrap(nalu_type: u8, writer: BitWriter) -> Nalu {
    let rbsp = writer.finish_rbsp();
    let mut body = nal_header(nalu_type).to_vec();
    body.extend_from_slice(&super::bits::escape_rbsp(&rbsp));
    Nalu::with_start_code(&body)
}

pub fn minimal_vps() -> Nalu {
    let mut writer = BitWriter::new();
    writer.write_bits(0, 4);
    writer.write_bit(true);
    writer.write_bit(true);
    writer.write_bits(0, 6);
    writer.write_bits(0, 3);
    writer.write_bit(true);
    writer.write_bits(0xffff, 16);
    write_main_profile_tier_level(&mut writer, LEVEL_IDC_5_1);
    writer.write_bit(true);
    writer.write_ue(4);
    writer.write_ue(0);
    writer.write_ue(0);
    writer.write_bits(0, 6);
    writer.write_ue(0);
    writer.write_bit(false);
    writer.write_bit(false);
    wrap(HEVC_VPS_NALU_TYPE, writer)
}

pub fn minimal_sps(width: u32, height: u32) -> Nalu {
    minimal_sps_with_ctb_size(width, height, 64)
}

/// `ctb_size` is rounded down to a power of two in 16..=64.
pub fn minimal_sps_with_ctb_size(width: u32, height: u32, ctb_size: u32) -> Nalu {
    let log2_ctb = ctb_size.clamp(16, 64).ilog2();
    let log2_max_tb = log2_ctb.min(5);
    let mut writer = BitWriter::new();
    writer.write_bits(0, 4);
    writer.write_bits(0, 3);
    writer.write_bit(true);
    write_main_profile_tier_level(&mut writer, LEVEL_IDC_5_1);
    writer.write_ue(0);
    writer.write_ue(1);
    writer.write_ue(width);
    writer.write_ue(height);
    writer.write_bit(false);
    // bit depths
    writer.write_ue(0);
    writer.write_ue(0);
    writer.write_ue(4);
    writer.write_bit(true);
    writer.write_ue(4);
    writer.write_ue(0);
    writer.write_ue(0);
    // 8x8 min CB, 4x4 min transform
    writer.write_ue(0);
    writer.write_ue(log2_ctb - 3);
    writer.write_ue(0);
    writer.write_ue(log2_max_tb - 2);
    writer.write_ue(1);
    writer.write_ue(1);
    writer.write_bit(false);
    writer.write_bit(true);
    writer.write_bit(true);
    writer.write_bit(false);
    writer.write_ue(0);
    writer.write_bit(false);
    writer.write_bit(true);
    writer.write_bit(true);
    writer.write_bit(false);
    writer.write_bit(false);
    wrap(HEVC_SPS_NALU_TYPE, writer)
}

pub fn minimal_pps() -> Nalu {
    let mut writer = BitWriter::new();
    writer.write_ue(0);
    writer.write_ue(0);
    writer.write_bits(0, 7);
    writer.write_ue(0);
    writer.write_ue(0);
    writer.write_se(0);
    writer.write_bits(0, 2);
    writer.write_bit(false);
    writer.write_se(0);
    writer.write_se(0);
    writer.write_bits(0, 4);
    // tiles, entropy sync
    writer.write_bit(false);
    writer.write_bit(false);
    writer.write_bit(true);
    writer.write_bit(false);
    writer.write_bit(false);
    writer.write_bit(false);
    writer.write_ue(0);
    writer.write_bit(false);
    writer.write_bit(false);
    wrap(HEVC_PPS_NALU_TYPE, writer)
}
