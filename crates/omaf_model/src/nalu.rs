use serde::{Deserialize, Serialize};

pub const HEVC_STARTCODES_LEN: u8 = 4;
pub const HEVC_VPS_NALU_TYPE: u8 = 32;
pub const HEVC_SPS_NALU_TYPE: u8 = 33;
pub const HEVC_PPS_NALU_TYPE: u8 = 34;
pub const HEVC_SEI_PREFIX_NALU_TYPE: u8 = 39;

const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// One Annex-B NAL unit. `data` includes the start code, the two byte NAL
/// header and the escaped RBSP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nalu {
    pub data: Vec<u8>,
    pub start_codes_size: u8,
    pub nalu_type: u8,
}

impl Nalu {
    /// Wraps a NAL body (header + escaped payload) behind a four byte start code.
    pub fn with_start_code(body: &[u8]) -> Self {
        let nalu_type = body.first().map_or(0, |header| (header >> 1) & 0x3f);
        let mut data = Vec::with_capacity(START_CODE.len() + body.len());
        data.extend_from_slice(&START_CODE);
        data.extend_from_slice(body);
        Self {
            data,
            start_codes_size: HEVC_STARTCODES_LEN,
            nalu_type,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// NAL header plus escaped payload, start code stripped.
    pub fn body(&self) -> &[u8] {
        self.data
            .get(self.start_codes_size as usize..)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_start_code_reads_type_from_header() {
        let nalu = Nalu::with_start_code(&[HEVC_SPS_NALU_TYPE << 1, 0x01, 0xaa]);
        assert_eq!(nalu.nalu_type, HEVC_SPS_NALU_TYPE);
        assert_eq!(nalu.start_codes_size, HEVC_STARTCODES_LEN);
        assert_eq!(nalu.body(), &[0x42, 0x01, 0xaa]);
        assert_eq!(nalu.len(), 7);
    }

    #[test]
    fn body_of_truncated_nalu_is_empty() {
        let nalu = Nalu {
            data: vec![0, 0],
            start_codes_size: HEVC_STARTCODES_LEN,
            nalu_type: 0,
        };
        assert!(nalu.body().is_empty());
    }
}
