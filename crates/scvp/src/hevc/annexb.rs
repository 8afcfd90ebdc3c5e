use omaf_model::{HEVC_PPS_NALU_TYPE, HEVC_SPS_NALU_TYPE, HEVC_VPS_NALU_TYPE, Nalu};

use super::nalu_type_of;

/// Splits an Annex-B byte stream on its start codes. Each returned unit keeps
/// its own start code, three or four bytes long.
pub fn split_annex_b(stream: &[u8]) -> Vec<Nalu> {
    let mut starts = Vec::new();
    let mut index = 0;
    while index + 3 <= stream.len() {
        if stream[index] == 0 && stream[index + 1] == 0 && stream[index + 2] == 1 {
            let start = if index > 0 && stream[index - 1] == 0 {
                index - 1
            } else {
                index
            };
            starts.push((start, index + 3));
            index += 3;
        } else {
            index += 1;
        }
    }

    let mut units = Vec::with_capacity(starts.len());
    for (position, (start, payload)) in starts.iter().copied().enumerate() {
        let end = starts
            .get(position + 1)
            .map_or(stream.len(), |(next_start, _)| *next_start);
        if payload >= end {
            continue;
        }
        units.push(Nalu {
            data: stream[start..end].to_vec(),
            start_codes_size: (payload - start) as u8,
            nalu_type: nalu_type_of(stream[payload]),
        });
    }
    units
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSets {
    pub vps: Option<Nalu>,
    pub sps: Option<Nalu>,
    pub pps: Option<Nalu>,
}

/// First VPS, SPS and PPS of a stream.
pub fn find_parameter_sets(stream: &[u8]) -> ParameterSets {
    let mut sets = ParameterSets::default();
    for unit in split_annex_b(stream) {
        let slot = match unit.nalu_type {
            HEVC_VPS_NALU_TYPE => &mut sets.vps,
            HEVC_SPS_NALU_TYPE => &mut sets.sps,
            HEVC_PPS_NALU_TYPE => &mut sets.pps,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(unit);
        }
    }
    sets
}
