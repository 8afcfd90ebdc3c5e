//! Region-wise packing and projection SEI messages.
//!
//! Multi-byte fields are big-endian. The RWPK payload keeps the field order of
//! the OMAF region-wise packing SEI with fixed-width rectangles.

use omaf_model::{
    HEVC_SEI_PREFIX_NALU_TYPE, Nalu, PixelRect, ProjectionFormat, RectRegionPacking,
    RegionWisePacking, ResolutionTier,
};

use crate::hevc::{BitstreamError, nal_header, split_nalu};
use crate::hevc::bits::escape_rbsp;

pub const RWPK_PAYLOAD_TYPE: u32 = 155;
pub const ERP_PAYLOAD_TYPE: u32 = 150;
pub const CUBEMAP_PAYLOAD_TYPE: u32 = 151;

const MAX_PACKED_REGIONS: usize = u8::MAX as usize;
const RBSP_TRAILING_BITS: u8 = 0x80;
const REGION_BYTES: usize = 1 + 4 * 4 + 2 * 4;

fn tier_bits(tier: Option<ResolutionTier>) -> u8 {
    match tier {
        None => 0,
        Some(ResolutionTier::High) => 1,
        Some(ResolutionTier::Low) => 2,
    }
}

fn tier_from_bits(bits: u8) -> Option<ResolutionTier> {
    match bits {
        1 => Some(ResolutionTier::High),
        2 => Some(ResolutionTier::Low),
        _ => None,
    }
}

fn u16_field(field: &'static str, value: u32) -> Result<[u8; 2], BitstreamError> {
    u16::try_from(value)
        .map(u16::to_be_bytes)
        .map_err(|_| BitstreamError::ValueOutOfRange {
            field,
            value: value as u64,
        })
}

fn write_sei_varint(out: &mut Vec<u8>, mut value: u32) {
    while value >= 0xff {
        out.push(0xff);
        value -= 0xff;
    }
    out.push(value as u8);
}

fn sei_nalu(payload_type: u32, payload: &[u8]) -> Nalu {
    let mut rbsp = Vec::with_capacity(payload.len() + 4);
    write_sei_varint(&mut rbsp, payload_type);
    write_sei_varint(&mut rbsp, payload.len() as u32);
    rbsp.extend_from_slice(payload);
    rbsp.push(RBSP_TRAILING_BITS);

    let mut body = nal_header(HEVC_SEI_PREFIX_NALU_TYPE).to_vec();
    body.extend_from_slice(&escape_rbsp(&rbsp));
    Nalu::with_start_code(&body)
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], BitstreamError> {
        let end = self.position + N;
        let chunk = self
            .bytes
            .get(self.position..end)
            .ok_or(BitstreamError::UnexpectedEnd)?;
        self.position = end;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, BitstreamError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u32, BitstreamError> {
        Ok(u16::from_be_bytes(self.take()?) as u32)
    }

    fn u32(&mut self) -> Result<u32, BitstreamError> {
        Ok(u32::from_be_bytes(self.take()?))
    }

    fn sei_varint(&mut self) -> Result<u32, BitstreamError> {
        let mut value = 0u32;
        loop {
            let byte = self.u8()?;
            value = value.saturating_add(byte as u32);
            if byte != 0xff {
                return Ok(value);
            }
        }
    }

    fn bytes(&mut self, count: usize) -> Result<&'a [u8], BitstreamError> {
        let end = self.position + count;
        let chunk = self
            .bytes
            .get(self.position..end)
            .ok_or(BitstreamError::UnexpectedEnd)?;
        self.position = end;
        Ok(chunk)
    }
}

/// Returns the payload of the first SEI message, checking its type.
fn sei_payload(nalu: &Nalu, expected_type: u32) -> Result<Vec<u8>, BitstreamError> {
    let (_, rbsp) = split_nalu(nalu, HEVC_SEI_PREFIX_NALU_TYPE)?;
    let mut cursor = ByteCursor::new(&rbsp);
    let found = cursor.sei_varint()?;
    if found != expected_type {
        return Err(BitstreamError::WrongPayloadType {
            expected: expected_type,
            found,
        });
    }
    let size = cursor.sei_varint()? as usize;
    Ok(cursor.bytes(size)?.to_vec())
}

pub fn encode_rwpk_sei(rwpk: &RegionWisePacking) -> Result<Nalu, BitstreamError> {
    let num_regions = rwpk.num_regions();
    if num_regions > MAX_PACKED_REGIONS {
        return Err(BitstreamError::ValueOutOfRange {
            field: "num_packed_regions",
            value: num_regions as u64,
        });
    }
    let mut payload = Vec::with_capacity(14 + num_regions * REGION_BYTES);
    // cancel 0, persistence 1
    payload.push((1 << 6) | ((rwpk.constituent_pic_matching as u8) << 5));
    payload.push(num_regions as u8);
    payload.extend_from_slice(&rwpk.proj_pic_width.to_be_bytes());
    payload.extend_from_slice(&rwpk.proj_pic_height.to_be_bytes());
    payload.extend_from_slice(&u16_field("packed_picture_width", rwpk.packed_pic_width)?);
    payload.extend_from_slice(&u16_field("packed_picture_height", rwpk.packed_pic_height)?);

    for region in &rwpk.regions {
        payload.push((tier_bits(region.tier) << 6) | ((region.transform_type & 0x07) << 1));
        let proj = region.proj;
        for value in [proj.width, proj.height, proj.top, proj.left] {
            payload.extend_from_slice(&value.to_be_bytes());
        }
        let packed = region.packed;
        payload.extend_from_slice(&u16_field("packed_reg_width", packed.width)?);
        payload.extend_from_slice(&u16_field("packed_reg_height", packed.height)?);
        payload.extend_from_slice(&u16_field("packed_reg_top", packed.top)?);
        payload.extend_from_slice(&u16_field("packed_reg_left", packed.left)?);
    }
    Ok(sei_nalu(RWPK_PAYLOAD_TYPE, &payload))
}

pub fn parse_rwpk_sei(nalu: &Nalu) -> Result<RegionWisePacking, BitstreamError> {
    let payload = sei_payload(nalu, RWPK_PAYLOAD_TYPE)?;
    let mut cursor = ByteCursor::new(&payload);
    let flags = cursor.u8()?;
    let constituent_pic_matching = flags & (1 << 5) != 0;
    let num_regions = cursor.u8()? as usize;
    let proj_pic_width = cursor.u32()?;
    let proj_pic_height = cursor.u32()?;
    let packed_pic_width = cursor.u16()?;
    let packed_pic_height = cursor.u16()?;

    let mut regions = Vec::with_capacity(num_regions);
    for _ in 0..num_regions {
        let region_flags = cursor.u8()?;
        let width = cursor.u32()?;
        let height = cursor.u32()?;
        let top = cursor.u32()?;
        let left = cursor.u32()?;
        let packed_width = cursor.u16()?;
        let packed_height = cursor.u16()?;
        let packed_top = cursor.u16()?;
        let packed_left = cursor.u16()?;
        regions.push(RectRegionPacking {
            proj: PixelRect::new(left, top, width, height),
            packed: PixelRect::new(packed_left, packed_top, packed_width, packed_height),
            transform_type: (region_flags >> 1) & 0x07,
            tier: tier_from_bits(region_flags >> 6),
        });
    }
    Ok(RegionWisePacking {
        constituent_pic_matching,
        proj_pic_width,
        proj_pic_height,
        packed_pic_width,
        packed_pic_height,
        regions,
    })
}

pub fn encode_projection_sei(projection: ProjectionFormat) -> Result<Nalu, BitstreamError> {
    // cancel 0, persistence 1, then padding or face flags
    match projection {
        ProjectionFormat::Equirectangular => Ok(sei_nalu(ERP_PAYLOAD_TYPE, &[0x44])),
        ProjectionFormat::Cubemap => Ok(sei_nalu(CUBEMAP_PAYLOAD_TYPE, &[0x40])),
        ProjectionFormat::Planar => Err(BitstreamError::Unsupported(
            "planar video has no projection sei",
        )),
    }
}
