//! Bit-level RBSP access with Exp-Golomb coding and emulation prevention.

use bitvec::prelude::{BitSlice, BitVec, Msb0};
use bitvec::view::BitView;

use super::BitstreamError;

pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(rbsp: &'a [u8]) -> Self {
        Self {
            bits: rbsp.view_bits::<Msb0>(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bits.len().saturating_sub(self.position)
    }

    pub fn read_bit(&mut self) -> Result<bool, BitstreamError> {
        let bit = *self
            .bits
            .get(self.position)
            .ok_or(BitstreamError::UnexpectedEnd)?;
        self.position += 1;
        Ok(bit)
    }

    pub fn read_bits(&mut self, count: u32) -> Result<u64, BitstreamError> {
        debug_assert!(count <= 64, "read_bits supports at most 64 bits");
        if self.remaining() < count as usize {
            return Err(BitstreamError::UnexpectedEnd);
        }
        let mut value = 0u64;
        for _ in 0..count {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    pub fn skip_bits(&mut self, count: usize) -> Result<(), BitstreamError> {
        if self.remaining() < count {
            return Err(BitstreamError::UnexpectedEnd);
        }
        self.position += count;
        Ok(())
    }

    pub fn read_ue(&mut self) -> Result<u32, BitstreamError> {
        let mut leading_zeros = 0u32;
        while !self.read_bit()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(BitstreamError::ExpGolombOverflow);
            }
        }
        let suffix = self.read_bits(leading_zeros)?;
        let value = (1u64 << leading_zeros) - 1 + suffix;
        u32::try_from(value).map_err(|_| BitstreamError::ExpGolombOverflow)
    }

    pub fn read_se(&mut self) -> Result<i32, BitstreamError> {
        let code = self.read_ue()? as i64;
        let value = if code % 2 == 1 { (code + 1) / 2 } else { -(code / 2) };
        Ok(value as i32)
    }

    pub fn slice(&self, start: usize, end: usize) -> Result<&'a BitSlice<u8, Msb0>, BitstreamError> {
        self.bits.get(start..end).ok_or(BitstreamError::UnexpectedEnd)
    }
}

#[derive(Debug, Default)]
pub struct BitWriter {
    bits: BitVec<u8, Msb0>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    pub fn write_bits(&mut self, value: u64, count: u32) {
        for shift in (0..count).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
    }

    pub fn write_ue(&mut self, value: u32) {
        let code = value as u64 + 1;
        let length = 64 - code.leading_zeros();
        self.write_bits(0, length - 1);
        self.write_bits(code, length);
    }

    pub fn write_se(&mut self, value: i32) {
        let code = if value > 0 {
            (value as i64) * 2 - 1
        } else {
            -(value as i64) * 2
        };
        self.write_ue(code as u32);
    }

    pub fn extend_from_bits(&mut self, bits: &BitSlice<u8, Msb0>) {
        self.bits.extend_from_bitslice(bits);
    }

    /// Appends the RBSP stop bit and zero alignment, returning the bytes.
    pub fn finish_rbsp(mut self) -> Vec<u8> {
        self.bits.push(true);
        while self.bits.len() % 8 != 0 {
            self.bits.push(false);
        }
        self.bits.into_vec()
    }

    /// Pads with zero bits to the next byte boundary, returning the bytes.
    pub fn into_aligned_bytes(mut self) -> Vec<u8> {
        while self.bits.len() % 8 != 0 {
            self.bits.push(false);
        }
        self.bits.into_vec()
    }
}

/// Bit index of the RBSP stop bit, the last set bit of the payload.
pub fn trailing_stop_bit_position(rbsp: &[u8]) -> Option<usize> {
    rbsp.view_bits::<Msb0>().last_one()
}

/// Removes emulation prevention bytes (`00 00 03` -> `00 00`).
pub fn unescape_rbsp(payload: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(payload.len());
    let mut zeros = 0usize;
    for byte in payload.iter().copied() {
        if zeros >= 2 && byte == 0x03 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }
    rbsp
}

/// Inserts emulation prevention bytes before any `00 00 0x` with `x <= 3`.
pub fn escape_rbsp(rbsp: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(rbsp.len() + rbsp.len() / 64 + 1);
    let mut zeros = 0usize;
    for byte in rbsp.iter().copied() {
        if zeros >= 2 && byte <= 0x03 {
            payload.push(0x03);
            zeros = 0;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        payload.push(byte);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exp_golomb_values_read_back() {
        let mut writer = BitWriter::new();
        for value in [0u32, 1, 2, 7, 255, 65_535, u32::MAX - 1] {
            writer.write_ue(value);
        }
        for value in [0i32, 1, -1, 26, -26, i16::MAX as i32] {
            writer.write_se(value);
        }
        let bytes = writer.finish_rbsp();
        let mut reader = BitReader::new(&bytes);
        for value in [0u32, 1, 2, 7, 255, 65_535, u32::MAX - 1] {
            assert_eq!(reader.read_ue(), Ok(value));
        }
        for value in [0i32, 1, -1, 26, -26, i16::MAX as i32] {
            assert_eq!(reader.read_se(), Ok(value));
        }
    }

    #[test]
    fn ue_zero_is_a_single_set_bit() {
        let mut writer = BitWriter::new();
        writer.write_ue(0);
        assert_eq!(writer.into_aligned_bytes(), vec![0x80]);
    }

    #[test]
    fn reading_past_the_end_fails() {
        let mut reader = BitReader::new(&[0x00]);
        assert_eq!(reader.read_ue(), Err(BitstreamError::UnexpectedEnd));
    }

    #[test]
    fn stop_bit_is_last_set_bit() {
        assert_eq!(trailing_stop_bit_position(&[0xa0, 0x80]), Some(8));
        assert_eq!(trailing_stop_bit_position(&[0x00]), None);
    }

    #[test]
    fn emulation_prevention_is_inserted_and_removed() {
        let rbsp = [0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x03, 0x80];
        let escaped = escape_rbsp(&rbsp);
        assert_eq!(
            escaped,
            vec![0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03, 0x03, 0x80]
        );
        assert_eq!(unescape_rbsp(&escaped), rbsp.to_vec());
    }
}
