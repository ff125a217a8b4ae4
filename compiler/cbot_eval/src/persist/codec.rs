//! LEB128 primitives of the state format.
//!
//! Unsigned integers are LEB128; signed ones are zigzag-mapped first.
//! Floats are their raw little-endian bits. Strings are a length followed
//! by UTF-8 bytes.

use crate::errors::{StateError, StateResult};

/// Longest LEB128 encoding of a `u64`.
const MAX_VARINT_BYTES: usize = 10;

#[inline]
pub(crate) fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub(crate) fn unzigzag(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

#[derive(Default)]
pub(crate) struct Encoder {
    out: Vec<u8>,
}

impl Encoder {
    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    #[inline]
    pub(crate) fn u8(&mut self, value: u8) {
        self.out.push(value);
    }

    pub(crate) fn uvar(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.out.push(byte);
                return;
            }
            self.out.push(byte | 0x80);
        }
    }

    #[inline]
    pub(crate) fn svar(&mut self, value: i64) {
        self.uvar(zigzag(value));
    }

    #[inline]
    pub(crate) fn usize(&mut self, value: usize) {
        self.uvar(value as u64);
    }

    pub(crate) fn bool(&mut self, value: bool) {
        self.u8(u8::from(value));
    }

    pub(crate) fn f32(&mut self, value: f32) {
        self.out.extend_from_slice(&value.to_bits().to_le_bytes());
    }

    pub(crate) fn f64(&mut self, value: f64) {
        self.out.extend_from_slice(&value.to_bits().to_le_bytes());
    }

    pub(crate) fn str(&mut self, value: &str) {
        self.usize(value.len());
        self.out.extend_from_slice(value.as_bytes());
    }

    pub(crate) fn opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.u8(1);
                self.str(s);
            }
            None => self.u8(0),
        }
    }
}

pub(crate) struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Decoder { bytes, pos: 0 }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn read_exact(&mut self, len: usize) -> StateResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(StateError::Corrupt("unexpected end of data"))?;
        let out = self
            .bytes
            .get(self.pos..end)
            .ok_or(StateError::Corrupt("unexpected end of data"))?;
        self.pos = end;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> StateResult<u8> {
        let byte = self
            .bytes
            .get(self.pos)
            .copied()
            .ok_or(StateError::Corrupt("unexpected end of data"))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn uvar(&mut self) -> StateResult<u64> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.u8()?;
            let bits = u64::from(byte & 0x7f);
            if i == MAX_VARINT_BYTES - 1 && bits > 1 {
                return Err(StateError::Corrupt("varint overflow"));
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(StateError::Corrupt("varint too long"))
    }

    pub(crate) fn svar(&mut self) -> StateResult<i64> {
        self.uvar().map(unzigzag)
    }

    pub(crate) fn usize(&mut self) -> StateResult<usize> {
        usize::try_from(self.uvar()?).map_err(|_| StateError::Corrupt("length out of range"))
    }

    pub(crate) fn i32(&mut self) -> StateResult<i32> {
        i32::try_from(self.svar()?).map_err(|_| StateError::Corrupt("integer out of range"))
    }

    /// A count of records, each at least one byte long.
    pub(crate) fn count(&mut self) -> StateResult<usize> {
        let count = self.usize()?;
        if count > self.bytes.len().saturating_sub(self.pos) {
            return Err(StateError::Corrupt("count exceeds remaining data"));
        }
        Ok(count)
    }

    pub(crate) fn bool(&mut self) -> StateResult<bool> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(StateError::Corrupt("bad flag byte")),
        }
    }

    pub(crate) fn f32(&mut self) -> StateResult<f32> {
        let raw = self.read_exact(4)?;
        let raw: [u8; 4] = raw.try_into().map_err(|_| StateError::Corrupt("float"))?;
        Ok(f32::from_bits(u32::from_le_bytes(raw)))
    }

    pub(crate) fn f64(&mut self) -> StateResult<f64> {
        let raw = self.read_exact(8)?;
        let raw: [u8; 8] = raw.try_into().map_err(|_| StateError::Corrupt("double"))?;
        Ok(f64::from_bits(u64::from_le_bytes(raw)))
    }

    pub(crate) fn str(&mut self) -> StateResult<String> {
        let len = self.count()?;
        let bytes = self.read_exact(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| StateError::Corrupt("invalid utf-8"))
    }

    pub(crate) fn opt_str(&mut self) -> StateResult<Option<String>> {
        if self.bool()? {
            self.str().map(Some)
        } else {
            Ok(None)
        }
    }
}
