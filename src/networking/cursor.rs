use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::convert::TryFrom;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("read of {width} bytes at offset {offset} overruns a {len}-byte payload")]
    OutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("address record must be 18, 26 or 30 bytes, got {0}")]
    InvalidAddressLength(usize),
    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}

///
/// Sequential reader over one immutable payload.
///
/// Every read checks that `offset + width` stays inside the buffer. The first
/// read that does not sets a sticky failure: that read and every read after it
/// returns the same error and the offset never moves again.
///
#[derive(Debug)]
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
    failure: Option<DecodeError>,
}

impl<'a> Cursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Cursor<'a> {
        Cursor {
            buffer,
            offset: 0,
            failure: None,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn has_failed(&self) -> bool {
        self.failure.is_some()
    }

    fn take(&mut self, width: usize) -> Result<&'a [u8], DecodeError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        match self.offset.checked_add(width) {
            Some(end) if end <= self.buffer.len() => {
                let bytes = &self.buffer[self.offset..end];
                self.offset = end;
                Ok(bytes)
            }
            _ => {
                let failure = DecodeError::OutOfBounds {
                    offset: self.offset,
                    width,
                    len: self.buffer.len(),
                };
                self.failure = Some(failure.clone());
                Err(failure)
            }
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Ports are the one big-endian field on the wire.
    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.take(len)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// `< 0xFD` is the value itself, `0xFD`/`0xFE`/`0xFF` prefix a 2/4/8-byte
    /// little-endian value.
    pub fn read_var_int(&mut self) -> Result<u64, DecodeError> {
        match self.read_u8()? {
            0xFD => Ok(self.read_u16()? as u64),
            0xFE => Ok(self.read_u32()? as u64),
            0xFF => self.read_u64(),
            flag => Ok(flag as u64),
        }
    }

    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_var_int()?;
        self.read_bytes(usize::try_from(len).unwrap_or(usize::MAX))
    }

    /// One byte per character.
    pub fn read_var_string(&mut self) -> Result<String, DecodeError> {
        Ok(self.read_var_bytes()?.iter().map(|&b| b as char).collect())
    }

    /// Hands back `value` only if no read along the way failed.
    pub fn finish<T>(&self, value: T) -> Result<T, DecodeError> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(value),
        }
    }

    /// Capacity for a count-prefixed list, bounded by what the buffer can hold.
    pub fn capacity_for(&self, count: u64, item_width: usize) -> usize {
        let fits = self.remaining() / item_width.max(1);
        usize::try_from(count).unwrap_or(usize::MAX).min(fits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_sequential_fixed_width_numbers() {
        let bytes = [1, 2, 3, 4, 5];
        let mut cursor = Cursor::new(&bytes);
        let read: Vec<u8> = (0..5).map(|_| cursor.read_u8().unwrap()).collect();
        assert_eq!(read, vec![1, 2, 3, 4, 5]);

        let bytes = [1, 0, 2, 0, 3, 0];
        let mut cursor = Cursor::new(&bytes);
        let read: Vec<u16> = (0..3).map(|_| cursor.read_u16().unwrap()).collect();
        assert_eq!(read, vec![1, 2, 3]);

        let bytes = [1, 0, 0, 0, 2, 0, 0, 0];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_u32().unwrap(), 1);
        assert_eq!(cursor.read_u32().unwrap(), 2);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn reads_var_ints_of_every_width() {
        let bytes = [
            1, 0xFD, 2, 0, 0xFE, 1, 0, 0, 0, 0xFF, 1, 0, 0, 0, 0, 0, 0, 0, 0xFC,
        ];
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_var_int().unwrap(), 1);
        assert_eq!(cursor.read_var_int().unwrap(), 2);
        assert_eq!(cursor.read_var_int().unwrap(), 1);
        assert_eq!(cursor.read_var_int().unwrap(), 1);
        assert_eq!(cursor.read_var_int().unwrap(), 0xFC);
        assert!(!cursor.has_failed());
    }

    #[test]
    fn reads_var_string() {
        let bytes = hex::decode("0F2F5361746F7368693A302E372E322F").unwrap();
        let mut cursor = Cursor::new(&bytes);
        assert_eq!(cursor.read_var_string().unwrap(), "/Satoshi:0.7.2/");
    }

    #[test]
    fn raw_bytes_borrow_without_mutation() {
        let bytes = [1, 2, 3, 4, 5];
        let mut cursor = Cursor::new(&bytes);
        let read = cursor.read_bytes(3).unwrap().to_vec();
        assert_eq!(read, vec![1, 2, 3]);
        assert_eq!(cursor.read_u8().unwrap(), 4);
        assert_eq!(bytes, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn failure_is_sticky() {
        let bytes = [1, 2];
        let mut cursor = Cursor::new(&bytes);
        let failure = cursor.read_u32().unwrap_err();
        assert_eq!(
            failure,
            DecodeError::OutOfBounds {
                offset: 0,
                width: 4,
                len: 2
            }
        );
        // two bytes are still there, but the cursor has given up
        assert_eq!(cursor.read_u8(), Err(failure.clone()));
        assert_eq!(cursor.read_u16(), Err(failure.clone()));
        assert_eq!(cursor.offset(), 0);
        assert!(cursor.has_failed());
        assert_eq!(cursor.finish(()), Err(failure));
    }

    #[test]
    fn truncated_var_int_fails() {
        let bytes = [0xFE, 1, 0];
        let mut cursor = Cursor::new(&bytes);
        assert!(cursor.read_var_int().is_err());
        assert!(cursor.has_failed());
    }

    #[test]
    fn oversized_length_prefix_fails_instead_of_allocating() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let mut cursor = Cursor::new(&bytes);
        assert!(cursor.read_var_bytes().is_err());
        assert_eq!(cursor.capacity_for(u64::MAX, 30), 0);
    }
}
