use byteorder::{BigEndian, ByteOrder, LittleEndian};

///
/// Assembles an outgoing payload from typed fields.
///
/// The builder only produces the payload. Magic bytes, the command name,
/// length and checksum are added by the transport when the message is framed.
///
#[derive(Debug, Default, Clone)]
pub struct Builder {
    segments: Vec<Vec<u8>>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { segments: vec![] }
    }

    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.segments.push(vec![value]);
        self
    }

    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.put_bytes(&buf)
    }

    pub fn put_u16_be(&mut self, value: u16) -> &mut Self {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.put_bytes(&buf)
    }

    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.put_bytes(&buf)
    }

    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        let mut buf = [0u8; 4];
        LittleEndian::write_i32(&mut buf, value);
        self.put_bytes(&buf)
    }

    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, value);
        self.put_bytes(&buf)
    }

    /// Mirrors [`Cursor::read_var_int`](super::cursor::Cursor::read_var_int).
    pub fn put_var_int(&mut self, value: u64) -> &mut Self {
        match value {
            0..=0xFC => self.put_u8(value as u8),
            0xFD..=0xFFFF => self.put_u8(0xFD).put_u16(value as u16),
            0x1_0000..=0xFFFF_FFFF => self.put_u8(0xFE).put_u32(value as u32),
            _ => self.put_u8(0xFF).put_u64(value),
        }
    }

    pub fn put_var_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.put_var_int(bytes.len() as u64).put_bytes(bytes)
    }

    /// One byte per character; characters above U+00FF do not fit and are
    /// written as `?`.
    pub fn put_var_string(&mut self, value: &str) -> &mut Self {
        let bytes: Vec<u8> = value
            .chars()
            .map(|c| if (c as u32) <= 0xFF { c as u32 as u8 } else { b'?' })
            .collect();
        self.put_var_bytes(&bytes)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.segments.push(bytes.to_vec());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut vbytes = Vec::with_capacity(self.len());
        for segment in &self.segments {
            vbytes.extend(segment);
        }
        vbytes
    }
}
