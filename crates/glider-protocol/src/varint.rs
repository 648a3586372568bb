//! Variable-length integers.
//!
//! Seven bits per byte, least significant group first, high bit set on every
//! byte except the last. 32-bit values take at most five bytes and 64-bit
//! values at most ten; anything longer is rejected as malformed.

use bytes::BufMut;
use glider_common::{ProtocolError, Result};

pub const MAX_VARINT_LEN: usize = 5;
pub const MAX_VARLONG_LEN: usize = 10;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Number of bytes `value` occupies once encoded.
pub fn varint_len(value: i32) -> usize {
    let value = value as u32;
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

pub fn varlong_len(value: i64) -> usize {
    let mut value = value as u64;
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

pub fn write_varint<B: BufMut>(out: &mut B, value: i32) {
    let mut value = value as u32;
    while value & !(SEGMENT_BITS as u32) != 0 {
        out.put_u8((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
    out.put_u8(value as u8);
}

pub fn write_varlong<B: BufMut>(out: &mut B, value: i64) {
    let mut value = value as u64;
    while value & !(SEGMENT_BITS as u64) != 0 {
        out.put_u8((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
    out.put_u8(value as u8);
}

/// Decodes a varint from the front of `input`, returning it with the number
/// of bytes consumed. `Ok(None)` means the input ends mid-varint.
pub fn try_read_varint(input: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut result: u32 = 0;
    for (i, &byte) in input.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(ProtocolError::MalformedVarInt {
                max_bytes: MAX_VARINT_LEN,
            });
        }
        result |= ((byte & SEGMENT_BITS) as u32) << (7 * i);
        if byte & CONTINUE_BIT == 0 {
            return Ok(Some((result as i32, i + 1)));
        }
    }
    if input.len() >= MAX_VARINT_LEN {
        return Err(ProtocolError::MalformedVarInt {
            max_bytes: MAX_VARINT_LEN,
        });
    }
    Ok(None)
}

pub fn try_read_varlong(input: &[u8]) -> Result<Option<(i64, usize)>> {
    let mut result: u64 = 0;
    for (i, &byte) in input.iter().enumerate() {
        if i == MAX_VARLONG_LEN {
            return Err(ProtocolError::MalformedVarInt {
                max_bytes: MAX_VARLONG_LEN,
            });
        }
        result |= ((byte & SEGMENT_BITS) as u64) << (7 * i);
        if byte & CONTINUE_BIT == 0 {
            return Ok(Some((result as i64, i + 1)));
        }
    }
    if input.len() >= MAX_VARLONG_LEN {
        return Err(ProtocolError::MalformedVarInt {
            max_bytes: MAX_VARLONG_LEN,
        });
    }
    Ok(None)
}

/// Like [`try_read_varint`], but a truncated varint is a buffer underrun.
pub fn read_varint(input: &[u8]) -> Result<(i32, usize)> {
    try_read_varint(input)?.ok_or(ProtocolError::BufferUnderrun {
        needed: input.len() + 1,
        remaining: input.len(),
    })
}

pub fn read_varlong(input: &[u8]) -> Result<(i64, usize)> {
    try_read_varlong(input)?.ok_or(ProtocolError::BufferUnderrun {
        needed: input.len() + 1,
        remaining: input.len(),
    })
}

/// Maps signed to unsigned so that small negatives stay short.
pub fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn zigzag_encode64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn zigzag_decode64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn encode(value: i32) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, value);
        out
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(1), vec![0x01]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(300), vec![0xAC, 0x02]);
        assert_eq!(encode(2147483647), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
        assert_eq!(encode(-1), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_varint() {
        let test_cases = vec![0, 1, 127, 128, 255, 300, 25565, 2097151, 2147483647, -1, -2147483648];

        for value in test_cases {
            let bytes = encode(value);
            assert!((1..=MAX_VARINT_LEN).contains(&bytes.len()));
            assert_eq!(bytes.len(), varint_len(value));
            assert_eq!(read_varint(&bytes).unwrap(), (value, bytes.len()));
        }
    }

    #[test]
    fn test_varlong() {
        let test_cases = vec![0i64, 1, 127, 128, 2147483647, -1, i64::MAX, i64::MIN];

        for value in test_cases {
            let mut bytes = Vec::new();
            write_varlong(&mut bytes, value);
            assert!((1..=MAX_VARLONG_LEN).contains(&bytes.len()));
            assert_eq!(bytes.len(), varlong_len(value));
            assert_eq!(read_varlong(&bytes).unwrap(), (value, bytes.len()));
        }
    }

    #[test]
    fn test_varint_error_handling() {
        // five continuation bytes never terminate
        assert_matches!(
            read_varint(&[0xFF; 5]),
            Err(ProtocolError::MalformedVarInt { max_bytes: 5 })
        );
        assert_matches!(
            read_varint(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
            Err(ProtocolError::MalformedVarInt { .. })
        );
        assert_matches!(
            read_varlong(&[0x80; 11]),
            Err(ProtocolError::MalformedVarInt { max_bytes: 10 })
        );

        // continuation bit set but no more bytes
        assert_matches!(read_varint(&[0x80]), Err(ProtocolError::BufferUnderrun { .. }));
        assert_eq!(try_read_varint(&[0x80, 0x80]).unwrap(), None);
        assert_eq!(try_read_varint(&[]).unwrap(), None);
    }

    #[test]
    fn test_zigzag() {
        for (signed, unsigned) in [(0, 0u32), (-1, 1), (1, 2), (-2, 3), (i32::MAX, u32::MAX - 1), (i32::MIN, u32::MAX)] {
            assert_eq!(zigzag_encode32(signed), unsigned);
            assert_eq!(zigzag_decode32(unsigned), signed);
        }
        for value in [0i64, -1, 1, i64::MIN, i64::MAX, -300] {
            assert_eq!(zigzag_decode64(zigzag_encode64(value)), value);
        }
        // small negatives stay small once zigzagged
        assert_eq!(varint_len(zigzag_encode32(-3) as i32), 1);
    }
}
