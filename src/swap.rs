//! Byte-order normalization for fixed-width element arrays.
//!
//! Fields are read from the stream as raw bytes, normalized in place to host
//! order, then interpreted with `from_ne_bytes`. Encoding runs the same swap
//! on `to_ne_bytes` output, since reversing is its own inverse.

use serde::Deserialize;

/// Byte order of a raw MPL stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the machine running the ingest.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn needs_swap(self) -> bool {
        self != Self::native()
    }
}

fn swap_width(buf: &mut [u8], width: usize) {
    for element in buf.chunks_exact_mut(width) {
        element.reverse();
    }
}

/// Reverse each 2-byte element of `buf`. A trailing partial element is left alone.
pub fn swap2(buf: &mut [u8]) {
    swap_width(buf, 2);
}

/// Reverse each 4-byte element of `buf`.
pub fn swap4(buf: &mut [u8]) {
    swap_width(buf, 4);
}

/// Reverse each 8-byte element of `buf`.
pub fn swap8(buf: &mut [u8]) {
    swap_width(buf, 8);
}

/// Bring `buf`, a packed array of `width`-byte elements in `order`, into host
/// order. Single bytes never need swapping.
pub fn normalize(buf: &mut [u8], width: usize, order: ByteOrder) {
    if !order.needs_swap() {
        return;
    }
    match width {
        2 => swap2(buf),
        4 => swap4(buf),
        8 => swap8(buf),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 37 + 11) as u8).collect()
    }

    #[test]
    fn swap_twice_is_identity() {
        let swaps: [fn(&mut [u8]); 3] = [swap2, swap4, swap8];
        for len in [0usize, 1, 2, 3, 4, 7, 8, 16, 24, 64, 1000] {
            let original = pattern(len);
            for swap in swaps {
                let mut buf = original.clone();
                swap(&mut buf);
                swap(&mut buf);
                assert_eq!(buf, original, "len {len}");
            }
        }
    }

    #[test]
    fn swap_reverses_each_element() {
        let mut buf = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap2(&mut buf);
        assert_eq!(buf, [2, 1, 4, 3, 6, 5, 8, 7]);

        let mut buf = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap4(&mut buf);
        assert_eq!(buf, [4, 3, 2, 1, 8, 7, 6, 5]);

        let mut buf = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap8(&mut buf);
        assert_eq!(buf, [8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn swap4_matches_integer_byte_swap() {
        let values = [0i32, 1, -1, 123_456_789, i32::MIN, i32::MAX];
        let mut buf: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        swap4(&mut buf);
        let swapped: Vec<i32> = buf
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let expected: Vec<i32> = values.iter().map(|v| v.swap_bytes()).collect();
        assert_eq!(swapped, expected);
    }

    #[test]
    fn normalize_big_endian_stream() {
        let mut buf = 0x0102_0304i32.to_be_bytes().to_vec();
        normalize(&mut buf, 4, ByteOrder::Big);
        assert_eq!(i32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]), 0x0102_0304);

        let mut buf = 0x0102i16.to_le_bytes().to_vec();
        normalize(&mut buf, 2, ByteOrder::Little);
        assert_eq!(i16::from_ne_bytes([buf[0], buf[1]]), 0x0102);
    }

    #[test]
    fn native_order_never_swaps() {
        let mut buf = pattern(16);
        normalize(&mut buf, 4, ByteOrder::native());
        assert_eq!(buf, pattern(16));
        assert!(!ByteOrder::native().needs_swap());
    }
}
