//! Typed field groups on top of a byte stream.
//!
//! Each group is read with one `read_exact`, normalized to host order and
//! then split into elements, so a short read anywhere in a group surfaces as
//! `UnexpectedEof` from the underlying reader.

use std::io::Read;

use crate::error::DecodeResult;
use crate::swap::{self, ByteOrder};

/// Fixed-width value stored in a raw record.
pub(crate) trait Element: Copy + Default {
    const WIDTH: usize;

    fn from_ne_slice(bytes: &[u8]) -> Self;

    fn extend_ne(self, out: &mut Vec<u8>);
}

macro_rules! element {
    ($type:ty) => {
        impl Element for $type {
            const WIDTH: usize = std::mem::size_of::<$type>();

            fn from_ne_slice(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$type>()];
                buf.copy_from_slice(bytes);
                <$type>::from_ne_bytes(buf)
            }

            fn extend_ne(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

element!(u8);
element!(i16);
element!(i32);
element!(f32);

pub(crate) struct FieldReader<'a, R> {
    inner: &'a mut R,
    order: ByteOrder,
}

impl<'a, R: Read> FieldReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R, order: ByteOrder) -> Self {
        Self { inner, order }
    }

    pub(crate) fn read_vec<T: Element>(&mut self, len: usize) -> DecodeResult<Vec<T>> {
        let mut buf = vec![0u8; len * T::WIDTH];
        self.inner.read_exact(&mut buf)?;
        swap::normalize(&mut buf, T::WIDTH, self.order);
        Ok(buf.chunks_exact(T::WIDTH).map(T::from_ne_slice).collect())
    }

    pub(crate) fn read_array<T: Element, const N: usize>(&mut self) -> DecodeResult<[T; N]> {
        let values = self.read_vec::<T>(N)?;
        let mut out = [T::default(); N];
        out.copy_from_slice(&values);
        Ok(out)
    }

    pub(crate) fn read_one<T: Element>(&mut self) -> DecodeResult<T> {
        let [value] = self.read_array::<T, 1>()?;
        Ok(value)
    }
}

/// Mirror of [`FieldReader`], used to build raw records.
pub(crate) struct FieldWriter {
    out: Vec<u8>,
    order: ByteOrder,
}

impl FieldWriter {
    pub(crate) fn new(order: ByteOrder) -> Self {
        Self {
            out: Vec::new(),
            order,
        }
    }

    pub(crate) fn put<T: Element>(&mut self, values: &[T]) {
        let mut buf = Vec::with_capacity(values.len() * T::WIDTH);
        for value in values {
            value.extend_ne(&mut buf);
        }
        swap::normalize(&mut buf, T::WIDTH, self.order);
        self.out.extend_from_slice(&buf);
    }

    pub(crate) fn put_one<T: Element>(&mut self, value: T) {
        self.put(&[value]);
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_group_reads_back() {
        let bytes = [0x00, 0x01, 0xff, 0xfe, 0x00, 0x00, 0x01, 0x00];
        let mut cursor = &bytes[..];
        let mut fields = FieldReader::new(&mut cursor, ByteOrder::Big);
        let shorts: [i16; 2] = fields.read_array().unwrap();
        assert_eq!(shorts, [1, -2]);
        let long: i32 = fields.read_one().unwrap();
        assert_eq!(long, 256);
    }

    #[test]
    fn short_group_is_unexpected_eof() {
        let bytes = [0u8; 6];
        let mut cursor = &bytes[..];
        let mut fields = FieldReader::new(&mut cursor, ByteOrder::Little);
        let err = fields.read_vec::<i32>(2).unwrap_err();
        match err {
            crate::error::DecodeError::Io(e) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn writer_matches_reader() {
        for order in [ByteOrder::Little, ByteOrder::Big] {
            let mut writer = FieldWriter::new(order);
            writer.put(&[1.5f32, -3.25]);
            writer.put_one(7u8);
            writer.put_one(-9i16);
            let bytes = writer.into_bytes();
            assert_eq!(bytes.len(), 11);

            let mut cursor = &bytes[..];
            let mut fields = FieldReader::new(&mut cursor, order);
            assert_eq!(fields.read_array::<f32, 2>().unwrap(), [1.5, -3.25]);
            assert_eq!(fields.read_one::<u8>().unwrap(), 7);
            assert_eq!(fields.read_one::<i16>().unwrap(), -9);
        }
    }
}
