use std::fmt::Debug;

/// A fixed-width transfer unit.
///
/// Buffers and stages are generic over the word type; the copy algorithms
/// never look inside a word. File stages store words as little-endian bytes.
pub trait Word: Copy + Default + Debug + PartialEq + Send + Sync + 'static {
    /// Width of one word in bytes
    const WIDTH: usize;

    /// Truncate 64 random bits to a word
    fn from_bits(bits: u64) -> Self;

    /// Decode a word from exactly `WIDTH` little-endian bytes
    fn read_le(bytes: &[u8]) -> Self;

    /// Encode a word into exactly `WIDTH` little-endian bytes
    fn write_le(self, out: &mut [u8]);
}

macro_rules! impl_word {
    ($($ty:ty),*) => {
        $(
            impl Word for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn from_bits(bits: u64) -> Self {
                    bits as $ty
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_word!(u8, u16, u32, u64);

/// Decode as many whole words as fit in both `bytes` and `dst`.
pub(crate) fn decode<W: Word>(bytes: &[u8], dst: &mut [W]) -> usize {
    let mut count = 0;
    for (word, chunk) in dst.iter_mut().zip(bytes.chunks_exact(W::WIDTH)) {
        *word = W::read_le(chunk);
        count += 1;
    }
    count
}

/// Encode `src` into `out`, which is resized to fit.
pub(crate) fn encode<W: Word>(src: &[W], out: &mut Vec<u8>) {
    out.resize(src.len() * W::WIDTH, 0);
    for (word, chunk) in src.iter().zip(out.chunks_exact_mut(W::WIDTH)) {
        word.write_le(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(u8::WIDTH, 1);
        assert_eq!(u16::WIDTH, 2);
        assert_eq!(u32::WIDTH, 4);
        assert_eq!(u64::WIDTH, 8);
    }

    #[test]
    fn test_from_bits_truncates() {
        assert_eq!(u8::from_bits(0x1234), 0x34);
        assert_eq!(u16::from_bits(0x1234_5678), 0x5678);
    }

    #[test]
    fn test_encode_decode_words() {
        let words: Vec<u32> = vec![1, 0xdead_beef, 7];
        let mut bytes = Vec::new();
        encode(&words, &mut bytes);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[4..8], &[0xef, 0xbe, 0xad, 0xde]);

        let mut out = [0u32; 3];
        assert_eq!(decode(&bytes, &mut out), 3);
        assert_eq!(out.to_vec(), words);
    }

    #[test]
    fn test_decode_ignores_partial_word() {
        let mut out = [0u16; 4];
        assert_eq!(decode(&[1, 0, 2], &mut out), 1);
        assert_eq!(out[0], 1);
    }
}
