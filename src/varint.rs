//! 7-bit group compression for script instruction streams
//!
//! Every word is stored big-endian in groups of seven bits. Each byte's high
//! bit says whether another group follows. The first group of a word is
//! signed (bit 6 is its sign bit), so small negative words stay short.

use crate::error::{FormatError, Result};
use crate::util::sign_extend;
use bitreader::BitReader;
use log::debug;

/// Decompress exactly `count` words from the start of `bytes`.
///
/// Returns the words and the number of input bytes consumed.
pub fn decompress_words(bytes: &[u8], count: usize) -> Result<(Vec<i32>, usize)> {
    let mut words = Vec::with_capacity(count.min(bytes.len()));
    let mut reader = BitReader::new(bytes);
    let total_bits = bytes.len() as u64 * 8;
    let mut x: i32 = 0;
    let mut groups = 0;

    while words.len() < count {
        if total_bits - reader.position() < 8 {
            return Err(FormatError::TruncatedStream {
                decoded: words.len(),
                expected: count,
            });
        }
        let more = reader.read_bool()?;
        let v = reader.read_u8(7)? as u32;

        groups += 1;
        if groups == 1 {
            x = sign_extend(v, 6);
        } else {
            x = (x << 7) | v as i32;
        }

        if !more {
            words.push(x);
            groups = 0;
        }
    }

    let consumed = (reader.position() / 8) as usize;
    debug!("Decompressed {} words from {} bytes", count, consumed);
    Ok((words, consumed))
}

/// Compress words with the same encoding `decompress_words` reads.
pub fn compress_words(words: &[i32]) -> Vec<u8> {
    let mut compressed = Vec::new();

    for &word in words {
        // Fewest groups whose sign-extended value reproduces the word
        let mut groups = 1;
        while groups < 5 {
            let bits = 7 * groups;
            let fitted = ((word as i64) << (64 - bits)) >> (64 - bits);
            if fitted == word as i64 {
                break;
            }
            groups += 1;
        }

        for g in (0..groups).rev() {
            let v = ((word as i64 >> (7 * g)) & 0x7F) as u8;
            if g == 0 {
                compressed.push(v);
            } else {
                compressed.push(v | 0x80);
            }
        }
    }

    compressed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group_words() {
        let (words, used) = decompress_words(&[0x05, 0x3f, 0x40, 0x7f], 4).unwrap();
        assert_eq!(words, vec![5, 63, -64, -1]);
        assert_eq!(used, 4);
    }

    #[test]
    fn test_multi_group_word() {
        // 0xae as two groups: 0000001 0101110
        let (words, used) = decompress_words(&[0x81, 0x2e], 1).unwrap();
        assert_eq!(words, vec![0xae]);
        assert_eq!(used, 2);

        // Negative first group extends through the following groups
        let (words, _) = decompress_words(&[0xff, 0x00], 1).unwrap();
        assert_eq!(words, vec![-128]);
    }

    #[test]
    fn test_stops_at_count() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        let (words, used) = decompress_words(&bytes, 2).unwrap();
        assert_eq!(words, vec![1, 2]);
        assert_eq!(used, 2);
    }

    #[test]
    fn test_truncated_stream_is_fatal() {
        // Continuation bit set on the last available byte
        let err = decompress_words(&[0x01, 0x81], 2).unwrap_err();
        assert_eq!(
            err,
            FormatError::TruncatedStream {
                decoded: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn test_huge_count_on_short_input() {
        // A corrupt header can claim far more words than the input holds
        let err = decompress_words(&[0x01; 16], 0x3fff_fffc).unwrap_err();
        assert_eq!(
            err,
            FormatError::TruncatedStream {
                decoded: 16,
                expected: 0x3fff_fffc
            }
        );
    }

    #[test]
    fn test_round_trip() {
        let words = vec![
            0,
            1,
            -1,
            63,
            64,
            -64,
            -65,
            0x0000_002e,
            0x0010_00a4,
            0x7fff_ffff,
            i32::MIN,
            -0x1234_5678,
            0x3f80_0000,
        ];
        let compressed = compress_words(&words);
        let (decoded, used) = decompress_words(&compressed, words.len()).unwrap();
        assert_eq!(decoded, words);
        assert_eq!(used, compressed.len());
    }

    #[test]
    fn test_minimal_encoding() {
        assert_eq!(compress_words(&[63]), vec![0x3f]);
        assert_eq!(compress_words(&[64]), vec![0x80, 0x40]);
        assert_eq!(compress_words(&[-64]), vec![0x40]);
        assert_eq!(compress_words(&[i32::MIN]).len(), 5);
    }
}
