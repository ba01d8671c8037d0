//! Splitting content into chunks.

use crate::TransactionError;
use std::ops::Range;

/// Number of chunks `len` bytes need at `chunk_size` bytes each.
///
/// Empty content still needs one chunk.
pub(crate) fn chunk_count(len: usize, chunk_size: usize) -> Result<usize, TransactionError> {
    if chunk_size == 0 {
        return Err(TransactionError::InvalidChunkSize);
    }
    Ok(len.div_ceil(chunk_size).max(1))
}

/// Byte ranges of each chunk, after checking the count against `max_chunks`.
pub(crate) fn plan(
    len: usize,
    chunk_size: usize,
    max_chunks: usize,
) -> Result<Vec<Range<usize>>, TransactionError> {
    let total = chunk_count(len, chunk_size)?;
    if total > max_chunks {
        return Err(TransactionError::MaxChunksExceeded {
            required: total,
            max: max_chunks,
        });
    }
    Ok((0..total)
        .map(|i| {
            let start = (i * chunk_size).min(len);
            start..((i + 1) * chunk_size).min(len)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_count_is_ceiling() {
        assert_eq!(chunk_count(0, 10).unwrap(), 1);
        assert_eq!(chunk_count(10, 10).unwrap(), 1);
        assert_eq!(chunk_count(11, 10).unwrap(), 2);
        assert_eq!(chunk_count(2500, 1024).unwrap(), 3);
        assert_eq!(chunk_count(1, 0), Err(TransactionError::InvalidChunkSize));
    }

    #[test]
    fn test_plan_covers_content() {
        let ranges = plan(25, 10, 5).unwrap();
        assert_eq!(ranges, vec![0..10, 10..20, 20..25]);
        assert_eq!(plan(0, 10, 1).unwrap(), vec![0..0]);
    }

    #[test]
    fn test_plan_rejects_too_many_chunks() {
        assert_eq!(
            plan(3 * 10 + 1, 10, 3),
            Err(TransactionError::MaxChunksExceeded {
                required: 4,
                max: 3
            })
        );
    }
}
