//! Byte ranges as reported in `nextExpectedRanges`

use crate::error::{GraphError, Result};
use std::fmt;
use std::str::FromStr;

/// Inclusive byte range; `end` is `None` for the open form `"start-"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn open(start: u64) -> Self {
        Self { start, end: None }
    }

    /// The span actually sent for this range: at most `max_chunk_size` bytes,
    /// never past the last byte of the file.
    pub fn chunk_span(&self, file_size: u64, max_chunk_size: u64) -> Result<(u64, u64)> {
        if max_chunk_size == 0 {
            return Err(GraphError::invalid_argument("max chunk size must be greater than zero"));
        }
        if self.start >= file_size {
            return Err(GraphError::invalid_range(format!(
                "range start {} is beyond the end of a {} byte file",
                self.start, file_size
            )));
        }

        let chunk_end = self.start.saturating_add(max_chunk_size - 1);
        let end = match self.end {
            Some(end) if end < self.start => {
                return Err(GraphError::invalid_range(format!(
                    "range end {} precedes start {}",
                    end, self.start
                )))
            }
            Some(end) => end.min(chunk_end),
            None => chunk_end,
        };

        Ok((self.start, end.min(file_size - 1)))
    }
}

impl FromStr for ByteRange {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (start, end) = trimmed
            .split_once('-')
            .ok_or_else(|| GraphError::invalid_range(format!("'{}' is not a byte range", s)))?;

        let start = start
            .trim()
            .parse::<u64>()
            .map_err(|_| GraphError::invalid_range(format!("'{}' has an invalid start", s)))?;
        let end = match end.trim() {
            "" => None,
            value => Some(
                value
                    .parse::<u64>()
                    .map_err(|_| GraphError::invalid_range(format!("'{}' has an invalid end", s)))?,
            ),
        };

        Ok(Self { start, end })
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}-", self.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("12345-55232".parse::<ByteRange>().unwrap(), ByteRange::new(12345, 55232));
        assert_eq!("26-".parse::<ByteRange>().unwrap(), ByteRange::open(26));
        assert!("-10".parse::<ByteRange>().is_err());
        assert!("abc".parse::<ByteRange>().is_err());
        assert_eq!(ByteRange::open(26).to_string(), "26-");
    }

    #[test]
    fn test_chunk_span_cases() {
        let max = 100;
        // Open range from the start of the file
        assert_eq!(ByteRange::open(0).chunk_span(1_000, max).unwrap(), (0, 99));
        // Server asked for less than a chunk
        assert_eq!(ByteRange::new(0, 49).chunk_span(1_000, max).unwrap(), (0, 49));
        // Open range mid-file
        assert_eq!(ByteRange::open(300).chunk_span(1_000, max).unwrap(), (300, 399));
        // Closed range wider than a chunk is clamped
        assert_eq!(ByteRange::new(300, 999).chunk_span(1_000, max).unwrap(), (300, 399));
        // Tail of the file
        assert_eq!(ByteRange::open(950).chunk_span(1_000, max).unwrap(), (950, 999));
    }

    #[test]
    fn test_chunk_span_rejects_bad_ranges() {
        assert!(ByteRange::open(1_000).chunk_span(1_000, 100).is_err());
        assert!(ByteRange::new(10, 5).chunk_span(1_000, 100).is_err());
        assert!(ByteRange::open(0).chunk_span(1_000, 0).is_err());
    }

    #[test]
    fn test_chunks_tile_the_file() {
        let file_size = 1_000_000;
        let max = 320 * 1024;
        let mut next = Some(ByteRange::open(0));
        let mut covered = 0;
        let mut chunks = 0;

        while let Some(range) = next {
            let (start, end) = range.chunk_span(file_size, max).unwrap();
            assert_eq!(start, covered, "gap or overlap at chunk {}", chunks);
            covered = end + 1;
            chunks += 1;
            next = (covered < file_size).then(|| ByteRange::open(covered));
        }

        assert_eq!(covered, file_size);
        assert_eq!(chunks, 4);
    }
}
