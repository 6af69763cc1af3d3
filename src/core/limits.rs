//! core::limits
//!
//! Size-limited reads.
//!
//! The 2 MiB cap is a security invariant, not an ergonomic choice: it
//! bounds memory on every path that reads remote or decrypted bytes.

use std::io::Read;

use thiserror::Error;

use super::errors::ErrorKind;

/// A read exceeded its size limit.
#[derive(Debug, Error)]
pub enum LimitError {
    #[error("{what} exceeds maximum size of {limit} bytes")]
    Exceeded { what: String, limit: u64 },

    #[error("failed to read {what}: {source}")]
    Io {
        what: String,
        #[source]
        source: std::io::Error,
    },
}

impl LimitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LimitError::Exceeded { .. } => ErrorKind::FileSizeExceeded,
            LimitError::Io { .. } => ErrorKind::Unknown,
        }
    }
}

/// Read all bytes from `r`, failing once more than `limit` bytes appear.
///
/// Reads one byte past the limit to distinguish "exactly at the limit"
/// from "over it".
pub fn read_limited(r: impl Read, limit: u64, what: &str) -> Result<Vec<u8>, LimitError> {
    let mut data = Vec::new();
    r.take(limit + 1)
        .read_to_end(&mut data)
        .map_err(|source| LimitError::Io {
            what: what.to_string(),
            source,
        })?;

    if data.len() as u64 > limit {
        return Err(LimitError::Exceeded {
            what: what.to_string(),
            limit,
        });
    }

    Ok(data)
}

/// Check an already-buffered slice against a size limit.
pub fn check_limit(data: &[u8], limit: u64, what: &str) -> Result<(), LimitError> {
    if data.len() as u64 > limit {
        return Err(LimitError::Exceeded {
            what: what.to_string(),
            limit,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_under_limit() {
        let data = read_limited(&b"hello"[..], 10, "test").unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn reads_exactly_at_limit() {
        let data = read_limited(&b"12345"[..], 5, "test").unwrap();
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn rejects_one_past_limit() {
        let err = read_limited(&b"123456"[..], 5, "blob").unwrap_err();
        assert!(matches!(err, LimitError::Exceeded { limit: 5, .. }));
        assert_eq!(err.to_string(), "blob exceeds maximum size of 5 bytes");
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(read_limited(&b""[..], 0, "test").unwrap().is_empty());
    }

    #[test]
    fn check_limit_on_buffers() {
        assert!(check_limit(b"abc", 3, "x").is_ok());
        assert!(check_limit(b"abcd", 3, "x").is_err());
    }
}
