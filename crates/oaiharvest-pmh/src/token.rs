//! Resumption token: the continuation state of a paged listing.
//!
//! The token text is opaque to us and must round-trip byte for byte.
//! Cursor, list size and expiration are optional attributes the server may
//! send alongside it; absent values stay absent rather than becoming zero.

use crate::error::HarvestError;

/// Continuation state returned with each `ListRecords` page and persisted
/// in the checkpoint file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResumptionToken {
    /// Opaque continuation token (absent once the listing is exhausted)
    pub token: Option<String>,
    /// Position of the page within the full listing
    pub cursor: Option<u64>,
    /// Server's estimate of the total listing size
    pub complete_list_size: Option<u64>,
    /// Expiration timestamp as reported by the server, kept verbatim
    pub expiration: Option<String>,
}

impl ResumptionToken {
    /// Encode as the `/`-delimited checkpoint line:
    /// `token/cursor/completeListSize/expiration`, absent fields empty.
    pub fn to_line(&self) -> String {
        fn field(v: Option<&str>) -> &str {
            v.unwrap_or("")
        }
        format!(
            "{}/{}/{}/{}",
            field(self.token.as_deref()),
            self.cursor.map(|c| c.to_string()).unwrap_or_default(),
            self.complete_list_size
                .map(|s| s.to_string())
                .unwrap_or_default(),
            field(self.expiration.as_deref()),
        )
    }

    /// Decode a checkpoint line. Anything but exactly four `/`-separated
    /// fields is corrupt.
    pub fn from_line(line: &str) -> Result<Self, HarvestError> {
        let parts: Vec<&str> = line.split('/').collect();
        if parts.len() != 4 {
            return Err(HarvestError::CorruptCheckpoint {
                line: line.to_string(),
            });
        }
        let opt = |s: &str| {
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };
        let num = |s: &str| -> Result<Option<u64>, HarvestError> {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse().map(Some).map_err(|_| {
                    HarvestError::CorruptCheckpoint {
                        line: line.to_string(),
                    }
                })
            }
        };
        Ok(Self {
            token: opt(parts[0]),
            cursor: num(parts[1])?,
            complete_list_size: num(parts[2])?,
            expiration: opt(parts[3]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_all_fields() {
        let tok = ResumptionToken {
            token: Some("abc123".to_string()),
            cursor: Some(50),
            complete_list_size: Some(500),
            expiration: Some("2026-09-01T00:00:00Z".to_string()),
        };
        assert_eq!(
            ResumptionToken::from_line(&tok.to_line()).unwrap(),
            tok
        );
    }

    #[test]
    fn roundtrip_absent_optionals() {
        let tok = ResumptionToken {
            token: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(tok.to_line(), "abc123///");
        assert_eq!(ResumptionToken::from_line("abc123///").unwrap(), tok);
    }

    #[test]
    fn decode_example_line() {
        let tok = ResumptionToken::from_line("abc123/50/500/").unwrap();
        assert_eq!(tok.token.as_deref(), Some("abc123"));
        assert_eq!(tok.cursor, Some(50));
        assert_eq!(tok.complete_list_size, Some(500));
        assert_eq!(tok.expiration, None);
    }

    #[test]
    fn absent_fields_stay_absent() {
        let tok = ResumptionToken::from_line("abc123///").unwrap();
        assert_eq!(tok.cursor, None);
        assert_eq!(tok.complete_list_size, None);
    }

    #[test]
    fn wrong_field_count_is_corrupt() {
        assert!(matches!(
            ResumptionToken::from_line("a/b"),
            Err(HarvestError::CorruptCheckpoint { .. })
        ));
        assert!(matches!(
            ResumptionToken::from_line("a/1/2/3/4"),
            Err(HarvestError::CorruptCheckpoint { .. })
        ));
    }

    #[test]
    fn non_numeric_cursor_is_corrupt() {
        assert!(matches!(
            ResumptionToken::from_line("abc/x/500/"),
            Err(HarvestError::CorruptCheckpoint { .. })
        ));
    }

    #[test]
    fn token_text_round_trips_verbatim() {
        let tok = ResumptionToken {
            token: Some("MToxMHwyOnwzOnw0Onw1Om9haV9kYw==".to_string()),
            cursor: Some(10),
            complete_list_size: None,
            expiration: None,
        };
        let back = ResumptionToken::from_line(&tok.to_line()).unwrap();
        assert_eq!(back.token, tok.token);
    }
}
