use std::fmt;

/// Bearer token of one OCS endpoint. Replaced wholesale on every refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: String,
    pub expires_at_unix_ts: i64, // UNIX TIMESTAMP
}

impl TokenRecord {
    pub fn new(access_token: String, expires_at_unix_ts: i64) -> Self {
        Self {
            access_token,
            expires_at_unix_ts,
        }
    }

    /// Usable only while strictly more than `safety_margin_seconds` remain.
    pub fn is_valid_at(&self, now_unix_ts: i64, safety_margin_seconds: i64) -> bool {
        self.expires_at_unix_ts - now_unix_ts > safety_margin_seconds
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"***")
            .field("expires_at_unix_ts", &self.expires_at_unix_ts)
            .finish()
    }
}
