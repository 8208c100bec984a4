//! Ledger tuning knobs.

use serde::{Deserialize, Serialize};

/// Default limit on candidate name, party and description length.
pub const DEFAULT_MAX_FIELD_LEN: usize = 256;

/// Default number of entries buffered per log subscriber.
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum characters in a candidate field, after trimming.
    pub max_field_len: usize,
    /// Entries a slow subscriber may fall behind before it starts lagging.
    pub event_buffer: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_field_len: DEFAULT_MAX_FIELD_LEN,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: LedgerConfig = serde_json::from_str(r#"{"max_field_len": 32}"#).unwrap();
        assert_eq!(config.max_field_len, 32);
        assert_eq!(config.event_buffer, DEFAULT_EVENT_BUFFER);
    }
}
