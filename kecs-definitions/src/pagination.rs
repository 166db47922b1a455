//! Opaque pagination cursors for `List*` operations.
//!
//! Stable under insertion (new rows get a higher rowid than the cursor),
//! not stable under deletion.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Encode the last-seen rowid as an opaque token.
pub fn encode_cursor(last_row_id: i64) -> String {
    STANDARD.encode(last_row_id.to_be_bytes())
}

/// Decode a token produced by [`encode_cursor`]. Unknown/garbled tokens are
/// treated as "from the start" rather than erroring, since ECS clients
/// treat `nextToken` as opaque and we'd rather degrade gracefully.
pub fn decode_cursor(token: &str) -> Option<i64> {
    let bytes = STANDARD.decode(token).ok()?;
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(i64::from_be_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let token = encode_cursor(42);
        assert_eq!(decode_cursor(&token), Some(42));
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert_eq!(decode_cursor("not valid base64!!"), None);
    }
}
