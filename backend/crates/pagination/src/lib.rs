//! Opaque cursor and pagination envelope primitives shared across backend
//! list endpoints.
//!
//! Cursors are base64-encoded `(created_at, id)` pairs so pagination stays
//! stable under concurrent inserts without exposing raw offsets to clients.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Errors raised while decoding a client-supplied cursor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CursorError {
    /// The cursor was not valid base64.
    #[error("cursor is not valid base64")]
    InvalidEncoding,
    /// The decoded bytes were not valid cursor JSON.
    #[error("cursor payload is malformed")]
    MalformedPayload,
}

/// An opaque pagination cursor over `(sort_key, id)` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Millisecond timestamp of the last item on the previous page.
    pub sort_key_millis: i64,
    /// Tie-breaking identifier of the last item on the previous page.
    pub id: String,
}

impl Cursor {
    /// Encode this cursor as an opaque, URL-safe string.
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a cursor previously produced by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::InvalidEncoding`] if `raw` is not valid base64,
    /// or [`CursorError::MalformedPayload`] if the decoded bytes are not a
    /// valid cursor.
    pub fn decode(raw: &str) -> Result<Self, CursorError> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(raw)
            .map_err(|_| CursorError::InvalidEncoding)?;
        serde_json::from_slice(&bytes).map_err(|_| CursorError::MalformedPayload)
    }
}

/// A page of results plus the cursor to fetch the next one, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Opaque cursor for the next page, `None` if this is the last page.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page from a result set fetched with one extra row
    /// (`limit + 1`) used to detect whether a further page exists.
    pub fn from_overfetch<F>(mut items: Vec<T>, limit: usize, mut cursor_for: F) -> Self
    where
        F: FnMut(&T) -> Cursor,
    {
        let has_more = items.len() > limit;
        if has_more {
            items.truncate(limit);
        }
        let next_cursor = if has_more {
            items.last().map(|item| cursor_for(item).encode())
        } else {
            None
        };
        Self { items, next_cursor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = Cursor {
            sort_key_millis: 12345,
            id: "abc".into(),
        };
        let encoded = cursor.encode();
        let decoded = Cursor::decode(&encoded).expect("valid cursor");
        assert_eq!(cursor, decoded);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            Cursor::decode("not base64!!"),
            Err(CursorError::InvalidEncoding)
        ));
    }

    #[test]
    fn page_reports_next_cursor_only_when_overfetched() {
        let items = vec![1, 2, 3];
        let page = Page::from_overfetch(items, 2, |n| Cursor {
            sort_key_millis: i64::from(*n),
            id: n.to_string(),
        });
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.next_cursor.is_some());

        let items = vec![1, 2];
        let page = Page::from_overfetch(items, 2, |n| Cursor {
            sort_key_millis: i64::from(*n),
            id: n.to_string(),
        });
        assert!(page.next_cursor.is_none());
    }
}
