//! Page tokens.
//!
//! A token is `<pitId>:<from>`: the point-in-time handle opened by the first
//! page and the offset of the next page. Callers treat it as opaque.

use crate::errors::EngineError;

/// Page size used when the caller supplies a token but no size, and the hit
/// cap of unpaginated searches.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

const SEPARATOR: char = ':';

/// Build the token of the page starting at `from`.
pub fn encode_token(pit_id: &str, from: usize) -> String {
    format!("{}{}{}", pit_id, SEPARATOR, from)
}

/// Split a token into its point-in-time id and offset.
///
/// Point-in-time ids are base64 and never contain the separator, but the
/// split is taken at the last one regardless.
pub fn decode_token(token: &str) -> Result<(String, usize), EngineError> {
    let (pit_id, from) = token
        .rsplit_once(SEPARATOR)
        .ok_or_else(|| EngineError::invalid_argument(format!("invalid page token {:?}", token)))?;
    if pit_id.is_empty() {
        return Err(EngineError::invalid_argument(format!(
            "invalid page token {:?}: missing point-in-time id",
            token
        )));
    }
    let from = from.parse::<usize>().map_err(|_| {
        EngineError::invalid_argument(format!(
            "invalid page token {:?}: offset must be a non-negative integer",
            token
        ))
    })?;
    Ok((pit_id.to_string(), from))
}

/// The token following a page of `size` hits starting at `from`, or empty
/// when that page reached the end of `total` hits.
pub fn next_token(pit_id: &str, from: usize, size: usize, total: u64) -> String {
    let next = from.saturating_add(size);
    if (next as u64) < total {
        encode_token(pit_id, next)
    } else {
        String::new()
    }
}
