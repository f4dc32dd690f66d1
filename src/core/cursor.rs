// Single-use page tokens: opaque random keys into a server-side table of
// resume positions. Presenting a token removes it, so no token steers more
// than one list call.
use std::collections::HashMap;

use getrandom::fill as fill_random;

use crate::core::error::{Error, ErrorKind};

const TOKEN_BYTES: usize = 16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct PageCursor {
    resume_index: usize,
    show_deleted: bool,
}

/// Outstanding page tokens for one collection. Tokens do not expire: the
/// table shrinks only when a token is consumed or on `reset`.
#[derive(Debug, Default)]
pub struct PageTokens {
    outstanding: HashMap<String, PageCursor>,
}

impl PageTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token that resumes at `resume_index` for requests made
    /// with the same `show_deleted` flag.
    pub fn mint(&mut self, resume_index: usize, show_deleted: bool) -> Result<String, Error> {
        let cursor = PageCursor {
            resume_index,
            show_deleted,
        };
        loop {
            let token = generate_token()?;
            if self.outstanding.contains_key(&token) {
                continue;
            }
            self.outstanding.insert(token.clone(), cursor);
            tracing::debug!(resume_index, show_deleted, "minted page token");
            return Ok(token);
        }
    }

    /// Resolves `token` to its resume index and retires it.
    ///
    /// The empty token is the start of the sequence and touches nothing. A
    /// token that was never issued, was already consumed, or was issued for a
    /// different `show_deleted` value fails without modifying the table.
    pub fn consume(&mut self, token: &str, show_deleted: bool) -> Result<usize, Error> {
        if token.is_empty() {
            return Ok(0);
        }
        match self.outstanding.get(token) {
            Some(cursor) if cursor.show_deleted == show_deleted => {}
            _ => return Err(invalid_token(token)),
        }
        let cursor = self
            .outstanding
            .remove(token)
            .ok_or_else(|| invalid_token(token))?;
        tracing::debug!(resume_index = cursor.resume_index, "consumed page token");
        Ok(cursor.resume_index)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub fn reset(&mut self) {
        self.outstanding.clear();
    }
}

fn invalid_token(token: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument)
        .with_message(format!("invalid or expired page token {token:?}"))
        .with_hint("Restart the listing with an empty page token.")
}

fn generate_token() -> Result<String, Error> {
    let mut bytes = [0u8; TOKEN_BYTES];
    fill_random(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to generate page token: {err}"))
    })?;
    Ok(hex_encode(&bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(nibble_hex(byte >> 4));
        out.push(nibble_hex(byte & 0x0f));
    }
    out
}

fn nibble_hex(nibble: u8) -> char {
    match nibble {
        0..=9 => char::from(b'0' + nibble),
        _ => char::from(b'a' + (nibble - 10)),
    }
}

#[cfg(test)]
mod tests {
    use super::{PageTokens, hex_encode};
    use crate::core::error::ErrorKind;

    #[test]
    fn empty_token_starts_at_zero() {
        let mut tokens = PageTokens::new();
        assert_eq!(tokens.consume("", false).expect("consume"), 0);
        assert_eq!(tokens.consume("", true).expect("consume"), 0);
        assert_eq!(tokens.outstanding(), 0);
    }

    #[test]
    fn token_resolves_once() {
        let mut tokens = PageTokens::new();
        let token = tokens.mint(4, false).expect("mint");
        assert_eq!(tokens.consume(&token, false).expect("consume"), 4);

        let err = tokens.consume(&token, false).expect_err("replay");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(tokens.outstanding(), 0);
    }

    #[test]
    fn unknown_token_is_invalid() {
        let mut tokens = PageTokens::new();
        tokens.mint(1, false).expect("mint");
        let err = tokens.consume("not-a-token", false).expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(tokens.outstanding(), 1);
    }

    #[test]
    fn flag_mismatch_leaves_token_usable() {
        let mut tokens = PageTokens::new();
        let token = tokens.mint(2, false).expect("mint");

        let err = tokens.consume(&token, true).expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(tokens.consume(&token, false).expect("consume"), 2);
    }

    #[test]
    fn minted_tokens_are_distinct_hex() {
        let mut tokens = PageTokens::new();
        let a = tokens.mint(1, false).expect("mint");
        let b = tokens.mint(1, false).expect("mint");
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn reset_forgets_outstanding_tokens() {
        let mut tokens = PageTokens::new();
        let token = tokens.mint(3, false).expect("mint");
        tokens.reset();
        let err = tokens.consume(&token, false).expect_err("reset");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn hex_encoding_is_lowercase() {
        assert_eq!(hex_encode(&[0x00, 0x7f, 0xab, 0xff]), "007fabff");
    }
}
