//! Session tokens.
//!
//! A token is 32 symbols drawn uniformly from a 64-symbol alphabet using the
//! operating system CSPRNG, giving a 192-bit search space. The token is the
//! bearer credential itself, so it is never logged.

use thiserror::Error;

pub const TOKEN_LENGTH: usize = 32;
pub const TOKEN_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Error)]
#[error("failed to gather token entropy: {0}")]
pub struct TokenError(#[source] getrandom::Error);

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Result<Self, TokenError> {
        let mut bytes = [0u8; TOKEN_LENGTH];
        getrandom::getrandom(&mut bytes).map_err(TokenError)?;
        Ok(Self::from_entropy(bytes))
    }

    /// 256 is a multiple of 64, so masking to six bits keeps the draw uniform.
    fn from_entropy(bytes: [u8; TOKEN_LENGTH]) -> Self {
        let token = bytes
            .iter()
            .map(|b| TOKEN_ALPHABET[usize::from(b & 0x3f)] as char)
            .collect();
        Self(token)
    }

    /// Accept a client-supplied token if it is shaped like one we issue.
    ///
    /// Anything else can never match a live session, so callers treat `None`
    /// exactly like an unknown token.
    pub fn parse(raw: &str) -> Option<Self> {
        let well_formed =
            raw.len() == TOKEN_LENGTH && raw.bytes().all(|b| TOKEN_ALPHABET.contains(&b));
        well_formed.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn generated_tokens_are_well_formed_and_distinct() {
        let a = SessionToken::generate().unwrap();
        let b = SessionToken::generate().unwrap();
        assert_eq!(a.as_str().len(), TOKEN_LENGTH);
        assert!(SessionToken::parse(a.as_str()).is_some());
        assert_ne!(a, b);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let t = SessionToken::generate().unwrap();
        assert!(!format!("{t:?}").contains(t.as_str()));
    }

    #[test]
    fn parse_rejects_wrong_length_and_foreign_symbols() {
        assert!(SessionToken::parse("").is_none());
        assert!(SessionToken::parse(&"A".repeat(31)).is_none());
        assert!(SessionToken::parse(&format!("{}-", "A".repeat(31))).is_none());
        assert!(SessionToken::parse(&"A".repeat(32)).is_some());
    }

    #[test]
    fn alphabet_has_64_distinct_symbols() {
        let mut seen = TOKEN_ALPHABET.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 64);
    }

    proptest! {
        #[test]
        fn every_entropy_draw_maps_into_the_alphabet(bytes in proptest::array::uniform32(any::<u8>())) {
            let token = SessionToken::from_entropy(bytes);
            prop_assert_eq!(token.as_str().len(), TOKEN_LENGTH);
            prop_assert!(SessionToken::parse(token.as_str()).is_some());
        }
    }
}
