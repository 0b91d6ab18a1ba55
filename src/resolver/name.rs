//! Username hashing.
//!
//! Usernames live under the `.mizu` suffix and are keyed in the registry by
//! their ENS-style namehash.

use alloy::primitives::{keccak256, B256};

use crate::error::ResolveError;

pub const NAME_SUFFIX: &str = ".mizu";

pub const INVALID_NAME_TOO_SHORT: &str = "invalid username: must be at least 5 characters";
pub const INVALID_NAME_DISALLOWED_CHARACTERS: &str = "invalid username: disallowed characters";

const MIN_LABEL_LEN: usize = 5;

/// ENS namehash of `name`.
///
/// `namehash("") = 0` and `namehash(label.rest) = keccak256(namehash(rest) ++
/// keccak256(label))`. A single trailing dot does not add an empty label.
pub fn name_hash(name: &str) -> B256 {
    if name.is_empty() {
        return B256::ZERO;
    }

    let mut labels: Vec<&str> = name.split('.').collect();
    if labels.last() == Some(&"") {
        labels.pop();
    }

    labels.iter().rev().fold(B256::ZERO, |node, label| {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(keccak256(label.as_bytes()).as_slice());
        keccak256(buf)
    })
}

fn validate(name: &str) -> Result<(), ResolveError> {
    let labels: Vec<&str> = name.split('.').collect();
    if labels.len() != 2 || labels[0].chars().count() < MIN_LABEL_LEN {
        return Err(ResolveError::InvalidName(INVALID_NAME_TOO_SHORT));
    }
    if !labels[0]
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(ResolveError::InvalidName(INVALID_NAME_DISALLOWED_CHARACTERS));
    }
    Ok(())
}

/// Normalize a username and return the registry key for it.
pub fn gen_name_hash(username: &str) -> Result<B256, ResolveError> {
    let mut name = username.trim().to_lowercase();
    if !name.ends_with(NAME_SUFFIX) {
        name.push_str(NAME_SUFFIX);
    }
    validate(&name)?;
    Ok(name_hash(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::b256;

    #[test]
    fn test_name_hash_vectors() {
        assert_eq!(name_hash(""), B256::ZERO);
        assert_eq!(
            name_hash("eth"),
            b256!("93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae")
        );
        assert_eq!(
            name_hash("foo.eth"),
            b256!("de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f")
        );
    }

    #[test]
    fn test_trailing_dot_is_ignored() {
        assert_eq!(name_hash("foo.eth."), name_hash("foo.eth"));
    }

    #[test]
    fn test_gen_name_hash_normalizes() {
        let expected = name_hash("alice.mizu");
        assert_eq!(gen_name_hash("alice").unwrap(), expected);
        assert_eq!(gen_name_hash("  Alice.MIZU ").unwrap(), expected);
    }

    #[test]
    fn test_gen_name_hash_rejects_short_names() {
        let err = gen_name_hash("bob").unwrap_err();
        assert_eq!(err.to_string(), INVALID_NAME_TOO_SHORT);
        assert_eq!(err.status_code(), 400);

        // Extra labels count as malformed too
        assert!(matches!(
            gen_name_hash("alice.smith"),
            Err(ResolveError::InvalidName(INVALID_NAME_TOO_SHORT))
        ));
    }

    #[test]
    fn test_gen_name_hash_rejects_disallowed_characters() {
        assert!(matches!(
            gen_name_hash("alice_01"),
            Err(ResolveError::InvalidName(INVALID_NAME_DISALLOWED_CHARACTERS))
        ));
    }
}
