//! Deterministic hashing helpers.
//!
//! Keys are hashed with blake3 over a canonical, separator-delimited
//! encoding so that the same inputs always produce the same digest.

use blake3::Hasher;

/// Hash an ordered list of string parts.
///
/// Each part is terminated with a NUL byte so that `["ab", "c"]` and
/// `["a", "bc"]` hash differently.
#[must_use]
pub fn blake3_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Hasher::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update(b"\0");
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_parts_is_deterministic() {
        let a = blake3_parts(["dual", "/node_modules/pkg/index.d.ts"]);
        let b = blake3_parts(["dual", "/node_modules/pkg/index.d.ts"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_blake3_parts_separates_parts() {
        assert_ne!(blake3_parts(["ab", "c"]), blake3_parts(["a", "bc"]));
    }
}
