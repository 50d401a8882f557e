use sha2::{Digest, Sha256};

/// Width of the truncated digest in hex characters.
const HASH_WIDTH: usize = 8;

/// One-way hash for free-text identifiers (file names, workspace names,
/// diagnostic messages) before they reach a log line. Truncated to 8 hex
/// characters: collisions are tolerable for the study's statistics, and
/// re-identification avoidance, not adversarial resistance, is the goal.
pub fn hash_str(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest
        .iter()
        .take(HASH_WIDTH / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(hash_str("src/main.rs"), hash_str("src/main.rs"));
    }

    #[test]
    fn is_fixed_width() {
        assert_eq!(hash_str("").len(), 8);
        assert_eq!(hash_str("a").len(), 8);
        assert_eq!(hash_str(&"x".repeat(10_000)).len(), 8);
    }

    #[test]
    fn empty_input_hashes_to_known_value() {
        // leading 8 hex chars of SHA-256("")
        assert_eq!(hash_str(""), "e3b0c442");
    }

    #[test]
    fn distinct_inputs_produce_distinct_tokens() {
        assert_ne!(hash_str("src/main.rs"), hash_str("src/lib.rs"));
    }

    #[test]
    fn output_never_contains_the_input() {
        let token = hash_str("supersecret.rs");
        assert!(!token.contains("supersecret"));
    }
}
