use sha2::{Digest, Sha256};

/// Content address for a piece of text: SHA-256 over the lowercased,
/// trimmed input, as lowercase hex.
///
/// Both ingestion dedup and audio caching key off this, so "Cuire les pâtes"
/// and "  cuire les pâtes " address the same content.
pub fn content_hash(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Dedup hash for an ingested recipe, derived from the external source
/// identity (provider id + title).
pub fn recipe_hash(external_id: &str, title: &str) -> String {
    content_hash(&format!("{}-{}", external_id, title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_ignores_case_and_whitespace() {
        assert_eq!(content_hash(" Cuire les pâtes "), content_hash("cuire les pâtes"));
    }

    #[test]
    fn hash_is_hex_sha256() {
        let h = content_hash("Coupe les oignons");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn distinct_content_distinct_hash() {
        assert_ne!(content_hash("verser"), content_hash("fouetter"));
    }

    #[test]
    fn recipe_hash_depends_on_id_and_title() {
        assert_eq!(recipe_hash("715538", "Pasta"), recipe_hash("715538", "pasta"));
        assert_ne!(recipe_hash("715538", "Pasta"), recipe_hash("715539", "Pasta"));
    }
}
