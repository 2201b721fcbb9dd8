//! URL fragment normalization

/// Lowercase `s` and turn every run of non-alphanumeric characters into a
/// single `-`, trimming dashes at both ends
///
/// Total: any input, including the empty string, yields a (possibly empty)
/// slug.
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    let mut pending_dash = false;

    for ch in s.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("The Doctor"), "the-doctor");
        assert_eq!(slugify("The Wolven King's Bite"), "the-wolven-king-s-bite");
        assert_eq!(slugify("  Port   Map!! "), "port-map");
    }

    #[test]
    fn test_slugify_is_total() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("--- ???"), "");
        assert_eq!(slugify("Maelström"), "maelström");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for s in ["A Mother's Parting Gift", "1000 Ribbons", "Merveil, the Twisted"] {
            assert_eq!(slugify(&slugify(s)), slugify(s));
        }
    }
}
