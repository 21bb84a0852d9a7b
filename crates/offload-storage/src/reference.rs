//! Reference codec.
//!
//! A reference (`<visibility>:<key>`) is what host records store in `content_hash` once a file
//! has been offloaded. Its format is persisted and must stay byte-for-byte stable.

use crate::Visibility;

const PRIVATE_TAG: &str = "private:";
const PUBLIC_TAG: &str = "public:";

pub fn encode(key: &str, visibility: Visibility) -> String {
    match visibility {
        Visibility::Private => format!("{}{}", PRIVATE_TAG, key),
        Visibility::Public => format!("{}{}", PUBLIC_TAG, key),
    }
}

/// Recover `(key, visibility)` from a reference. Never fails.
///
/// An untagged reference is a private key. Empty input, or a tag with nothing after it,
/// yields no key.
pub fn decode(reference: &str) -> (Option<String>, Visibility) {
    let s = reference.trim();

    let (key, visibility) = if let Some(rest) = s.strip_prefix(PRIVATE_TAG) {
        (rest.trim(), Visibility::Private)
    } else if let Some(rest) = s.strip_prefix(PUBLIC_TAG) {
        (rest.trim(), Visibility::Public)
    } else {
        (s, Visibility::Private)
    };

    if key.is_empty() {
        (None, visibility)
    } else {
        (Some(key.to_string()), visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for visibility in [Visibility::Public, Visibility::Private] {
            let key = "2025/01/02/Sales Invoice/AB12CD34_report.pdf";
            assert_eq!(
                decode(&encode(key, visibility)),
                (Some(key.to_string()), visibility)
            );
        }
    }

    #[test]
    fn test_untagged_defaults_to_private() {
        assert_eq!(decode("abc"), (Some("abc".to_string()), Visibility::Private));
        assert_eq!(decode("  abc  "), (Some("abc".to_string()), Visibility::Private));
    }

    #[test]
    fn test_empty_yields_no_key() {
        assert_eq!(decode(""), (None, Visibility::Private));
        assert_eq!(decode("   "), (None, Visibility::Private));
        assert_eq!(decode("public:  "), (None, Visibility::Public));
    }

    #[test]
    fn test_tags_are_case_sensitive() {
        assert_eq!(
            decode("PUBLIC:a.png"),
            (Some("PUBLIC:a.png".to_string()), Visibility::Private)
        );
    }
}
