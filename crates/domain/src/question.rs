use super::RecordType;
use std::sync::Arc;

/// A single DNS question, normalized for keying.
///
/// Uses `Arc<str>` for zero-cost cloning across resolver, cache, and refresh
/// layers. The name is always lowercase with the trailing dot stripped; the
/// on-the-wire question is echoed from the request itself, so the original
/// spelling never needs to travel with this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Question {
    pub name: Arc<str>,
    pub qtype: RecordType,
}

impl Question {
    pub fn new(name: impl AsRef<str>, qtype: RecordType) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            qtype,
        }
    }

    /// Build a question from an already-normalized name (cache-key replay).
    pub fn from_normalized(name: Arc<str>, qtype: RecordType) -> Self {
        Self { name, qtype }
    }
}

/// Trim, lowercase, and strip the trailing dot. The result is the canonical
/// key form used by every cache tier and the blocklist engine.
pub fn normalize_name(raw: &str) -> Arc<str> {
    let trimmed = raw.trim().trim_end_matches('.');
    if trimmed.chars().all(|c| !c.is_ascii_uppercase()) {
        Arc::from(trimmed)
    } else {
        Arc::from(trimmed.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_dot_and_lowercases() {
        let q = Question::new("WWW.Example.COM.", RecordType::A);
        assert_eq!(&*q.name, "www.example.com");
    }

    #[test]
    fn already_normalized_names_avoid_reallocation() {
        assert_eq!(&*normalize_name("example.com"), "example.com");
        assert_eq!(&*normalize_name("  example.com. "), "example.com");
    }
}
