use std::fmt;
use std::sync::Arc;

use super::ConfigProjection;

type KeyMap = Arc<dyn Fn(&str) -> String + Send + Sync>;
type KeyFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A projection assembled from closures.
///
/// Unset mappings default to the identity and unset filters accept every
/// key. Both relevance checks first verify that the key survives a round
/// trip through the two mappings, so non-invertible mappings silently drop
/// the offending keys instead of aliasing them. Without an explicit key
/// filter, a key is relevant when its source key is.
#[derive(Clone, Default)]
pub struct BasicProjection {
    key_filter: Option<KeyFilter>,
    sourcekey_filter: Option<KeyFilter>,
    to_sourcekey: Option<KeyMap>,
    to_key: Option<KeyMap>,
}

impl BasicProjection {
    /// The identity projection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes upper-case source keys under lower-case keys (`a` reads `A`).
    #[must_use]
    pub fn lowercase() -> Self {
        Self::new()
            .with_key_to_sourcekey(str::to_uppercase)
            .with_sourcekey_to_key(str::to_lowercase)
    }

    /// Exposes lower-case source keys under upper-case keys (`A` reads `a`).
    #[must_use]
    pub fn uppercase() -> Self {
        Self::new()
            .with_key_to_sourcekey(str::to_lowercase)
            .with_sourcekey_to_key(str::to_uppercase)
    }

    /// Restrict which projected keys are accepted.
    #[must_use]
    pub fn with_key_filter(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.key_filter = Some(Arc::new(filter));
        self
    }

    /// Restrict which source keys are exposed.
    #[must_use]
    pub fn with_sourcekey_filter(
        mut self,
        filter: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.sourcekey_filter = Some(Arc::new(filter));
        self
    }

    /// Set the key → source key mapping.
    #[must_use]
    pub fn with_key_to_sourcekey(
        mut self,
        map: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.to_sourcekey = Some(Arc::new(map));
        self
    }

    /// Set the source key → key mapping.
    #[must_use]
    pub fn with_sourcekey_to_key(
        mut self,
        map: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.to_key = Some(Arc::new(map));
        self
    }
}

impl ConfigProjection for BasicProjection {
    fn is_relevant_key(&self, key: &str) -> bool {
        let sourcekey = self.key_to_sourcekey(key);
        if self.sourcekey_to_key(&sourcekey) != key {
            return false;
        }
        match &self.key_filter {
            Some(filter) => filter(key),
            None => self.is_relevant_sourcekey(&sourcekey),
        }
    }

    fn is_relevant_sourcekey(&self, sourcekey: &str) -> bool {
        if self.key_to_sourcekey(&self.sourcekey_to_key(sourcekey)) != sourcekey {
            return false;
        }
        self.sourcekey_filter
            .as_ref()
            .is_none_or(|filter| filter(sourcekey))
    }

    fn key_to_sourcekey(&self, key: &str) -> String {
        self.to_sourcekey
            .as_ref()
            .map_or_else(|| key.to_owned(), |map| map(key))
    }

    fn sourcekey_to_key(&self, sourcekey: &str) -> String {
        self.to_key
            .as_ref()
            .map_or_else(|| sourcekey.to_owned(), |map| map(sourcekey))
    }
}

impl fmt::Debug for BasicProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicProjection")
            .field("key_filter", &self.key_filter.is_some())
            .field("sourcekey_filter", &self.sourcekey_filter.is_some())
            .field("key_to_sourcekey", &self.to_sourcekey.is_some())
            .field("sourcekey_to_key", &self.to_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_accepts_everything() {
        let projection = BasicProjection::new();
        assert!(projection.is_relevant_key("Any_Key"));
        assert!(projection.is_relevant_sourcekey("Any_Key"));
        assert_eq!(projection.key_to_sourcekey("k"), "k");
    }

    #[test]
    fn test_lowercase_projection() {
        let projection = BasicProjection::lowercase();
        assert_eq!(projection.key_to_sourcekey("home"), "HOME");
        assert!(projection.is_relevant_sourcekey("HOME"));
        assert!(projection.is_relevant_key("home"));
        // Mixed case cannot round-trip.
        assert!(!projection.is_relevant_sourcekey("Home"));
        assert!(!projection.is_relevant_key("HOME"));
    }

    #[test]
    fn test_default_key_filter_defers_to_sourcekey_filter() {
        let projection = BasicProjection::uppercase()
            .with_sourcekey_filter(|sk| !sk.starts_with("irrelevant_"));
        assert!(projection.is_relevant_key("A"));
        assert!(!projection.is_relevant_key("IRRELEVANT_KEY"));
        assert!(!projection.is_relevant_key("a"));
    }

    #[test]
    fn test_explicit_key_filter_still_checks_round_trip() {
        let projection = BasicProjection::uppercase().with_key_filter(|_| true);
        assert!(projection.is_relevant_key("X"));
        assert!(!projection.is_relevant_key("x"));
    }
}
