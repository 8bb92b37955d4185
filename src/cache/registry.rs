//! Cache Category Registry
//!
//! Named, versioned cache categories and the versioned store naming scheme.

use std::time::Duration;

use serde::Serialize;

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;

// == Cache Config ==
/// Configuration for one cache category.
///
/// Entries live in the store named `name-vVERSION`; bumping `version`
/// orphans the previous generation without deleting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    pub name: String,
    pub version: String,
    pub max_age: Duration,
    pub max_entries: usize,
}

impl CacheConfig {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        max_age: Duration,
        max_entries: usize,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            max_age,
            max_entries,
        }
    }

    /// Versioned store name for this config.
    pub fn store_name(&self) -> String {
        store_name(self)
    }
}

/// Returns `name + "-v" + version`.
pub fn store_name(config: &CacheConfig) -> String {
    format!("{}-v{}", config.name, config.version)
}

// == Registry ==
/// Ordered table of cache categories keyed by a short category key.
#[derive(Debug, Clone, Default)]
pub struct CacheRegistry {
    categories: Vec<(String, CacheConfig)>,
}

impl CacheRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four built-in categories.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            "static",
            CacheConfig::new("static-assets", "1.0.0", Duration::from_secs(7 * DAY), 100),
        );
        registry.register(
            "images",
            CacheConfig::new("images", "1.0.0", Duration::from_secs(30 * DAY), 200),
        );
        registry.register(
            "ocr-models",
            CacheConfig::new("ocr-models", "1.0.0", Duration::from_secs(90 * DAY), 5),
        );
        registry.register(
            "api",
            CacheConfig::new("api-data", "1.0.0", Duration::from_secs(5 * MINUTE), 50),
        );
        registry
    }

    /// Adds or replaces a category.
    pub fn register(&mut self, key: impl Into<String>, config: CacheConfig) {
        let key = key.into();
        match self.categories.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = config,
            None => self.categories.push((key, config)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheConfig> {
        self.categories
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, config)| config)
    }

    /// Categories in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheConfig)> {
        self.categories.iter().map(|(k, c)| (k.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// True when `store` belongs to a registered category under any version.
    pub fn owns_store(&self, store: &str) -> bool {
        match store.rsplit_once("-v") {
            Some((name, version)) if !version.is_empty() => {
                self.categories.iter().any(|(_, c)| c.name == name)
            }
            _ => false,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_name() {
        let config = CacheConfig::new("images", "1.0.0", Duration::from_secs(60), 10);
        assert_eq!(store_name(&config), "images-v1.0.0");
        assert_eq!(config.store_name(), "images-v1.0.0");
    }

    #[test]
    fn test_version_bump_changes_store_name() {
        let v1 = CacheConfig::new("images", "1.0.0", Duration::from_secs(60), 10);
        let v2 = CacheConfig { version: "2.0.0".to_string(), ..v1.clone() };
        assert_ne!(v1.store_name(), v2.store_name());
    }

    #[test]
    fn test_builtin_categories() {
        let registry = CacheRegistry::builtin();
        let keys: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["static", "images", "ocr-models", "api"]);

        let api = registry.get("api").unwrap();
        let models = registry.get("ocr-models").unwrap();
        let images = registry.get("images").unwrap();

        // API data: short TTL; OCR models: long TTL, smallest capacity
        assert!(api.max_age < images.max_age);
        assert!(models.max_age > images.max_age);
        assert!(models.max_entries < api.max_entries);
    }

    #[test]
    fn test_register_replaces_existing_key() {
        let mut registry = CacheRegistry::builtin();
        registry.register(
            "api",
            CacheConfig::new("api-data", "2.0.0", Duration::from_secs(30), 5),
        );

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("api").unwrap().version, "2.0.0");
    }

    #[test]
    fn test_get_unknown() {
        assert!(CacheRegistry::builtin().get("videos").is_none());
    }

    #[test]
    fn test_owns_store() {
        let registry = CacheRegistry::builtin();

        assert!(registry.owns_store("images-v1.0.0"));
        assert!(registry.owns_store("images-v0.9.0"));
        assert!(registry.owns_store("api-data-v1.0.0"));
        assert!(!registry.owns_store("images-vault-v1"));
        assert!(!registry.owns_store("images"));
        assert!(!registry.owns_store("images-v"));
        assert!(!registry.owns_store("thumbnails-v1.0.0"));
    }
}
