//! Last-known parse of every component.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;

use kite_graph::ModuleId;

use super::{parse_sfc, SfcDescriptor, SfcParseError};

/// Shared cache of component descriptors keyed by the component's own id.
///
/// A missing entry means the component was never parsed. Entries are
/// replaced wholesale, never patched.
#[derive(Debug, Clone, Default)]
pub struct DescriptorCache {
    inner: Arc<RwLock<HashMap<ModuleId, Arc<SfcDescriptor>>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached descriptor for `id`, parsing and storing `raw` on a miss.
    pub fn get_or_parse(&self, id: &ModuleId, raw: &str) -> Result<Arc<SfcDescriptor>, SfcParseError> {
        if let Some(descriptor) = self.get(id) {
            return Ok(descriptor);
        }

        let parsed = Arc::new(parse_sfc(raw)?);
        let mut inner = self.inner.write();
        Ok(Arc::clone(inner.entry(id.clone()).or_insert(parsed)))
    }

    pub fn get(&self, id: &ModuleId) -> Option<Arc<SfcDescriptor>> {
        self.inner.read().get(id).cloned()
    }

    /// Store a fresh parse, replacing any previous one.
    pub fn insert(&self, id: ModuleId, descriptor: SfcDescriptor) -> Arc<SfcDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.inner.write().insert(id, Arc::clone(&descriptor));
        descriptor
    }

    /// Drop the cached parse and hand it back.
    pub fn invalidate(&self, id: &ModuleId) -> Option<Arc<SfcDescriptor>> {
        self.inner.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ModuleId {
        ModuleId::new("/App.vue").unwrap()
    }

    #[test]
    fn parses_once_then_serves_from_cache() {
        let cache = DescriptorCache::new();
        let first = cache.get_or_parse(&id(), "<template>a</template>").unwrap();
        let second = cache.get_or_parse(&id(), "<template>b</template>").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.template.as_ref().unwrap().content, "a");
    }

    #[test]
    fn invalidate_returns_previous_parse() {
        let cache = DescriptorCache::new();
        cache.get_or_parse(&id(), "<template>a</template>").unwrap();

        let previous = cache.invalidate(&id()).unwrap();
        assert_eq!(previous.template.as_ref().unwrap().content, "a");
        assert!(cache.get(&id()).is_none());
        assert!(cache.invalidate(&id()).is_none());
    }

    #[test]
    fn parse_failure_leaves_cache_empty() {
        let cache = DescriptorCache::new();
        assert!(cache.get_or_parse(&id(), "<template>").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_replaces_wholesale() {
        let cache = DescriptorCache::new();
        cache.get_or_parse(&id(), "<template>a</template><style></style>").unwrap();
        cache.insert(id(), SfcDescriptor::default());
        assert_eq!(*cache.get(&id()).unwrap(), SfcDescriptor::default());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
