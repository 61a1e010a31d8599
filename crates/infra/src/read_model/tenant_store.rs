use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use atelier_auth::TenantFilter;
use atelier_core::TenantId;

/// Tenant-partitioned key/value store.
///
/// Every read takes the caller's [`TenantFilter`] and applies it to the
/// partition key, so an unscoped read is not expressible. Writes name one
/// concrete tenant.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, scope: &TenantFilter, key: &K) -> Option<V>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V);
    fn list(&self, scope: &TenantFilter) -> Vec<V>;
    /// Scoped listing with an additional caller predicate, AND-merged with the scope.
    fn query(&self, scope: &TenantFilter, predicate: &dyn Fn(&V) -> bool) -> Vec<V>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, scope: &TenantFilter, key: &K) -> Option<V> {
        (**self).get(scope, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        (**self).upsert(tenant_id, key, value)
    }

    fn list(&self, scope: &TenantFilter) -> Vec<V> {
        (**self).list(scope)
    }

    fn query(&self, scope: &TenantFilter, predicate: &dyn Fn(&V) -> bool) -> Vec<V> {
        (**self).query(scope, predicate)
    }
}

/// In-memory tenant-partitioned store for tests/dev.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    inner: RwLock<HashMap<(TenantId, K), V>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, scope: &TenantFilter, key: &K) -> Option<V> {
        let map = self.inner.read().ok()?;
        match scope {
            TenantFilter::Tenant(tenant_id) => map.get(&(tenant_id.clone(), key.clone())).cloned(),
            TenantFilter::Unrestricted => map
                .iter()
                .find_map(|((_t, k), v)| if k == key { Some(v.clone()) } else { None }),
        }
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) {
        if let Ok(mut map) = self.inner.write() {
            map.insert((tenant_id, key), value);
        }
    }

    fn list(&self, scope: &TenantFilter) -> Vec<V> {
        self.query(scope, &|_| true)
    }

    fn query(&self, scope: &TenantFilter, predicate: &dyn Fn(&V) -> bool) -> Vec<V> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        map.iter()
            .filter_map(|((t, _k), v)| {
                if scope.admits(t) && predicate(v) {
                    Some(v.clone())
                } else {
                    None
                }
            })
            .collect()
    }
}
