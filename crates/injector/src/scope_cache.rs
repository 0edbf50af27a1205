use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::instance::Instance;
use crate::scope::Scope;

/// Статистика использования кэшей
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub singleton_hits: u64,
    pub singleton_misses: u64,
    pub prototype_creations: u64,
    pub total_cache_clears: u64,
}

/// Кэш экземпляров по scope.
///
/// Блокировки держатся только на время обращения к map, создание экземпляра
/// выполняется снаружи. При гонке на первом создании сохраняется значение,
/// которое попало в кэш первым.
#[derive(Debug, Default)]
pub struct ScopeCache {
    singletons: RwLock<HashMap<String, Instance>>,
    stats: RwLock<CacheStats>,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Instance> {
        let cached = self.singletons.read().get(name).cloned();
        if cached.is_some() {
            self.stats.write().singleton_hits += 1;
            debug!("Singleton cache hit for {}", name);
        }
        cached
    }

    /// Сохранить созданный singleton и вернуть то, что в итоге лежит в кэше
    pub fn store(&self, name: &str, instance: Instance) -> Instance {
        let stored = self
            .singletons
            .write()
            .entry(name.to_string())
            .or_insert(instance)
            .clone();

        self.stats.write().singleton_misses += 1;
        debug!("Created new singleton for {}", name);
        stored
    }

    pub fn record_prototype(&self, name: &str) {
        self.stats.write().prototype_creations += 1;
        debug!("Created new prototype instance of {}", name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    /// Очистить кэш указанного scope. Prototype ничего не кэширует.
    pub fn clear(&self, scope: Scope) {
        match scope {
            Scope::Singleton => {
                let removed = {
                    let mut singletons = self.singletons.write();
                    let count = singletons.len();
                    singletons.clear();
                    count
                };
                self.stats.write().total_cache_clears += 1;
                debug!("🧹 Singleton кэш очищен ({} экземпляров)", removed);
            }
            Scope::Application | Scope::Prototype => {
                debug!("Nothing cached for {} scope", scope);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.singletons.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}
