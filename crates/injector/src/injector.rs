//! Injector - реестр injectables и движок разрешения зависимостей
//!
//! Регистрация идёт пакетами (module groups): все записи пакета сначала
//! проверяются, затем атомарно добавляются в реестр и в граф зависимостей.
//! Разрешение синхронное и рекурсивное:
//!
//! 1. имя уже в стеке текущего разрешения - циклическая зависимость
//! 2. неизвестное имя - `NotFound` со списком известных module groups
//! 3. потребитель не может жить дольше своей зависимости (scope check)
//! 4. resolution hook (если установлен) получает право подменить экземпляр
//! 5. диспетчеризация по scope: Singleton кэшируется, Prototype создаётся
//!    каждый раз, Application не реализован
//!
//! Блокировки не удерживаются во время вызова пользовательских конструкторов,
//! поэтому конструкторы могут обращаться к контейнеру через [`Instancer`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

use common::InjectorConfig;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::dependency_graph::{DependencyGraph, DependencyGraphStats};
use crate::errors::InjectorError;
use crate::injectable::InjectableRecord;
use crate::instance::Instance;
use crate::metadata::Param;
use crate::module_group::ModuleGroup;
use crate::scope::{InjectableType, Scope};
use crate::scope_cache::{CacheStats, ScopeCache};
use crate::subject::Subject;

/// Группа, в которую попадают injectables из [`Injector::register`]
pub const DEFAULT_MODULE_GROUP: &str = "default";

/// Стек имён и scopes одного публичного вызова разрешения
#[derive(Debug, Default, Clone)]
pub struct ResolutionContext {
    names: Vec<String>,
    scopes: Vec<Scope>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Текущий потребитель: последний injectable в стеке
    pub fn consumer(&self) -> Option<(&str, Scope)> {
        match (self.names.last(), self.scopes.last()) {
            (Some(name), Some(scope)) => Some((name.as_str(), *scope)),
            _ => None,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }

    fn push(&mut self, name: &str, scope: Scope) {
        self.names.push(name.to_string());
        self.scopes.push(scope);
    }

    fn pop(&mut self) {
        self.names.pop();
        self.scopes.pop();
    }
}

/// Перехват разрешения (используется тестовым окружением)
pub trait ResolutionHook: Send + Sync {
    /// Вернуть экземпляр для `record`. Для обычного создания hook может
    /// вызвать [`Injector::construct_in_scope`].
    fn instance_for(
        &self,
        injector: &Injector,
        record: &Arc<InjectableRecord>,
        ctx: &mut ResolutionContext,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError>;
}

#[derive(Default)]
struct Registry {
    groups: Vec<ModuleGroup>,
    group_index: HashMap<String, usize>,
    records: HashMap<String, Arc<InjectableRecord>>,
    provider_ids: HashSet<usize>,
}

impl Registry {
    fn group_of(&self, name: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.contains(name))
            .map(|g| g.name())
    }

    fn group_names(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.name().to_string()).collect()
    }
}

pub(crate) struct InjectorInner {
    config: InjectorConfig,
    registry: RwLock<Registry>,
    graph: RwLock<DependencyGraph>,
    cache: ScopeCache,
    hook: RwLock<Option<Arc<dyn ResolutionHook>>>,
}

/// DI контейнер. Клоны разделяют одно состояние.
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

impl Injector {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(InjectorConfig {
            name: name.into(),
            ..InjectorConfig::default()
        })
    }

    pub fn with_config(config: InjectorConfig) -> Self {
        debug!("🏗️ Создан injector '{}'", config.name);
        Self {
            inner: Arc::new(InjectorInner {
                config,
                registry: RwLock::new(Registry::default()),
                graph: RwLock::new(DependencyGraph::new()),
                cache: ScopeCache::new(),
                hook: RwLock::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.inner.config
    }

    // === Регистрация ===

    /// Начать регистрацию module group
    pub fn group(&self, name: impl Into<String>) -> ModuleGroupBuilder<'_> {
        ModuleGroupBuilder {
            injector: self,
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Зарегистрировать module group целиком.
    ///
    /// `EagerInstantiation` означает, что группа уже зарегистрирована и
    /// упало только создание eager singleton'а; остальные ошибки оставляют
    /// реестр без изменений.
    pub fn module_group<I, N, S>(&self, name: &str, entries: I) -> Result<(), InjectorError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<Subject>,
    {
        let entries = entries
            .into_iter()
            .map(|(n, s)| (n.into(), s.into()))
            .collect();
        self.register_batch(name, entries, false)
    }

    /// Зарегистрировать один injectable в группе по умолчанию
    pub fn register(&self, name: impl Into<String>, subject: impl Into<Subject>) -> Result<(), InjectorError> {
        self.register_batch(DEFAULT_MODULE_GROUP, vec![(name.into(), subject.into())], true)
    }

    fn register_batch(
        &self,
        group: &str,
        entries: Vec<(String, Subject)>,
        extend_existing: bool,
    ) -> Result<(), InjectorError> {
        if group.trim().is_empty() {
            return Err(InjectorError::registration(group, "module group name must be a non-empty string"));
        }
        if entries.is_empty() {
            return Err(InjectorError::registration(group, "module group has no injectables"));
        }

        let records = entries
            .into_iter()
            .map(|(name, subject)| InjectableRecord::new(name, subject).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        {
            let mut registry = self.inner.registry.write();
            Self::check_batch(&registry, group, &records, extend_existing)?;

            let mut graph = self.inner.graph.write();
            let existing = registry.group_index.get(group).copied();
            let group_idx = match existing {
                Some(idx) => idx,
                None => {
                    let idx = registry.groups.len();
                    registry.groups.push(ModuleGroup::new(group));
                    registry.group_index.insert(group.to_string(), idx);
                    idx
                }
            };

            for record in &records {
                registry.groups[group_idx].push(Arc::clone(record));
                registry
                    .records
                    .insert(record.name().to_string(), Arc::clone(record));
                if let Some(id) = record.provider_id() {
                    registry.provider_ids.insert(id);
                }

                graph.associate_injectable_with_module_group(group, Arc::clone(record));
                for param in record.params() {
                    graph.associate_parameter_with_injectable(record.name(), param.target());
                }

                debug!(
                    "📝 Зарегистрирован {} ({}, {}) в группе '{}'",
                    record.name(),
                    record.kind(),
                    record.scope(),
                    group
                );
            }
        }

        info!("✅ Module group '{}' зарегистрирована: {} injectables", group, records.len());

        if self.inner.config.eager_instantiation {
            for record in records
                .iter()
                .filter(|r| r.is_eager() && r.scope() == Scope::Singleton)
            {
                info!("⚡ Eager создание singleton {}", record.name());
                self.get_instance(record.name())
                    .map_err(|source| InjectorError::EagerInstantiation {
                        group: group.to_string(),
                        name: record.name().to_string(),
                        source: Box::new(source),
                    })?;
            }
        }

        Ok(())
    }

    /// Проверки пакета до изменения состояния
    fn check_batch(
        registry: &Registry,
        group: &str,
        records: &[Arc<InjectableRecord>],
        extend_existing: bool,
    ) -> Result<(), InjectorError> {
        if !extend_existing && registry.group_index.contains_key(group) {
            return Err(InjectorError::registration(
                group,
                "module group with this name is already registered",
            ));
        }

        let mut batch_names = HashSet::new();
        let mut batch_providers = HashSet::new();

        for record in records {
            if let Some(owner) = registry.group_of(record.name()) {
                return Err(InjectorError::registration(
                    record.name(),
                    format!("duplicate injectable name, already registered in module group '{owner}'"),
                ));
            }
            if !batch_names.insert(record.name()) {
                return Err(InjectorError::registration(
                    record.name(),
                    format!("duplicate injectable name within module group '{group}'"),
                ));
            }
            if let Some(id) = record.provider_id() {
                if registry.provider_ids.contains(&id) || !batch_providers.insert(id) {
                    return Err(InjectorError::registration(
                        record.name(),
                        "provider function is already registered",
                    ));
                }
            }
        }

        Ok(())
    }

    // === Разрешение ===

    pub fn get_instance(&self, name: &str) -> Result<Instance, InjectorError> {
        self.get_instance_with(name, Vec::new())
    }

    /// Разрешить injectable, передав assisted аргументы вызывающего
    pub fn get_instance_with(&self, name: &str, assisted: Vec<Instance>) -> Result<Instance, InjectorError> {
        let mut ctx = ResolutionContext::new();
        self.resolve_in(name, &mut ctx, assisted).map_err(|e| {
            warn!("❌ Не удалось разрешить {}: {}", name, e);
            e
        })
    }

    /// Разрешить и привести к типу
    pub fn resolve<T>(&self, name: &str) -> Result<Arc<T>, InjectorError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_instance(name)?.downcast::<T>()
    }

    pub fn resolve_with<T>(&self, name: &str, assisted: Vec<Instance>) -> Result<Arc<T>, InjectorError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.get_instance_with(name, assisted)?.downcast::<T>()
    }

    /// Разрешить все injectables группы в порядке регистрации
    pub fn module_group_instances(&self, group: &str) -> Result<Vec<(String, Instance)>, InjectorError> {
        let names: Vec<String> = {
            let registry = self.inner.registry.read();
            let idx = registry
                .group_index
                .get(group)
                .copied()
                .ok_or_else(|| InjectorError::ModuleGroupNotFound {
                    name: group.to_string(),
                })?;
            registry.groups[idx].names().map(str::to_string).collect()
        };

        names
            .into_iter()
            .map(|name| {
                let instance = self.get_instance(&name)?;
                Ok((name, instance))
            })
            .collect()
    }

    /// Разрешение внутри уже идущего вызова
    pub fn resolve_in(
        &self,
        name: &str,
        ctx: &mut ResolutionContext,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError> {
        if ctx.contains(name) {
            return Err(InjectorError::CircularDependency {
                root: ctx.names().first().cloned().unwrap_or_else(|| name.to_string()),
                stack: ctx.names().to_vec(),
            });
        }

        let record = self.lookup(name)?;

        if let Some((consumer, consumer_scope)) = ctx.consumer() {
            if consumer_scope < record.scope() {
                return Err(InjectorError::ScopeViolation {
                    consumer: consumer.to_string(),
                    consumer_scope,
                    dependency: name.to_string(),
                    dependency_scope: record.scope(),
                });
            }
        }

        let hook = self.inner.hook.read().clone();
        match hook {
            Some(hook) => hook.instance_for(self, &record, ctx, assisted),
            None => self.construct_in_scope(&record, ctx, assisted),
        }
    }

    /// Создать (или взять из кэша) экземпляр без участия resolution hook
    pub fn construct_in_scope(
        &self,
        record: &Arc<InjectableRecord>,
        ctx: &mut ResolutionContext,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError> {
        record.check_assisted(assisted.len())?;

        ctx.push(record.name(), record.scope());
        let result = self.dispatch(record, ctx, assisted);
        ctx.pop();
        result
    }

    fn dispatch(
        &self,
        record: &Arc<InjectableRecord>,
        ctx: &mut ResolutionContext,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError> {
        let name = record.name();

        match (record.scope(), record.kind()) {
            (Scope::Prototype, InjectableType::FixedValue) => Err(InjectorError::not_implemented(
                name,
                "FIXED_VALUE injectables with PROTOTYPE scope",
            )),
            (Scope::Prototype, _) => {
                let instance = self.construct(record, ctx, assisted)?;
                self.inner.cache.record_prototype(name);
                Ok(instance)
            }
            (Scope::Singleton, InjectableType::FixedValue) => record
                .fixed_value()
                .cloned()
                .ok_or_else(|| InjectorError::not_implemented(name, "FIXED_VALUE without a value")),
            (Scope::Singleton, InjectableType::Provider) => Err(InjectorError::not_implemented(
                name,
                "PROVIDER injectables with SINGLETON scope",
            )),
            (Scope::Singleton, InjectableType::Constructed) => {
                if let Some(cached) = self.inner.cache.get(name) {
                    return Ok(cached);
                }
                let instance = self.construct(record, ctx, assisted)?;
                Ok(self.inner.cache.store(name, instance))
            }
            (Scope::Application, _) => Err(InjectorError::not_implemented(name, "APPLICATION scope")),
        }
    }

    /// Разрешить параметры и вызвать конструктор или provider
    fn construct(
        &self,
        record: &Arc<InjectableRecord>,
        ctx: &mut ResolutionContext,
        assisted: Vec<Instance>,
    ) -> Result<Instance, InjectorError> {
        let instantiator = record
            .instantiator()
            .ok_or_else(|| InjectorError::not_implemented(record.name(), "construction of a fixed value"))?;

        let mut params = Vec::with_capacity(record.params().len());
        for param in record.params() {
            let instance = match param {
                Param::Named(dependency) => self.resolve_in(dependency, ctx, Vec::new())?,
                Param::Instancer(target) => {
                    self.lookup(target)?;
                    Instance::new(Instancer {
                        name: target.clone(),
                        injector: Arc::downgrade(&self.inner),
                    })
                }
            };
            params.push(instance);
        }

        debug!("🔧 Создание {} ({} параметров, {} assisted)", record.name(), params.len(), assisted.len());
        instantiator.instantiate(record.name(), params, assisted)
    }

    fn lookup(&self, name: &str) -> Result<Arc<InjectableRecord>, InjectorError> {
        let registry = self.inner.registry.read();
        registry
            .records
            .get(name)
            .cloned()
            .ok_or_else(|| InjectorError::NotFound {
                name: name.to_string(),
                module_groups: registry.group_names(),
                container: self.inner.config.name.clone(),
            })
    }

    // === Граф и реестр ===

    /// Все injectables, от которых транзитивно зависит `name`
    pub fn descendants_of(&self, name: &str) -> Result<Vec<String>, InjectorError> {
        self.lookup(name)?;
        self.inner.graph.read().descendants_of(name)
    }

    /// Все injectables, транзитивно зависящие от `name`
    pub fn ancestors_of(&self, name: &str) -> Result<Vec<String>, InjectorError> {
        self.lookup(name)?;
        self.inner.graph.read().ancestors_of(name)
    }

    pub fn injectable(&self, name: &str) -> Option<Arc<InjectableRecord>> {
        self.inner.registry.read().records.get(name).cloned()
    }

    /// Имена всех записей, удовлетворяющих предикату, в порядке регистрации
    pub fn injectable_search<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&InjectableRecord) -> bool,
    {
        let registry = self.inner.registry.read();
        registry
            .groups
            .iter()
            .flat_map(|g| g.records())
            .filter(|r| predicate(r))
            .map(|r| r.name().to_string())
            .collect()
    }

    pub fn module_group_names(&self) -> Vec<String> {
        self.inner.registry.read().group_names()
    }

    pub fn injectable_count(&self) -> usize {
        self.inner.registry.read().records.len()
    }

    pub fn with_graph<R>(&self, f: impl FnOnce(&DependencyGraph) -> R) -> R {
        f(&self.inner.graph.read())
    }

    pub fn graph_stats(&self) -> DependencyGraphStats {
        self.inner.graph.read().stats()
    }

    // === Кэш и hooks ===

    /// Очистить кэш scope (для тестовых окружений)
    pub fn clear_scope(&self, scope: Scope) {
        self.inner.cache.clear(scope);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Установить resolution hook, вернуть предыдущий
    pub fn set_resolution_hook(&self, hook: Arc<dyn ResolutionHook>) -> Option<Arc<dyn ResolutionHook>> {
        self.inner.hook.write().replace(hook)
    }

    pub fn clear_resolution_hook(&self) -> Option<Arc<dyn ResolutionHook>> {
        self.inner.hook.write().take()
    }

    pub fn has_resolution_hook(&self) -> bool {
        self.inner.hook.read().is_some()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Injector")
            .field("name", &self.inner.config.name)
            .field("module_groups", &registry.group_names())
            .field("injectables", &registry.records.len())
            .finish()
    }
}

/// Builder пакетной регистрации module group
pub struct ModuleGroupBuilder<'a> {
    injector: &'a Injector,
    name: String,
    entries: Vec<(String, Subject)>,
}

impl<'a> ModuleGroupBuilder<'a> {
    pub fn with(mut self, name: impl Into<String>, subject: impl Into<Subject>) -> Self {
        self.entries.push((name.into(), subject.into()));
        self
    }

    /// Проверить и зарегистрировать все записи. При ошибке реестр не
    /// меняется, кроме `EagerInstantiation`: тогда группа уже добавлена.
    pub fn commit(self) -> Result<(), InjectorError> {
        self.injector.register_batch(&self.name, self.entries, false)
    }
}

/// Фабрика injectable, передаваемая конструктору вместо экземпляра.
///
/// Каждый вызов разрешает injectable заново в том же контейнере,
/// с собственными assisted аргументами.
#[derive(Clone)]
pub struct Instancer {
    name: String,
    injector: Weak<InjectorInner>,
}

impl Instancer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self, assisted: Vec<Instance>) -> Result<Instance, InjectorError> {
        let inner = self.injector.upgrade().ok_or_else(|| InjectorError::ContainerDropped {
            name: self.name.clone(),
        })?;
        Injector { inner }.get_instance_with(&self.name, assisted)
    }

    pub fn create<T>(&self, assisted: Vec<Instance>) -> Result<Arc<T>, InjectorError>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.instance(assisted)?.downcast::<T>()
    }
}

impl fmt::Debug for Instancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instancer").field("name", &self.name).finish()
    }
}
