use std::collections::HashMap;
use std::sync::Arc;

use crate::injectable::InjectableRecord;

/// Именованная группа injectables, порядок регистрации сохраняется
#[derive(Debug, Default)]
pub struct ModuleGroup {
    name: String,
    records: Vec<Arc<InjectableRecord>>,
    index: HashMap<String, usize>,
}

impl ModuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Уникальность имён проверяет контейнер до вызова
    pub(crate) fn push(&mut self, record: Arc<InjectableRecord>) {
        self.index.insert(record.name().to_string(), self.records.len());
        self.records.push(record);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<InjectableRecord>> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<InjectableRecord>> {
        self.records.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Subject;

    #[test]
    fn test_registration_order_is_kept() {
        let mut group = ModuleGroup::new("infrastructure");
        for name in ["clock", "storage", "network"] {
            group.push(Arc::new(InjectableRecord::new(name, Subject::value(0u8)).unwrap()));
        }

        assert_eq!(group.names().collect::<Vec<_>>(), vec!["clock", "storage", "network"]);
        assert!(group.contains("storage"));
        assert_eq!(group.get("network").map(|r| r.name()), Some("network"));
        assert!(group.get("missing").is_none());
        assert_eq!(group.len(), 3);
    }
}
