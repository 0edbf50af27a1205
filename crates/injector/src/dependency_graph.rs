//! Dependency Graph - граф module groups, injectables и их параметров
//!
//! Вершины двух видов (module group, injectable), рёбра двух видов
//! (membership в группе, зависимость от параметра). Создание вершин и рёбер
//! идемпотентно. Вершина параметра может появиться раньше, чем
//! зарегистрирован injectable с таким именем: до регистрации она "unbacked",
//! и обход графа через неё завершается ошибкой.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::errors::InjectorError;
use crate::injectable::InjectableRecord;

pub type VertexId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    ModuleGroup,
    Injectable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
    /// module group -> injectable
    GroupMember,
    /// injectable -> injectable, от которого он зависит
    InjectableParam,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    id: VertexId,
    kind: VertexKind,
    name: String,
    record: Option<Arc<InjectableRecord>>,
}

impl Vertex {
    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn kind(&self) -> VertexKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record(&self) -> Option<&Arc<InjectableRecord>> {
        self.record.as_ref()
    }

    pub fn is_backed(&self) -> bool {
        self.kind == VertexKind::ModuleGroup || self.record.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub out: VertexId,
    pub into: VertexId,
    pub label: EdgeLabel,
}

/// Результат добавления injectable в группу
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupAssociation {
    pub group: VertexId,
    pub injectable: VertexId,
    pub edge: EdgeId,
}

/// Результат добавления зависимости injectable -> параметр
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamAssociation {
    pub injectable: VertexId,
    pub param: VertexId,
    pub edge: EdgeId,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    vertices: Vec<Vertex>,
    vertex_index: HashMap<(VertexKind, String), VertexId>,
    edges: Vec<Edge>,
    edge_index: HashMap<(VertexId, VertexId, EdgeLabel), EdgeId>,
    /// Исходящие рёбра вершины
    outgoing: HashMap<VertexId, Vec<EdgeId>>,
    /// Входящие рёбра вершины
    incoming: HashMap<VertexId, Vec<EdgeId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_vertex(&self, kind: VertexKind, name: &str) -> Option<&Vertex> {
        self.vertex_index
            .get(&(kind, name.to_string()))
            .map(|&id| &self.vertices[id])
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn find_or_create_vertex(&mut self, kind: VertexKind, name: &str) -> VertexId {
        let key = (kind, name.to_string());
        if let Some(&id) = self.vertex_index.get(&key) {
            return id;
        }

        let id = self.vertices.len();
        self.vertices.push(Vertex {
            id,
            kind,
            name: name.to_string(),
            record: None,
        });
        self.vertex_index.insert(key, id);
        debug!("🔗 Вершина графа создана: {:?} {}", kind, name);
        id
    }

    pub fn find_or_create_edge(&mut self, out: VertexId, into: VertexId, label: EdgeLabel) -> EdgeId {
        if let Some(&id) = self.edge_index.get(&(out, into, label)) {
            return id;
        }

        let id = self.edges.len();
        self.edges.push(Edge { id, out, into, label });
        self.edge_index.insert((out, into, label), id);
        self.outgoing.entry(out).or_default().push(id);
        self.incoming.entry(into).or_default().push(id);

        debug!(
            "🔗 Добавлено ребро {:?}: {} -> {}",
            label, self.vertices[out].name, self.vertices[into].name
        );
        id
    }

    /// Добавить injectable в module group, привязав вершину к записи
    pub fn associate_injectable_with_module_group(
        &mut self,
        group: &str,
        record: Arc<InjectableRecord>,
    ) -> GroupAssociation {
        let group_id = self.find_or_create_vertex(VertexKind::ModuleGroup, group);
        let injectable_id = self.find_or_create_vertex(VertexKind::Injectable, record.name());
        self.vertices[injectable_id].record = Some(record);
        let edge = self.find_or_create_edge(group_id, injectable_id, EdgeLabel::GroupMember);

        GroupAssociation {
            group: group_id,
            injectable: injectable_id,
            edge,
        }
    }

    /// Добавить зависимость injectable от параметра.
    /// Вершина параметра создаётся без записи, если её ещё нет.
    pub fn associate_parameter_with_injectable(&mut self, injectable: &str, param: &str) -> ParamAssociation {
        let injectable_id = self.find_or_create_vertex(VertexKind::Injectable, injectable);
        let param_id = self.find_or_create_vertex(VertexKind::Injectable, param);
        let edge = self.find_or_create_edge(injectable_id, param_id, EdgeLabel::InjectableParam);

        ParamAssociation {
            injectable: injectable_id,
            param: param_id,
            edge,
        }
    }

    /// Все injectables, от которых транзитивно зависит `name`
    pub fn descendants_of(&self, name: &str) -> Result<Vec<String>, InjectorError> {
        self.closure(name, Direction::Outgoing)
    }

    /// Все injectables, которые транзитивно зависят от `name`
    pub fn ancestors_of(&self, name: &str) -> Result<Vec<String>, InjectorError> {
        self.closure(name, Direction::Incoming)
    }

    /// BFS по рёбрам InjectableParam. Стартовая вершина попадает в результат
    /// только если достижима через цикл.
    fn closure(&self, name: &str, direction: Direction) -> Result<Vec<String>, InjectorError> {
        let start = self
            .find_vertex(VertexKind::Injectable, name)
            .ok_or_else(|| InjectorError::NotFound {
                name: name.to_string(),
                module_groups: self.module_group_names(),
                container: "dependency graph".to_string(),
            })?;

        let mut visited: HashSet<VertexId> = HashSet::new();
        let mut queue = VecDeque::from([start.id]);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current, direction) {
                if !visited.insert(next) {
                    continue;
                }

                let vertex = &self.vertices[next];
                if !vertex.is_backed() {
                    return Err(InjectorError::UnbackedVertex {
                        name: vertex.name.clone(),
                    });
                }

                result.push(vertex.name.clone());
                queue.push_back(next);
            }
        }

        Ok(result)
    }

    fn neighbours(&self, id: VertexId, direction: Direction) -> impl Iterator<Item = VertexId> + '_ {
        let edges = match direction {
            Direction::Outgoing => self.outgoing.get(&id),
            Direction::Incoming => self.incoming.get(&id),
        };

        edges
            .into_iter()
            .flatten()
            .map(|&edge_id| &self.edges[edge_id])
            .filter(|edge| edge.label == EdgeLabel::InjectableParam)
            .map(move |edge| match direction {
                Direction::Outgoing => edge.into,
                Direction::Incoming => edge.out,
            })
    }

    pub fn module_group_names(&self) -> Vec<String> {
        self.vertices
            .iter()
            .filter(|v| v.kind == VertexKind::ModuleGroup)
            .map(|v| v.name.clone())
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Получить статистику графа
    pub fn stats(&self) -> DependencyGraphStats {
        let mut stats = DependencyGraphStats::default();

        for vertex in &self.vertices {
            match (vertex.kind, vertex.is_backed()) {
                (VertexKind::ModuleGroup, _) => stats.module_groups += 1,
                (VertexKind::Injectable, true) => stats.injectables += 1,
                (VertexKind::Injectable, false) => stats.unbacked_injectables += 1,
            }

            if vertex.kind == VertexKind::Injectable {
                let fan_out = self.neighbours(vertex.id, Direction::Outgoing).count();
                if fan_out > stats.max_fan_out {
                    stats.max_fan_out = fan_out;
                    stats.most_dependent = Some(vertex.name.clone());
                }
            }
        }

        for edge in &self.edges {
            match edge.label {
                EdgeLabel::GroupMember => stats.memberships += 1,
                EdgeLabel::InjectableParam => stats.dependencies += 1,
            }
        }

        stats
    }
}

/// Статистика графа зависимостей
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraphStats {
    pub module_groups: usize,
    pub injectables: usize,
    pub unbacked_injectables: usize,
    pub memberships: usize,
    pub dependencies: usize,
    pub max_fan_out: usize,
    pub most_dependent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Subject;

    fn record(name: &str) -> Arc<InjectableRecord> {
        Arc::new(InjectableRecord::new(name, Subject::value(0u8)).unwrap())
    }

    fn graph_with(group: &str, edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (from, to) in edges {
            graph.associate_injectable_with_module_group(group, record(from));
            graph.associate_injectable_with_module_group(group, record(to));
            graph.associate_parameter_with_injectable(from, to);
        }
        graph
    }

    #[test]
    fn test_vertex_and_edge_creation_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let first = graph.associate_injectable_with_module_group("g", record("a"));
        let second = graph.associate_injectable_with_module_group("g", record("a"));
        assert_eq!(first, second);

        let p1 = graph.associate_parameter_with_injectable("a", "b");
        let p2 = graph.associate_parameter_with_injectable("a", "b");
        assert_eq!(p1, p2);

        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_descendants_and_ancestors() {
        let graph = graph_with("g", &[("a", "b"), ("b", "c"), ("a", "d")]);

        assert_eq!(graph.descendants_of("a").unwrap(), vec!["b", "d", "c"]);
        assert_eq!(graph.ancestors_of("c").unwrap(), vec!["b", "a"]);
        assert!(graph.descendants_of("c").unwrap().is_empty());
    }

    #[test]
    fn test_cycle_terminates_and_includes_start() {
        let graph = graph_with("g", &[("a", "b"), ("b", "a")]);
        assert_eq!(graph.descendants_of("a").unwrap(), vec!["b", "a"]);
    }

    #[test]
    fn test_unbacked_vertex_fails_traversal() {
        let mut graph = DependencyGraph::new();
        graph.associate_injectable_with_module_group("g", record("a"));
        graph.associate_parameter_with_injectable("a", "missing");

        match graph.descendants_of("a") {
            Err(InjectorError::UnbackedVertex { name }) => assert_eq!(name, "missing"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parameter_becomes_backed_after_registration() {
        let mut graph = DependencyGraph::new();
        graph.associate_injectable_with_module_group("g", record("a"));
        graph.associate_parameter_with_injectable("a", "later");
        graph.associate_injectable_with_module_group("g", record("later"));

        assert_eq!(graph.descendants_of("a").unwrap(), vec!["later"]);
    }

    #[test]
    fn test_unknown_start_is_not_found() {
        let graph = graph_with("infra", &[("a", "b")]);
        match graph.ancestors_of("zzz") {
            Err(InjectorError::NotFound { module_groups, .. }) => {
                assert_eq!(module_groups, vec!["infra"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_stats() {
        let mut graph = graph_with("g", &[("a", "b"), ("a", "c")]);
        graph.associate_parameter_with_injectable("c", "pending");

        let stats = graph.stats();
        assert_eq!(stats.module_groups, 1);
        assert_eq!(stats.injectables, 3);
        assert_eq!(stats.unbacked_injectables, 1);
        assert_eq!(stats.memberships, 3);
        assert_eq!(stats.dependencies, 3);
        assert_eq!(stats.max_fan_out, 2);
        assert_eq!(stats.most_dependent.as_deref(), Some("a"));
    }
}
