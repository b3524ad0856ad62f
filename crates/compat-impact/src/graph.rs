use compat_protobuf::Registry;
use prost_types::field_descriptor_proto::Type;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{trace, warn};

/// Edges from a referenced message to the messages referencing it
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependents: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build the reverse graph from every message field of `registry` that
    /// references another message by fully-qualified name.
    ///
    /// References that cannot be resolved contribute no edge.
    pub fn build(registry: &Registry) -> Self {
        let mut graph = Self::default();
        for message in registry.all_messages() {
            for field in message.fields() {
                let proto = field.field_descriptor_proto();
                if !matches!(proto.r#type(), Type::Message | Type::Group) {
                    continue;
                }
                let Some(referenced) = proto.type_name().strip_prefix('.') else {
                    trace!(field = field.full_name(), "skipping relative type reference");
                    continue;
                };
                if registry.message(referenced).is_none() {
                    warn!(
                        field = field.full_name(),
                        referenced, "referenced message not found, no impact edge"
                    );
                    continue;
                }
                graph.add_edge(referenced, message.full_name());
            }
        }
        graph
    }

    /// Record that `referencing` holds a field of type `referenced`
    pub fn add_edge(&mut self, referenced: &str, referencing: &str) {
        self.dependents
            .entry(referenced.to_string())
            .or_default()
            .insert(referencing.to_string());
    }

    /// Direct dependents of `name`
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> + '_ {
        self.dependents
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Every type reachable from `start` over dependent edges, `start`
    /// included, sorted by name
    pub fn impacted_by(&self, start: &str) -> Vec<String> {
        let mut visited = BTreeSet::from([start.to_string()]);
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(name) = queue.pop_front() {
            for dependent in self.dependents(&name) {
                if visited.insert(dependent.to_string()) {
                    queue.push_back(dependent.to_string());
                }
            }
        }
        visited.into_iter().collect()
    }
}
