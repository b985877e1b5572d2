// Tree model - raw parser output and the canonical list-per-field form

pub mod normalize;

pub use normalize::normalize;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A node as produced by the markup parser.
///
/// The shape is ambiguous: a field seen once holds its instance directly,
/// a field seen several times holds a `List` of instances.
#[derive(Debug, Clone, PartialEq)]
pub enum RawNode {
    Leaf(String),
    List(Vec<RawNode>),
    Map(Vec<(String, RawNode)>),
}

impl RawNode {
    /// An empty map, the parser's reading of an empty element.
    pub fn empty() -> Self {
        RawNode::Map(Vec::new())
    }

    /// Look up a named field of a map node.
    pub fn get(&self, name: &str) -> Option<&RawNode> {
        match self {
            RawNode::Map(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Remove and return a named field of a map node.
    pub fn take(&mut self, name: &str) -> Option<RawNode> {
        match self {
            RawNode::Map(fields) => {
                let pos = fields.iter().position(|(k, _)| k == name)?;
                Some(fields.remove(pos).1)
            }
            _ => None,
        }
    }
}

/// One occurrence of a named field in the canonical tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Instance {
    Leaf(String),
    Node(CanonicalNode),
}

impl Instance {
    pub fn leaf(value: impl Into<String>) -> Self {
        Instance::Leaf(value.into())
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Instance::Leaf(s) => Some(s),
            Instance::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&CanonicalNode> {
        match self {
            Instance::Node(n) => Some(n),
            Instance::Leaf(_) => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut CanonicalNode> {
        match self {
            Instance::Node(n) => Some(n),
            Instance::Leaf(_) => None,
        }
    }

    fn into_raw(self) -> RawNode {
        match self {
            Instance::Leaf(s) => RawNode::Leaf(s),
            Instance::Node(n) => n.into_raw(),
        }
    }
}

/// A named field and its instances in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub instances: Vec<Instance>,
}

/// A map of uniquely named fields, each holding an ordered list of instances.
///
/// Fields keep insertion order, which is document order for a loaded tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalNode {
    fields: Vec<Field>,
}

impl CanonicalNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&[Instance]> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.instances.as_slice())
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Vec<Instance>> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .map(|f| &mut f.instances)
    }

    /// Get the instance list of a field, appending an empty field if absent.
    pub fn ensure_field(&mut self, name: &str) -> &mut Vec<Instance> {
        let pos = match self.fields.iter().position(|f| f.name == name) {
            Some(pos) => pos,
            None => {
                self.fields.push(Field {
                    name: name.to_string(),
                    instances: Vec::new(),
                });
                self.fields.len() - 1
            }
        };
        &mut self.fields[pos].instances
    }

    /// Set a field's instances. An existing field keeps its position.
    pub fn insert_field(&mut self, name: impl Into<String>, instances: Vec<Instance>) {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.instances = instances,
            None => self.fields.push(Field { name, instances }),
        }
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Vec<Instance>> {
        let pos = self.fields.iter().position(|f| f.name == name)?;
        Some(self.fields.remove(pos).instances)
    }

    /// Convert back to the parser's shape: single instances unwrapped,
    /// repeated ones as lists, empty fields as empty lists.
    pub fn into_raw(self) -> RawNode {
        let fields = self
            .fields
            .into_iter()
            .map(|field| {
                let mut instances = field.instances;
                // A lone empty node must stay listed, or it would read back as no instances.
                let unwrap = instances.len() == 1
                    && !matches!(&instances[0], Instance::Node(n) if n.is_empty());
                let raw = if unwrap {
                    instances.remove(0).into_raw()
                } else {
                    RawNode::List(instances.into_iter().map(Instance::into_raw).collect())
                };
                (field.name, raw)
            })
            .collect();
        RawNode::Map(fields)
    }
}

impl Serialize for CanonicalNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &Instances(&field.instances))?;
        }
        map.end()
    }
}

struct Instances<'a>(&'a [Instance]);

impl Serialize for Instances<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for instance in self.0 {
            seq.serialize_element(instance)?;
        }
        seq.end()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Instance::Leaf(s) => serializer.serialize_str(s),
            Instance::Node(n) => n.serialize(serializer),
        }
    }
}
