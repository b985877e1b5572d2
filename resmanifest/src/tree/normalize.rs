use super::{CanonicalNode, Instance, RawNode};

/// Rewrite a raw parsed tree so that every named field, at every depth,
/// holds an ordered list of instances.
///
/// A leaf or a non-empty map is wrapped as a single instance. A list keeps
/// its instances in order. An empty map has no named fields and is read as
/// an empty list, so `<x/>` yields a present field with zero instances.
///
/// Only a map can be the top of a canonical tree; any other node yields an
/// empty tree.
pub fn normalize(raw: RawNode) -> CanonicalNode {
    match raw {
        RawNode::Map(fields) => normalize_map(fields),
        other => {
            log::warn!("Top-level node is not a map ({}), using an empty tree", shape(&other));
            CanonicalNode::new()
        }
    }
}

fn normalize_map(fields: Vec<(String, RawNode)>) -> CanonicalNode {
    let mut node = CanonicalNode::new();
    for (name, value) in fields {
        let instances = match value {
            RawNode::List(items) => {
                let mut instances = Vec::with_capacity(items.len());
                push_items(items, &mut instances);
                instances
            }
            RawNode::Map(inner) if inner.is_empty() => Vec::new(),
            RawNode::Map(inner) => vec![Instance::Node(normalize_map(inner))],
            RawNode::Leaf(s) => vec![Instance::Leaf(s)],
        };
        // Later duplicates of a name extend the first occurrence.
        node.ensure_field(&name).extend(instances);
    }
    node
}

fn push_items(items: Vec<RawNode>, out: &mut Vec<Instance>) {
    for item in items {
        match item {
            RawNode::Leaf(s) => out.push(Instance::Leaf(s)),
            RawNode::Map(inner) => out.push(Instance::Node(normalize_map(inner))),
            // A list directly inside a list carries no name of its own.
            RawNode::List(nested) => push_items(nested, out),
        }
    }
}

fn shape(node: &RawNode) -> &'static str {
    match node {
        RawNode::Leaf(_) => "leaf",
        RawNode::List(_) => "list",
        RawNode::Map(_) => "map",
    }
}
