use crate::tree::Instance;

/// Position of a matching occurrence: the entry within the collection and
/// the slot within that entry's key field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub entry: usize,
    pub slot: usize,
}

/// Find the first entry of `collection` whose field `field_name` holds the
/// scalar `value`. Only the entries' own fields are inspected; leaf entries
/// and non-scalar field instances never match.
pub fn locate(collection: &[Instance], field_name: &str, value: &str) -> Option<Location> {
    collection.iter().enumerate().find_map(|(entry, instance)| {
        let slots = instance.as_node()?.field(field_name)?;
        slots
            .iter()
            .position(|slot| slot.as_leaf() == Some(value))
            .map(|slot| Location { entry, slot })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::CanonicalNode;

    fn entry(field: &str, values: &[&str]) -> Instance {
        let mut node = CanonicalNode::new();
        node.insert_field(field, values.iter().map(|v| Instance::leaf(*v)).collect());
        Instance::Node(node)
    }

    #[test]
    fn test_locate_found() {
        let collection = vec![
            entry("path", &["a.obj"]),
            entry("path", &["b.obj"]),
            entry("path", &["c.obj"]),
        ];
        assert_eq!(
            locate(&collection, "path", "b.obj"),
            Some(Location { entry: 1, slot: 0 })
        );
    }

    #[test]
    fn test_locate_reports_slot() {
        let collection = vec![entry("path", &["x", "y", "z"])];
        assert_eq!(
            locate(&collection, "path", "z"),
            Some(Location { entry: 0, slot: 2 })
        );
    }

    #[test]
    fn test_first_match_wins() {
        let collection = vec![
            entry("name", &["dup"]),
            entry("path", &["dup"]),
            entry("path", &["dup"]),
        ];
        assert_eq!(
            locate(&collection, "path", "dup"),
            Some(Location { entry: 1, slot: 0 })
        );
    }

    #[test]
    fn test_not_found() {
        let collection = vec![entry("path", &["a.obj"]), Instance::leaf("b.obj")];
        assert_eq!(locate(&collection, "path", "b.obj"), None);
        assert_eq!(locate(&[], "path", "a.obj"), None);
    }

    #[test]
    fn test_does_not_descend_into_nested_values() {
        let mut inner = CanonicalNode::new();
        inner.insert_field("path", vec![Instance::leaf("deep.obj")]);
        let mut outer = CanonicalNode::new();
        outer.insert_field("path", vec![Instance::Node(inner)]);

        assert_eq!(locate(&[Instance::Node(outer)], "path", "deep.obj"), None);
    }
}
