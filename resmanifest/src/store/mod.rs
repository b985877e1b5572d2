use crate::config::StoreConfig;
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::document::{self, xml};
use crate::error::{ManifestError, Result};
use crate::index;
use crate::tree::{normalize, CanonicalNode, Instance, RawNode};
use std::io::Write;
use std::path::Path;

const MEMORY_SOURCE: &str = "<memory>";

/// Whether the store holds a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Freshly constructed, or after a failed load
    Empty,
    /// Holds a canonical tree, possibly an empty one
    Loaded,
}

/// An in-memory resource manifest.
///
/// Holds the canonical tree of one document and edits the keyed entries of
/// the collections found under the container element
/// (`<root>/<container>/<collection>[]/<key_field>`). Every failure is
/// returned and also handed to the store's diagnostic sink.
pub struct ResourceStore<S: DiagnosticSink = LogSink> {
    config: StoreConfig,
    tree: CanonicalNode,
    state: StoreState,
    sink: S,
}

impl ResourceStore<LogSink> {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_sink(config, LogSink)
    }
}

impl Default for ResourceStore<LogSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: DiagnosticSink> ResourceStore<S> {
    pub fn with_sink(config: StoreConfig, sink: S) -> Self {
        ResourceStore {
            config,
            tree: CanonicalNode::new(),
            state: StoreState::Empty,
            sink,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn state(&self) -> StoreState {
        self.state
    }

    /// The canonical tree below the root element.
    pub fn tree(&self) -> &CanonicalNode {
        &self.tree
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ── Load / save ────────────────────────────────────────────────

    /// Load a manifest file, replacing the current tree.
    /// On failure the store is left Empty.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source_name = path.display().to_string();
        let outcome = std::fs::read(path)
            .map_err(|e| ManifestError::io(source_name.as_str(), e))
            .and_then(|bytes| self.read_document(&bytes, &source_name));
        self.finish_load(outcome)
    }

    /// Load a manifest from text, replacing the current tree.
    pub fn load_str(&mut self, text: &str) -> Result<()> {
        let outcome = self.read_document(text.as_bytes(), MEMORY_SOURCE);
        self.finish_load(outcome)
    }

    fn read_document(&self, bytes: &[u8], source_name: &str) -> Result<CanonicalNode> {
        if bytes.is_empty() {
            return Err(ManifestError::EmptyDocument {
                source_name: source_name.to_string(),
            });
        }

        let text = std::str::from_utf8(bytes).map_err(|e| ManifestError::ParseFailure {
            source_name: source_name.to_string(),
            reason: format!("invalid UTF-8: {e}"),
        })?;

        let mut raw = xml::parse(text, source_name)?.ok_or_else(|| {
            ManifestError::ParseFailure {
                source_name: source_name.to_string(),
                reason: "no elements found".into(),
            }
        })?;

        let root = raw
            .take(&self.config.root_tag)
            .ok_or_else(|| ManifestError::MissingRoot {
                root: self.config.root_tag.clone(),
                source_name: source_name.to_string(),
            })?;

        let root = match root {
            RawNode::List(items) => {
                log::warn!(
                    "{source_name} has {} <{}> elements, using the first",
                    items.len(),
                    self.config.root_tag
                );
                items.into_iter().next().unwrap_or_else(RawNode::empty)
            }
            other => other,
        };

        Ok(normalize(root))
    }

    fn finish_load(&mut self, outcome: Result<CanonicalNode>) -> Result<()> {
        match outcome {
            Ok(tree) => {
                log::debug!("Loaded manifest with {} top-level fields", tree.len());
                self.tree = tree;
                self.state = StoreState::Loaded;
                Ok(())
            }
            Err(e) => {
                self.tree = CanonicalNode::new();
                self.state = StoreState::Empty;
                Err(self.report(e))
            }
        }
    }

    /// Write the current tree to `path`, truncating it.
    ///
    /// Fields that cannot be written (see [`document::to_document`]) are
    /// reported to the sink and left out; everything else is still saved.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let outcome = self.render().and_then(|text| {
            let mut file = std::fs::File::create(path)
                .map_err(|e| ManifestError::io(path.display().to_string(), e))?;
            file.write_all(text.as_bytes())
                .map_err(|e| ManifestError::io(path.display().to_string(), e))
        });
        self.finish(outcome)
    }

    /// Render the current tree as the text `save` would write.
    pub fn to_xml_string(&mut self) -> Result<String> {
        let outcome = self.render();
        self.finish(outcome)
    }

    fn render(&mut self) -> Result<String> {
        let conversion = document::to_document(&self.tree, Some(self.config.root_tag.as_str()));
        if let Some(e) = &conversion.error {
            log::warn!("Writing partial manifest: {e}");
            self.sink.report(e);
        }
        xml::serialize(&conversion.forest)
    }

    // ── Entries ────────────────────────────────────────────────────

    /// Append an entry keyed by `key` to `collection`.
    /// Fails with DuplicateResource if the key is already present.
    pub fn add_entry(&mut self, collection: &str, key: &str) -> Result<()> {
        let outcome = self.try_add_entry(collection, key);
        self.finish(outcome)
    }

    fn try_add_entry(&mut self, collection: &str, key: &str) -> Result<()> {
        self.check_container()?;
        if self.contains_entry(collection, key) {
            return Err(ManifestError::DuplicateResource {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }

        let mut entry = CanonicalNode::new();
        entry.insert_field(self.config.key_field.clone(), vec![Instance::leaf(key)]);
        self.collection_mut(collection)?.push(Instance::Node(entry));
        self.state = StoreState::Loaded;

        log::debug!("Added {collection}/{key}");
        Ok(())
    }

    /// Remove the entry keyed by `key` from `collection`, keeping the order
    /// of the rest. Fails with NotFound if the key is absent.
    pub fn remove_entry(&mut self, collection: &str, key: &str) -> Result<()> {
        let outcome = self.try_remove_entry(collection, key);
        self.finish(outcome)
    }

    fn try_remove_entry(&mut self, collection: &str, key: &str) -> Result<()> {
        self.check_container()?;
        let location = self
            .collection(collection)
            .and_then(|entries| index::locate(entries, &self.config.key_field, key))
            .ok_or_else(|| ManifestError::NotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            })?;

        self.collection_mut(collection)?.remove(location.entry);
        self.state = StoreState::Loaded;

        log::debug!("Removed {collection}/{key}");
        Ok(())
    }

    /// Fail if the container holds text where collections belong.
    fn check_container(&self) -> Result<()> {
        match self.tree.field(&self.config.container).and_then(|c| c.first()) {
            Some(Instance::Leaf(_)) => Err(ManifestError::Corruption {
                field: self.config.container.clone(),
                reason: "expected a container element, found text".into(),
            }),
            _ => Ok(()),
        }
    }

    /// Get the entries of a collection, creating the container and the
    /// collection when absent.
    fn collection_mut(&mut self, collection: &str) -> Result<&mut Vec<Instance>> {
        let containers = self.tree.ensure_field(&self.config.container);
        if containers.is_empty() {
            containers.push(Instance::Node(CanonicalNode::new()));
        } else if containers.len() > 1 {
            log::warn!(
                "Found {} <{}> elements, using the first",
                containers.len(),
                self.config.container
            );
        }

        match &mut containers[0] {
            Instance::Node(container) => Ok(container.ensure_field(collection)),
            Instance::Leaf(_) => Err(ManifestError::Corruption {
                field: self.config.container.clone(),
                reason: "expected a container element, found text".into(),
            }),
        }
    }

    fn container(&self) -> Option<&CanonicalNode> {
        self.tree
            .field(&self.config.container)?
            .first()?
            .as_node()
    }

    /// The entries of a collection, if it exists.
    pub fn collection(&self, collection: &str) -> Option<&[Instance]> {
        self.container()?.field(collection)
    }

    /// Names of the collections under the container, in document order.
    pub fn collection_names(&self) -> Vec<String> {
        self.container()
            .map(|c| c.fields().iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Key values of a collection's entries, in order. Entries without a
    /// scalar key are skipped.
    pub fn entries(&self, collection: &str) -> Vec<String> {
        let key_field = &self.config.key_field;
        self.collection(collection)
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| {
                entry
                    .as_node()?
                    .field(key_field)?
                    .iter()
                    .find_map(Instance::as_leaf)
                    .map(str::to_string)
            })
            .collect()
    }

    pub fn contains_entry(&self, collection: &str, key: &str) -> bool {
        self.collection(collection)
            .map(|entries| index::locate(entries, &self.config.key_field, key).is_some())
            .unwrap_or(false)
    }

    // ── Reporting ──────────────────────────────────────────────────

    fn report(&mut self, error: ManifestError) -> ManifestError {
        self.sink.report(&error);
        error
    }

    fn finish<T>(&mut self, outcome: Result<T>) -> Result<T> {
        outcome.map_err(|e| self.report(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE: &str = "<manifest>
    <resources>
        <meshes>
            <path>a.obj</path>
        </meshes>
    </resources>
</manifest>
";

    fn test_store() -> ResourceStore<MemorySink> {
        ResourceStore::with_sink(StoreConfig::default(), MemorySink::new())
    }

    fn loaded_store(text: &str) -> ResourceStore<MemorySink> {
        let mut store = test_store();
        store.load_str(text).unwrap();
        store
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = test_store();
        assert_eq!(store.state(), StoreState::Empty);
        assert!(store.tree().is_empty());
        assert!(store.collection_names().is_empty());
    }

    #[test]
    fn test_load_sample() {
        let store = loaded_store(SAMPLE);
        assert_eq!(store.state(), StoreState::Loaded);
        assert_eq!(store.collection_names(), vec!["meshes"]);
        assert_eq!(store.entries("meshes"), vec!["a.obj"]);
        assert!(store.contains_entry("meshes", "a.obj"));
        assert!(!store.contains_entry("meshes", "b.obj"));
    }

    #[test]
    fn test_end_to_end_example() {
        let mut store = loaded_store(SAMPLE);
        assert_eq!(store.collection("meshes").unwrap().len(), 1);

        store.add_entry("meshes", "b.obj").unwrap();
        assert_eq!(store.collection("meshes").unwrap().len(), 2);

        let err = store.add_entry("meshes", "a.obj").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateResource);
        assert_eq!(store.collection("meshes").unwrap().len(), 2);

        store.remove_entry("meshes", "a.obj").unwrap();
        assert_eq!(store.entries("meshes"), vec!["b.obj"]);

        assert_eq!(store.sink().kinds(), vec![ErrorKind::DuplicateResource]);
    }

    #[test]
    fn test_add_appends_at_end() {
        let mut store = loaded_store(SAMPLE);
        store.add_entry("meshes", "c.obj").unwrap();
        store.add_entry("meshes", "b.obj").unwrap();
        assert_eq!(store.entries("meshes"), vec!["a.obj", "c.obj", "b.obj"]);
    }

    #[test]
    fn test_add_on_empty_store_creates_scaffold() {
        let mut store = test_store();
        store.add_entry("textures", "a.png").unwrap();

        assert_eq!(store.state(), StoreState::Loaded);
        assert_eq!(store.collection_names(), vec!["textures"]);
        assert_eq!(store.entries("textures"), vec!["a.png"]);
        assert_eq!(
            store.to_xml_string().unwrap(),
            "<manifest>\n    <resources>\n        <textures>\n            <path>a.png</path>\n        </textures>\n    </resources>\n</manifest>\n"
        );
    }

    #[test]
    fn test_add_new_collection_beside_existing() {
        let mut store = loaded_store(SAMPLE);
        store.add_entry("sounds", "hit.wav").unwrap();
        assert_eq!(store.collection_names(), vec!["meshes", "sounds"]);
        assert_eq!(store.entries("meshes"), vec!["a.obj"]);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut store = test_store();
        for key in ["a", "b", "c", "d"] {
            store.add_entry("meshes", key).unwrap();
        }
        store.remove_entry("meshes", "b").unwrap();
        assert_eq!(store.entries("meshes"), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut store = loaded_store(SAMPLE);
        let err = store.remove_entry("meshes", "zzz.obj").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.entries("meshes"), vec!["a.obj"]);
        assert_eq!(store.sink().last_kind(), Some(ErrorKind::NotFound));
    }

    #[test]
    fn test_remove_on_empty_store_stays_empty() {
        let mut store = test_store();
        let err = store.remove_entry("meshes", "a.obj").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.state(), StoreState::Empty);
        assert!(store.tree().is_empty());
    }

    #[test]
    fn test_failed_edits_leave_tree_untouched() {
        let mut store = loaded_store(SAMPLE);
        let before = store.tree().clone();

        store.remove_entry("sounds", "hit.wav").unwrap_err();
        store.add_entry("meshes", "a.obj").unwrap_err();

        assert_eq!(store.tree(), &before);
        assert_eq!(store.collection_names(), vec!["meshes"]);
        assert_eq!(
            store.sink().kinds(),
            vec![ErrorKind::NotFound, ErrorKind::DuplicateResource]
        );
    }

    #[test]
    fn test_add_on_text_container_leaves_tree_untouched() {
        let mut store = loaded_store("<manifest><resources>oops</resources></manifest>");
        let before = store.tree().clone();
        store.add_entry("meshes", "a.obj").unwrap_err();
        store.remove_entry("meshes", "a.obj").unwrap_err();
        assert_eq!(store.tree(), &before);
    }

    #[test]
    fn test_entries_in_empty_container() {
        let store = loaded_store("<manifest><resources/></manifest>");
        assert_eq!(store.tree().field("resources"), Some(&[][..]));
        assert!(store.entries("meshes").is_empty());
    }

    #[test]
    fn test_add_under_text_container_is_corruption() {
        let mut store = loaded_store("<manifest><resources>oops</resources></manifest>");
        let err = store.add_entry("meshes", "a.obj").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
    }

    #[test]
    fn test_custom_key_field_and_container() {
        let config = StoreConfig {
            root_tag: "pack".into(),
            container: "files".into(),
            key_field: "name".into(),
        };
        let mut store = ResourceStore::with_sink(config, MemorySink::new());
        store
            .load_str("<pack><files><fonts><name>mono.ttf</name></fonts></files></pack>")
            .unwrap();
        store.add_entry("fonts", "sans.ttf").unwrap();
        assert_eq!(store.entries("fonts"), vec!["mono.ttf", "sans.ttf"]);
    }

    #[test]
    fn test_load_empty_document() {
        let mut store = test_store();
        let err = store.load_str("").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDocument);
        assert_eq!(store.state(), StoreState::Empty);
        assert_eq!(store.sink().kinds(), vec![ErrorKind::EmptyDocument]);
    }

    #[test]
    fn test_load_missing_root() {
        let mut store = test_store();
        let err = store.load_str("<other><a>1</a></other>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRoot);
        assert_eq!(store.state(), StoreState::Empty);
    }

    #[test]
    fn test_load_no_elements_is_parse_failure() {
        let mut store = test_store();
        let err = store.load_str("   \n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_failed_load_discards_previous_tree() {
        let mut store = loaded_store(SAMPLE);
        let err = store.load_str("<manifest><a></manifest>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert_eq!(store.state(), StoreState::Empty);
        assert!(store.tree().is_empty());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut store = test_store();
        let err = store.load(tmp.path().join("missing.xml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.state(), StoreState::Empty);
    }

    #[test]
    fn test_load_zero_length_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.xml");
        std::fs::write(&path, "").unwrap();

        let mut store = test_store();
        let err = store.load(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyDocument);
    }

    #[test]
    fn test_load_bare_root() {
        let store = loaded_store("<manifest/>");
        assert_eq!(store.state(), StoreState::Loaded);
        assert!(store.tree().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resources.xml");

        let mut store = loaded_store(
            "<manifest>
                <version>3</version>
                <resources>
                    <meshes><path>a.obj</path></meshes>
                    <meshes><path>b.obj</path><lod>2</lod></meshes>
                    <textures><path>t.png</path></textures>
                </resources>
            </manifest>",
        );
        store.add_entry("textures", "u.png").unwrap();
        store.save(&path).unwrap();

        let mut reloaded = test_store();
        reloaded.load(&path).unwrap();
        assert_eq!(reloaded.tree(), store.tree());
        assert_eq!(reloaded.entries("textures"), vec!["t.png", "u.png"]);
    }

    #[test]
    fn test_non_ascii_collection_survives_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resources.xml");

        let mut store = loaded_store(
            "<manifest><resources><données><path>a.obj</path></données></resources></manifest>",
        );
        store.add_entry("données", "b.obj").unwrap();
        store.save(&path).unwrap();
        assert!(store.sink().reports.is_empty());

        let mut reloaded = test_store();
        reloaded.load(&path).unwrap();
        assert_eq!(reloaded.tree(), store.tree());
        assert_eq!(reloaded.entries("données"), vec!["a.obj", "b.obj"]);
    }

    #[test]
    fn test_padded_key_survives_save() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resources.xml");

        let mut store = loaded_store(SAMPLE);
        store.add_entry("meshes", "  padded.obj ").unwrap();
        store.save(&path).unwrap();

        let mut reloaded = test_store();
        reloaded.load(&path).unwrap();
        assert_eq!(reloaded.tree(), store.tree());
        assert_eq!(reloaded.entries("meshes"), vec!["a.obj", "  padded.obj "]);

        reloaded.remove_entry("meshes", "  padded.obj ").unwrap();
        assert_eq!(reloaded.entries("meshes"), vec!["a.obj"]);
    }

    #[test]
    fn test_save_sample_is_stable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resources.xml");

        let mut store = loaded_store(SAMPLE);
        store.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_save_truncates_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resources.xml");
        std::fs::write(&path, "x".repeat(4096)).unwrap();

        let mut store = test_store();
        store.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<manifest/>\n");
    }

    #[test]
    fn test_save_to_unopenable_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("no-such-dir").join("resources.xml");

        let mut store = loaded_store(SAMPLE);
        let err = store.save(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(store.sink().last_kind(), Some(ErrorKind::Io));
    }

    #[test]
    fn test_save_writes_partial_tree_on_corruption() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resources.xml");

        let mut store = loaded_store(SAMPLE);
        store.tree.insert_field("42", vec![Instance::leaf("bad")]);
        store.save(&path).unwrap();

        assert_eq!(store.sink().kinds(), vec![ErrorKind::Corruption]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), SAMPLE);
    }
}
