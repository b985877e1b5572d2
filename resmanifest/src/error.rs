use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Document is empty: {source_name}")]
    EmptyDocument { source_name: String },

    #[error("Failed to parse {source_name}: {reason}")]
    ParseFailure { source_name: String, reason: String },

    #[error("Root element <{root}> not found in {source_name}")]
    MissingRoot { root: String, source_name: String },

    #[error("Corrupt tree at field '{field}': {reason}")]
    Corruption { field: String, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Resource already exists: {collection}/{key}")]
    DuplicateResource { collection: String, key: String },

    #[error("Resource not found: {collection}/{key}")]
    NotFound { collection: String, key: String },

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Discriminant of [`ManifestError`], for matching on the failure class alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EmptyDocument,
    ParseFailure,
    MissingRoot,
    Corruption,
    Io,
    DuplicateResource,
    NotFound,
    Config,
    Xml,
}

impl ManifestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManifestError::EmptyDocument { .. } => ErrorKind::EmptyDocument,
            ManifestError::ParseFailure { .. } => ErrorKind::ParseFailure,
            ManifestError::MissingRoot { .. } => ErrorKind::MissingRoot,
            ManifestError::Corruption { .. } => ErrorKind::Corruption,
            ManifestError::Io { .. } => ErrorKind::Io,
            ManifestError::DuplicateResource { .. } => ErrorKind::DuplicateResource,
            ManifestError::NotFound { .. } => ErrorKind::NotFound,
            ManifestError::Config(_) => ErrorKind::Config,
            ManifestError::Xml(_) => ErrorKind::Xml,
        }
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        ManifestError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ManifestError>;
