//! File identity stored in the catalog

/// Case-folded form of a name, used for equality and ordering
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// File identity: a name (compared case-insensitively) plus its size
///
/// The size is metadata carried alongside the name; it takes no part in
/// lookups.
#[derive(Debug, Clone)]
pub struct FileKey {
    /// Name as given by the caller, case preserved
    pub name: String,

    /// File size in bytes
    pub size: u64,
}

impl FileKey {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        FileKey {
            name: name.into(),
            size,
        }
    }

    pub fn folded_name(&self) -> String {
        fold_name(&self.name)
    }
}

impl PartialEq for FileKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded_name() == other.folded_name()
    }
}

impl Eq for FileKey {}
