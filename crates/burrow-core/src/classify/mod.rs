/// Path classification: assigns an opaque semantic tag to every file and
/// folder name using ordered suffix rules, with a memo cache.
///
/// Classification looks only at the bare name and whether the node is a
/// folder. Location, timestamps and content never matter, which is what makes
/// caching by name sound.
pub mod rules;

use crate::error::EngineResult;
use crate::model::EntryKind;
use compact_str::CompactString;
use parking_lot::RwLock;
use rules::{Rule, RuleTable, FILE_RULES, FOLDER_RULES};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Opaque label the front end maps to an icon or caption.
///
/// The engine only promises that a name always maps to the same tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TypeTag(&'static str);

impl TypeTag {
    /// Folder matching no rule.
    pub const FOLDER: TypeTag = TypeTag("folder");
    /// File matching no rule.
    pub const FILE: TypeTag = TypeTag("file");
    /// Neither a file nor a folder (vanished, dangling link, device node).
    pub const UNKNOWN: TypeTag = TypeTag("unknown");

    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// Rule-table classifier shared by every operation of an engine.
pub struct Classifier {
    folders: RuleTable,
    files: RuleTable,
    /// Keyed by kind as well as name: `build` the folder and `build` the
    /// file resolve through different tables.
    cache: RwLock<HashMap<(EntryKind, CompactString), TypeTag>>,
    cache_limit: Option<usize>,
}

impl Classifier {
    /// Classifier over the built-in folder and file tables.
    pub fn standard() -> EngineResult<Self> {
        Self::new(FOLDER_RULES, FILE_RULES)
    }

    /// Build from custom rule lists. Fails if either table is malformed.
    pub fn new(folder_rules: &[Rule], file_rules: &[Rule]) -> EngineResult<Self> {
        Ok(Self {
            folders: RuleTable::new(TypeTag::FOLDER, folder_rules)?,
            files: RuleTable::new(TypeTag::FILE, file_rules)?,
            cache: RwLock::new(HashMap::new()),
            cache_limit: None,
        })
    }

    /// Flush the cache whenever it would grow past `limit` names.
    pub fn with_cache_limit(mut self, limit: Option<usize>) -> Self {
        self.cache_limit = limit;
        self
    }

    /// Classify whatever currently sits at `path`.
    ///
    /// Follows symbolic links. Anything that is not a regular file or a
    /// directory, including a path that no longer exists, is `unknown`.
    pub fn classify(&self, path: &Path) -> TypeTag {
        let kind = match std::fs::metadata(path) {
            Ok(m) if m.is_dir() => EntryKind::Folder,
            Ok(m) if m.is_file() => EntryKind::File,
            _ => return TypeTag::UNKNOWN,
        };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.classify_name(&name, kind)
    }

    /// Classify a bare name without touching the filesystem.
    pub fn classify_name(&self, name: &str, kind: EntryKind) -> TypeTag {
        let key = (kind, CompactString::new(name.to_lowercase()));
        if let Some(tag) = self.cache.read().get(&key) {
            return *tag;
        }

        let table = match kind {
            EntryKind::Folder => &self.folders,
            EntryKind::File => &self.files,
        };
        let tag = table.first_match(&key.1);

        let mut cache = self.cache.write();
        if let Some(limit) = self.cache_limit {
            if cache.len() >= limit {
                debug!("Classifier cache reached {limit} names, flushing");
                cache.clear();
            }
        }
        cache.insert(key, tag);
        tag
    }

    /// Number of memoised names.
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn classifier() -> Classifier {
        Classifier::standard().unwrap()
    }

    #[test]
    fn folder_rules_apply_to_directories() {
        let c = classifier();
        assert_eq!(c.classify_name(".vscode", EntryKind::Folder).as_str(), "folder-vscode");
        assert_eq!(c.classify_name("src", EntryKind::Folder).as_str(), "folder-src");
        assert_eq!(c.classify_name("layouts", EntryKind::Folder).as_str(), "folder-view");
        assert_eq!(c.classify_name("target", EntryKind::Folder).as_str(), "folder-dist");
        assert_eq!(c.classify_name("__tests__", EntryKind::Folder).as_str(), "folder-test");
        assert_eq!(c.classify_name("holiday photos", EntryKind::Folder), TypeTag::FOLDER);
    }

    #[test]
    fn file_rules_apply_to_files() {
        let c = classifier();
        assert_eq!(c.classify_name("main.py", EntryKind::File).as_str(), "file-python");
        assert_eq!(c.classify_name("tsconfig.json", EntryKind::File).as_str(), "file-tsconfig");
        assert_eq!(c.classify_name("data.json", EntryKind::File).as_str(), "file-json");
        assert_eq!(c.classify_name("index.d.ts", EntryKind::File).as_str(), "file-typescript-definition");
        assert_eq!(c.classify_name("index.ts", EntryKind::File).as_str(), "file-typescript");
        assert_eq!(c.classify_name("LICENSE.md", EntryKind::File).as_str(), "file-license");
        assert_eq!(c.classify_name("README.md", EntryKind::File).as_str(), "file-markdown");
        assert_eq!(c.classify_name("mystery", EntryKind::File), TypeTag::FILE);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify_name("Dockerfile", EntryKind::File).as_str(), "file-docker");
        assert_eq!(c.classify_name("PHOTO.JPG", EntryKind::File).as_str(), "file-image");
        assert_eq!(c.classify_name("Node_Modules", EntryKind::Folder).as_str(), "folder-node-modules");
    }

    #[test]
    fn same_name_differs_by_kind() {
        let c = classifier();
        assert_eq!(c.classify_name("build", EntryKind::Folder).as_str(), "folder-dist");
        assert_eq!(c.classify_name("build", EntryKind::File), TypeTag::FILE);
        // And the cached folder answer must not leak into the file lookup.
        assert_eq!(c.classify_name("build", EntryKind::Folder).as_str(), "folder-dist");
    }

    #[test]
    fn repeated_classification_is_stable_and_cached() {
        let c = classifier();
        let first = c.classify_name("app.js", EntryKind::File);
        let len = c.cached_len();
        for _ in 0..10 {
            assert_eq!(c.classify_name("app.js", EntryKind::File), first);
        }
        assert_eq!(c.cached_len(), len, "repeat lookups must not grow the cache");
    }

    #[test]
    fn classification_ignores_location() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("one");
        let b = tmp.path().join("two").join("deeper");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(a.join("style.css"), "a{}").unwrap();
        fs::write(b.join("style.css"), "b{}").unwrap();

        let c = classifier();
        assert_eq!(c.classify(&a.join("style.css")), c.classify(&b.join("style.css")));
        assert_eq!(c.classify(&a.join("style.css")).as_str(), "file-css");
    }

    #[test]
    fn classify_missing_path_is_unknown() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(classifier().classify(&tmp.path().join("vanished.py")), TypeTag::UNKNOWN);
    }

    #[test]
    fn classify_directory_on_disk() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        assert_eq!(classifier().classify(&docs).as_str(), "folder-docs");
    }

    #[test]
    fn cache_limit_flushes_when_full() {
        let c = classifier().with_cache_limit(Some(2));
        c.classify_name("a.py", EntryKind::File);
        c.classify_name("b.py", EntryKind::File);
        assert_eq!(c.cached_len(), 2);
        c.classify_name("c.py", EntryKind::File);
        assert_eq!(c.cached_len(), 1);
        // Flushing never changes answers.
        assert_eq!(c.classify_name("a.py", EntryKind::File).as_str(), "file-python");
    }

    #[test]
    fn malformed_custom_table_fails_fast() {
        let bad = [Rule::new("dup", &[".x"]), Rule::new("dup", &[".y"])];
        assert!(Classifier::new(&bad, FILE_RULES).is_err());
    }

    #[test]
    fn tag_serialises_as_plain_string() {
        let json = serde_json::to_string(&TypeTag::new("file-python")).unwrap();
        assert_eq!(json, "\"file-python\"");
    }
}
