// Versioning of feature blueprints
//
// A feature name moves through v1, v2, ... and never reuses a number. Stored
// versions are immutable; the registry serializes the read-modify-write on
// the version counter so concurrent updates cannot race.

pub mod backend;
pub mod diff;
pub mod directory;

pub use backend::*;
pub use diff::*;
pub use directory::*;

use crate::blueprint::{Blueprint, BlueprintKind};
use crate::error::{Error, Result};
use crate::output::BlueprintDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// One stored rendering of a feature blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVersion {
    pub name: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub document: BlueprintDocument,
}

impl StoredVersion {
    pub fn blueprint(&self) -> Result<Blueprint> {
        Blueprint::try_from(self.document.clone())
    }
}

/// Create/update/get/diff over a storage backend
pub struct FeatureRegistry<B: FeatureBackend> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: FeatureBackend> FeatureRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Store a new feature as v1
    pub fn create(&self, name: &str, blueprint: &Blueprint) -> Result<StoredVersion> {
        let name = validate_name(name)?;
        check_persistent(blueprint)?;
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        if self.backend.latest_version(name)?.is_some() {
            return Err(Error::AlreadyExists(format!("feature {}", name)));
        }
        self.store(name, 1, blueprint)
    }

    /// Store the next version of an existing feature
    pub fn update(&self, name: &str, blueprint: &Blueprint) -> Result<StoredVersion> {
        let name = validate_name(name)?;
        check_persistent(blueprint)?;
        let _guard = self.write_lock.lock().map_err(|_| poisoned())?;
        let latest = self
            .backend
            .latest_version(name)?
            .ok_or_else(|| Error::not_found(format!("feature {}", name)))?;
        self.store(name, latest + 1, blueprint)
    }

    /// A specific version, or the latest when `version` is `None`
    pub fn get(&self, name: &str, version: Option<u32>) -> Result<StoredVersion> {
        let name = validate_name(name)?;
        let version = match version {
            Some(version) => version,
            None => self
                .backend
                .latest_version(name)?
                .ok_or_else(|| Error::not_found(format!("feature {}", name)))?,
        };
        self.backend
            .load(name, version)?
            .ok_or_else(|| Error::not_found(format!("feature {} v{}", name, version)))
    }

    pub fn versions(&self, name: &str) -> Result<Vec<u32>> {
        self.backend.versions(validate_name(name)?)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        self.backend.names()
    }

    /// Changes from `from` to `to`; history is left untouched
    pub fn diff(&self, name: &str, from: u32, to: u32) -> Result<BlueprintDiff> {
        let old = self.get(name, Some(from))?.blueprint()?;
        let new = self.get(name, Some(to))?.blueprint()?;
        Ok(BlueprintDiff::between(&old, &new))
    }

    fn store(&self, name: &str, version: u32, blueprint: &Blueprint) -> Result<StoredVersion> {
        let mut stamped = blueprint.clone().with_name(name);
        stamped.version = Some(version);
        let record = StoredVersion {
            name: name.to_string(),
            version,
            created_at: Utc::now(),
            document: BlueprintDocument::from(&stamped),
        };
        self.backend.save(&record)?;
        info!("Stored feature {} v{} ({} elements)", name, version, stamped.len());
        Ok(record)
    }
}

fn check_persistent(blueprint: &Blueprint) -> Result<()> {
    if blueprint.kind != BlueprintKind::Feature {
        return Err(Error::NotPersistent(format!(
            "{} blueprints are not versioned; only feature blueprints are",
            blueprint.kind
        )));
    }
    Ok(())
}

/// Names become directory names, so keep them to one plain path segment
fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control);
    if valid {
        Ok(name)
    } else {
        Err(Error::invalid_definition(format!("invalid feature name '{}'", name)))
    }
}

fn poisoned() -> Error {
    Error::other("feature registry lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{compose, ElementRef, Selection};
    use crate::index::ScanIndex;
    use crate::model::{DetailLevel, ElementId, ElementKind, RawExtraction, RelationshipKind};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn auth_index() -> ScanIndex {
        let login = RawExtraction::new("login.js")
            .with_source("import { findUser } from './user';\nfunction login() { check(); }\nfunction check() {}\n")
            .element("login", ElementKind::Function, 2, 2, "function login() { check(); }")
            .element("check", ElementKind::Function, 3, 3, "function check() {}")
            .edge("login", "check", RelationshipKind::Calls)
            .edge("", "./user", RelationshipKind::Imports);
        let register = RawExtraction::new("register.js")
            .with_source("function register() {}\n")
            .element("register", ElementKind::Function, 1, 1, "function register() {}");
        let user = RawExtraction::new("user.js")
            .with_source("function findUser() {}\nclass User { save() {} }\n")
            .element("findUser", ElementKind::Function, 1, 1, "function findUser() {}")
            .element("User", ElementKind::Class, 2, 2, "class User { save() {} }")
            .element("User.save", ElementKind::Method, 2, 2, "save() {}");
        ScanIndex::from_batch(&[login, register, user]).unwrap().0
    }

    fn feature(index: &ScanIndex, files: &[&str]) -> Blueprint {
        let selection = Selection::Feature {
            name: "auth".to_string(),
            files: files.iter().map(|f| f.to_string()).collect(),
            elements: vec![],
        };
        compose(index, &selection, DetailLevel::Standard).unwrap()
    }

    fn check_auth_history<B: FeatureBackend>(registry: FeatureRegistry<B>) {
        let index = auth_index();
        let v1 = registry.create("auth", &feature(&index, &["login.js", "register.js"])).unwrap();
        assert_eq!(v1.version, 1);
        let v2 = registry
            .update("auth", &feature(&index, &["login.js", "register.js", "user.js"]))
            .unwrap();
        assert_eq!(v2.version, 2);

        let diff = registry.diff("auth", 1, 2).unwrap();
        let added: Vec<&str> = diff.added_elements.iter().map(|id| id.as_str()).collect();
        assert_eq!(
            added,
            vec!["file:user.js", "user.js::User", "user.js::User.save", "user.js::findUser"]
        );
        assert!(diff.removed_elements.is_empty());
        assert!(diff.removed_edges.is_empty());
        assert!(diff.modified_elements.is_empty());

        assert!(registry.diff("auth", 2, 2).unwrap().is_empty());
        assert_eq!(registry.versions("auth").unwrap(), vec![1, 2]);
        assert_eq!(registry.names().unwrap(), vec!["auth".to_string()]);
    }

    #[test]
    fn test_auth_feature_history_in_memory() {
        check_auth_history(FeatureRegistry::new(MemoryBackend::new()));
    }

    #[test]
    fn test_auth_feature_history_on_disk() {
        let dir = TempDir::new().unwrap();
        check_auth_history(FeatureRegistry::new(DirectoryBackend::new(dir.path().join("features"))));
    }

    #[test]
    fn test_get_latest_and_specific() {
        let index = auth_index();
        let registry = FeatureRegistry::new(MemoryBackend::new());
        registry.create("auth", &feature(&index, &["login.js"])).unwrap();
        registry.update("auth", &feature(&index, &["login.js", "user.js"])).unwrap();

        let latest = registry.get("auth", None).unwrap();
        assert_eq!(latest.version, 2);
        let blueprint = latest.blueprint().unwrap();
        assert_eq!(blueprint.version, Some(2));
        assert_eq!(blueprint.name.as_deref(), Some("auth"));
        assert!(blueprint.contains(&ElementId::new("user.js", "findUser")));

        let first = registry.get("auth", Some(1)).unwrap().blueprint().unwrap();
        assert!(!first.contains(&ElementId::new("user.js", "findUser")));
        assert_eq!(first.exit_points(), vec![ElementId::file("login.js")]);
    }

    #[test]
    fn test_errors() {
        let index = auth_index();
        let registry = FeatureRegistry::new(MemoryBackend::new());
        let bp = feature(&index, &["login.js"]);

        assert!(matches!(registry.update("auth", &bp), Err(Error::NotFound(_))));
        assert!(matches!(registry.get("auth", None), Err(Error::NotFound(_))));
        registry.create("auth", &bp).unwrap();
        assert!(matches!(registry.create("auth", &bp), Err(Error::AlreadyExists(_))));
        assert!(matches!(registry.get("auth", Some(7)), Err(Error::NotFound(_))));
        assert!(matches!(registry.create("../escape", &bp), Err(Error::InvalidDefinition(_))));

        let method = compose(
            &index,
            &Selection::Methods(vec![ElementRef::new("login.js", "login")]),
            DetailLevel::Standard,
        )
        .unwrap();
        assert!(matches!(registry.create("other", &method), Err(Error::NotPersistent(_))));
    }

    #[test]
    fn test_reads_stay_inside_the_store() {
        let dir = TempDir::new().unwrap();
        let bp = feature(&auth_index(), &["login.js"]);
        FeatureRegistry::new(DirectoryBackend::new(dir.path())).create("outside", &bp).unwrap();
        assert!(dir.path().join("outside").join("v1.json").is_file());

        let registry = FeatureRegistry::new(DirectoryBackend::new(dir.path().join("features")));
        assert!(matches!(registry.get("../outside", Some(1)), Err(Error::InvalidDefinition(_))));
        assert!(matches!(registry.get("../outside", None), Err(Error::InvalidDefinition(_))));
        assert!(matches!(registry.versions("../outside"), Err(Error::InvalidDefinition(_))));
        assert!(matches!(registry.diff("../outside", 1, 1), Err(Error::InvalidDefinition(_))));
        assert!(matches!(registry.get("..", None), Err(Error::InvalidDefinition(_))));
    }

    #[test]
    fn test_concurrent_updates_get_distinct_versions() {
        let index = auth_index();
        let registry = Arc::new(FeatureRegistry::new(MemoryBackend::new()));
        let bp = feature(&index, &["login.js"]);
        registry.create("auth", &bp).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let bp = bp.clone();
                thread::spawn(move || registry.update("auth", &bp).unwrap().version)
            })
            .collect();
        let mut versions: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        versions.sort_unstable();
        assert_eq!(versions, (2..=9).collect::<Vec<u32>>());
    }

    #[test]
    fn test_directory_layout() {
        let dir = TempDir::new().unwrap();
        let registry = FeatureRegistry::new(DirectoryBackend::new(dir.path()));
        registry.create("auth", &feature(&auth_index(), &["login.js"])).unwrap();
        assert!(dir.path().join("auth").join("v1.json").is_file());
        assert!(!dir.path().join("auth").join("v1.json.tmp").exists());
    }
}
