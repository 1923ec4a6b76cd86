//! The package under test, held entirely in memory.
//!
//! Files live under `/node_modules/<name>/` in a virtual file system so that
//! bare specifiers naming the package itself resolve the same way they would
//! for a consumer. A paired types-only package lives under
//! `/node_modules/@types/<mangled>/`.

mod manifest;

pub use manifest::PackageJson;

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use typeprobe_util::vpath;

/// Read-only view of the virtual package file system.
pub trait PackageFs {
    /// Contents of a file, if it exists.
    fn read_file(&self, path: &str) -> Option<&str>;

    fn file_exists(&self, path: &str) -> bool {
        self.read_file(path).is_some()
    }

    /// Whether any file lives below `path`.
    fn directory_exists(&self, path: &str) -> bool;

    /// Every file path starting with `prefix`, in sorted order.
    fn list_files(&self, prefix: &str) -> Vec<&str>;
}

/// Name and version of a package.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PackageIdentity {
    pub name: String,
    pub version: String,
}

/// An in-memory package plus its optional paired types package.
#[derive(Debug, Clone)]
pub struct Package {
    identity: PackageIdentity,
    types_identity: Option<PackageIdentity>,
    files: BTreeMap<String, String>,
}

/// `@scope/name` becomes `scope__name`, the `@types` naming convention.
#[must_use]
pub fn mangle_scoped_name(name: &str) -> String {
    match name.strip_prefix('@') {
        Some(scoped) => scoped.replacen('/', "__", 1),
        None => name.to_string(),
    }
}

impl Package {
    /// Build a package from `(relative_path, contents)` pairs.
    pub fn new<I>(name: impl Into<String>, version: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let identity = PackageIdentity {
            name: name.into(),
            version: version.into(),
        };
        let root = format!("/node_modules/{}", identity.name);
        let files = files
            .into_iter()
            .map(|(rel, text)| (vpath::join(&root, &rel), text))
            .collect();
        Self {
            identity,
            types_identity: None,
            files,
        }
    }

    /// Build a package from a manifest and files; name and version come from
    /// the manifest at `package.json`.
    pub fn from_files<I>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let files: Vec<(String, String)> = files.into_iter().collect();
        let manifest = read_manifest(&files)?;
        Ok(Self::new(manifest.name, manifest.version, files))
    }

    /// Load a package directory from disk.
    pub fn load(dir: &Path) -> Result<Self> {
        Self::from_files(typeprobe_util::fs::collect_files(dir)?)
    }

    /// Attach a paired types-only package from `(relative_path, contents)` pairs.
    pub fn with_types_package<I>(mut self, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let files: Vec<(String, String)> = files.into_iter().collect();
        let manifest = read_manifest(&files)?;
        let root = format!(
            "/node_modules/@types/{}",
            mangle_scoped_name(&self.identity.name)
        );
        for (rel, text) in files {
            self.files.insert(vpath::join(&root, &rel), text);
        }
        self.types_identity = Some(manifest);
        Ok(self)
    }

    /// Load a paired types package directory from disk.
    pub fn with_types_dir(self, dir: &Path) -> Result<Self> {
        let files = typeprobe_util::fs::collect_files(dir)?;
        self.with_types_package(files)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    #[must_use]
    pub fn identity(&self) -> &PackageIdentity {
        &self.identity
    }

    #[must_use]
    pub fn types_identity(&self) -> Option<&PackageIdentity> {
        self.types_identity.as_ref()
    }

    /// Virtual directory holding the package.
    #[must_use]
    pub fn root_dir(&self) -> String {
        format!("/node_modules/{}", self.identity.name)
    }

    /// Virtual directory holding the paired types package, if any.
    #[must_use]
    pub fn types_root_dir(&self) -> Option<String> {
        self.types_identity.as_ref().map(|_| {
            format!(
                "/node_modules/@types/{}",
                mangle_scoped_name(&self.identity.name)
            )
        })
    }

    /// Parse the manifest found at `<dir>/package.json`.
    pub fn manifest_at(&self, dir: &str) -> Result<Option<PackageJson>> {
        let path = vpath::join(dir, "package.json");
        match self.read_file(&path) {
            Some(text) => PackageJson::parse(text)
                .map(Some)
                .map_err(|source| Error::PackageJson { path, source }),
            None => Ok(None),
        }
    }

    /// Number of files across both packages.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

fn read_manifest(files: &[(String, String)]) -> Result<PackageIdentity> {
    let text = files
        .iter()
        .find(|(rel, _)| rel == "package.json")
        .map(|(_, text)| text.as_str())
        .ok_or_else(|| Error::MissingFile("package.json".into()))?;
    let manifest = PackageJson::parse(text).map_err(|source| Error::PackageJson {
        path: "package.json".into(),
        source,
    })?;
    Ok(PackageIdentity {
        name: manifest
            .name
            .ok_or_else(|| Error::other("package.json has no \"name\""))?,
        version: manifest.version.unwrap_or_else(|| "0.0.0".into()),
    })
}

impl PackageFs for Package {
    fn read_file(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    fn directory_exists(&self, path: &str) -> bool {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    fn list_files(&self, prefix: &str) -> Vec<&str> {
        self.files
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.as_str())
            .collect()
    }
}
