use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The `package.json` fields the engine reads.
///
/// Entry fields are kept as raw JSON because published manifests put all
/// sorts of values there; non-string values are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageJson {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub module_type: Option<Value>,
    pub main: Option<Value>,
    pub module: Option<Value>,
    pub types: Option<Value>,
    pub typings: Option<Value>,
    pub exports: Option<Value>,
    pub imports: Option<Value>,
    pub dev_dependencies: BTreeMap<String, Value>,
}

fn as_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str)
}

impl PackageJson {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Whether `"type": "module"` is set.
    #[must_use]
    pub fn is_module_type(&self) -> bool {
        as_str(self.module_type.as_ref()) == Some("module")
    }

    /// Whether `type` names either module system explicitly.
    #[must_use]
    pub fn has_type_field(&self) -> bool {
        matches!(
            as_str(self.module_type.as_ref()),
            Some("module" | "commonjs")
        )
    }

    #[must_use]
    pub fn main(&self) -> Option<&str> {
        as_str(self.main.as_ref())
    }

    /// `types`, falling back to `typings`.
    #[must_use]
    pub fn types_entry(&self) -> Option<&str> {
        as_str(self.types.as_ref()).or_else(|| as_str(self.typings.as_ref()))
    }

    /// Whether this manifest points anywhere, as a proxy directory's does.
    #[must_use]
    pub fn has_entry_fields(&self) -> bool {
        self.main().is_some()
            || as_str(self.module.as_ref()).is_some()
            || self.types_entry().is_some()
    }

    /// Declared version of a dev dependency.
    #[must_use]
    pub fn dev_dependency(&self, name: &str) -> Option<&str> {
        as_str(self.dev_dependencies.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_fields() {
        let pkg = PackageJson::parse(
            r#"{"name":"x","type":"module","main":42,"typings":"./t.d.ts","devDependencies":{"tsup":"^8"}}"#,
        )
        .unwrap();
        assert!(pkg.is_module_type());
        assert!(pkg.has_type_field());
        assert_eq!(pkg.main(), None);
        assert_eq!(pkg.types_entry(), Some("./t.d.ts"));
        assert_eq!(pkg.dev_dependency("tsup"), Some("^8"));
        assert!(pkg.has_entry_fields());
    }

    #[test]
    fn test_empty_manifest() {
        let pkg = PackageJson::parse("{}").unwrap();
        assert!(!pkg.is_module_type());
        assert!(!pkg.has_type_field());
        assert!(!pkg.has_entry_fields());
    }
}
