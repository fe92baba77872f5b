//! JSON dataset files loaded into the in-process remote store.
//!
//! ```json
//! { "employees": [...], "departments": [...], "designations": [...], "penalties": [...] }
//! ```
//!
//! Every document is an object with a string `id`. Missing sections are empty.

use anyhow::{Context, Result, bail};
use muster_core::memory::InMemoryCollection;
use muster_core::remote::{CollectionKind, CollectionSet};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

type Document = Map<String, Value>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub employees: Vec<Document>,
    pub departments: Vec<Document>,
    pub designations: Vec<Document>,
    pub penalties: Vec<Document>,
}

impl Dataset {
    /// Read and parse a dataset file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a dataset object.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))
    }

    /// Seed one in-memory collection per kind.
    ///
    /// # Errors
    ///
    /// Fails when a document has no string `id`.
    pub fn into_collections(self) -> Result<CollectionSet> {
        Ok(CollectionSet {
            employees: Arc::new(seed(CollectionKind::Employees, self.employees)?),
            departments: Arc::new(seed(CollectionKind::Departments, self.departments)?),
            designations: Arc::new(seed(CollectionKind::Designations, self.designations)?),
            penalties: Arc::new(seed(CollectionKind::Penalties, self.penalties)?),
        })
    }
}

fn seed(kind: CollectionKind, documents: Vec<Document>) -> Result<InMemoryCollection> {
    let collection = InMemoryCollection::new(kind);
    for (index, mut fields) in documents.into_iter().enumerate() {
        let id = match fields.remove("id") {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(other) => bail!("{kind}[{index}]: id must be a non-empty string, got {other}"),
            None => bail!("{kind}[{index}]: missing id"),
        };
        collection.put(id, fields);
    }
    tracing::debug!(%kind, documents = collection.len(), "seeded collection");
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let file = write(r#"{ "penalties": [{ "id": "p1", "amount": 5 }] }"#);
        let dataset = Dataset::load(file.path()).unwrap();
        assert!(dataset.employees.is_empty());
        assert_eq!(dataset.penalties.len(), 1);
    }

    #[test]
    fn id_moves_out_of_the_fields() {
        let file = write(r#"{ "departments": [{ "id": "d1", "department_name": "QA" }] }"#);
        let dataset = Dataset::load(file.path()).unwrap();
        let departments = seed(CollectionKind::Departments, dataset.departments).unwrap();
        let stored = departments.document("d1").unwrap();
        assert!(stored.get("id").is_none());
        assert_eq!(stored["department_name"], "QA");
    }

    #[test]
    fn documents_need_string_ids() {
        let dataset = Dataset {
            employees: vec![Map::new()],
            ..Dataset::default()
        };
        let err = dataset.into_collections().unwrap_err();
        assert!(err.to_string().contains("missing id"), "{err}");

        let file = write(r#"{ "penalties": [{ "id": 7 }] }"#);
        let err = Dataset::load(file.path())
            .unwrap()
            .into_collections()
            .unwrap_err();
        assert!(err.to_string().contains("non-empty string"), "{err}");
    }

    #[test]
    fn malformed_json_names_the_file() {
        let file = write("[1, 2");
        let err = Dataset::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse dataset"));
    }
}
