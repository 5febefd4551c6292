//! Schema loader for definition files
//!
//! - Every `*.json` file in the schema directory holds one definition
//! - Files are read in name order; references may point at any file
//! - Schema names are unique and registration is immutable
//! - Unknown references and reference cycles fail the whole load, leaving
//!   the registry as it was

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::definition::SchemaDefinition;
use super::errors::{SchemaError, SchemaResult};
use super::types::Schema;

/// Registry of built schemas, keyed by name.
pub struct SchemaLoader {
    /// Directory containing definition files
    schema_dir: PathBuf,
    /// Built schemas
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            schemas: HashMap::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every definition file in the schema directory.
    ///
    /// Returns the number of files loaded. A missing directory is an error.
    pub fn load_all(&mut self) -> SchemaResult<usize> {
        let dir = self.schema_dir.display().to_string();
        if !self.schema_dir.is_dir() {
            return Err(SchemaError::Malformed {
                path: dir,
                reason: "schema directory does not exist".to_string(),
            });
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| SchemaError::Malformed {
            path: dir.clone(),
            reason: format!("failed to read schema directory: {}", e),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SchemaError::Malformed {
                path: dir.clone(),
                reason: format!("failed to read directory entry: {}", e),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut batch = Batch::new(&self.schemas);
        for path in &paths {
            let definition = read_definition(path)?;
            tracing::debug!(path = %path.display(), schema = %definition.name, "read definition");
            batch.stage(definition)?;
        }
        let built = batch.resolve_all()?;

        tracing::info!(dir = %dir, schemas = built.len(), "schemas loaded");
        self.schemas.extend(built);
        Ok(paths.len())
    }

    /// Builds and registers one definition. Its references must already be
    /// registered.
    pub fn register_definition(&mut self, definition: SchemaDefinition) -> SchemaResult<Arc<Schema>> {
        let name = definition.name.clone();
        let mut batch = Batch::new(&self.schemas);
        batch.stage(definition)?;
        let schema = batch.resolve(&name, &mut Vec::new())?;
        let built = batch.built;
        self.schemas.extend(built);
        Ok(schema)
    }

    /// Registers an already built schema.
    pub fn register(&mut self, schema: Schema) -> SchemaResult<Arc<Schema>> {
        if self.exists(schema.name()) {
            return Err(SchemaError::AlreadyRegistered(schema.name().to_string()));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(schema.name().to_string(), schema.clone());
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(name).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schema names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}

/// One load attempt. Schemas are built here and only reach the registry
/// once every definition in the batch has resolved.
struct Batch<'a> {
    committed: &'a HashMap<String, Arc<Schema>>,
    pending: HashMap<String, SchemaDefinition>,
    built: HashMap<String, Arc<Schema>>,
}

impl<'a> Batch<'a> {
    fn new(committed: &'a HashMap<String, Arc<Schema>>) -> Self {
        Self {
            committed,
            pending: HashMap::new(),
            built: HashMap::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<Schema>> {
        self.committed
            .get(name)
            .or_else(|| self.built.get(name))
            .cloned()
    }

    fn stage(&mut self, definition: SchemaDefinition) -> SchemaResult<()> {
        if self.committed.contains_key(&definition.name) || self.pending.contains_key(&definition.name) {
            return Err(SchemaError::AlreadyRegistered(definition.name));
        }
        self.pending.insert(definition.name.clone(), definition);
        Ok(())
    }

    fn resolve_all(mut self) -> SchemaResult<HashMap<String, Arc<Schema>>> {
        let mut names: Vec<String> = self.pending.keys().cloned().collect();
        names.sort();
        for name in names {
            self.resolve(&name, &mut Vec::new())?;
        }
        Ok(self.built)
    }

    /// Builds `name` after its references, depth first.
    fn resolve(&mut self, name: &str, visiting: &mut Vec<String>) -> SchemaResult<Arc<Schema>> {
        if let Some(schema) = self.lookup(name) {
            return Ok(schema);
        }
        if visiting.iter().any(|n| n == name) {
            return Err(SchemaError::CyclicReference(name.to_string()));
        }
        let definition = self
            .pending
            .get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))?;

        visiting.push(name.to_string());
        for reference in definition.references() {
            self.resolve(reference, visiting)?;
        }
        visiting.pop();

        let schema = Arc::new(definition.build(|reference| {
            self.lookup(reference)
                .ok_or_else(|| SchemaError::UnknownSchema(reference.to_string()))
        })?);

        self.built.insert(name.to_string(), schema.clone());
        Ok(schema)
    }
}

fn read_definition(path: &Path) -> SchemaResult<SchemaDefinition> {
    let content = fs::read_to_string(path).map_err(|e| SchemaError::Malformed {
        path: path.display().to_string(),
        reason: format!("failed to read file: {}", e),
    })?;

    serde_json::from_str(&content).map_err(|e| SchemaError::Malformed {
        path: path.display().to_string(),
        reason: format!("invalid definition: {}", e),
    })
}
