//! Typed field descriptors, primary-key set, tokenizer assignment and value coercion (§3, §4.2).
//! Shaped after `meilidb-schema`'s `Arc`-backed, builder-constructed `Schema` — here the builder
//! is simply the on-disk `SchemaConf` a caller POSTs or that we load back from `schema_dir`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::DocValue;
use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
}

/// A single field's on-disk declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConf {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub pk: bool,
    #[serde(default)]
    pub tokenizer: Tokenizer,
}

/// The on-disk representation of a `Schema`, round-tripped as JSON under `schema_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConf {
    pub name: String,
    pub fields: Vec<FieldConf>,
    #[serde(default)]
    pub store_path: Option<String>,
    #[serde(default = "default_shards")]
    pub shards: u32,
}

fn default_shards() -> u32 {
    1
}

#[derive(Debug)]
struct Field {
    name: String,
    field_type: FieldType,
    pk: bool,
    tokenizer: Tokenizer,
}

#[derive(Debug)]
struct Inner {
    name: String,
    fields: Vec<Field>,
    field_map: HashMap<String, usize>,
    pk_idx: Vec<usize>,
    store_path: Option<String>,
    shards: u32,
}

/// An index's schema: field list, name->position map, and PK field order. Cheaply `Clone`-able
/// (it's an `Arc`), so a `Schema` can be shared across the registry and every worker without
/// re-parsing JSON on each access.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<Inner>,
}

impl Schema {
    pub fn from_conf(conf: SchemaConf) -> Result<Schema> {
        let mut field_map = HashMap::with_capacity(conf.fields.len());
        let mut fields = Vec::with_capacity(conf.fields.len());
        let mut pk_idx = Vec::new();

        for (i, f) in conf.fields.into_iter().enumerate() {
            if field_map.insert(f.name.clone(), i).is_some() {
                return Err(Error::BadRequest(format!("duplicate field `{}`", f.name)));
            }
            if f.pk {
                pk_idx.push(i);
            }
            fields.push(Field {
                name: f.name,
                field_type: f.field_type,
                pk: f.pk,
                tokenizer: f.tokenizer,
            });
        }

        Ok(Schema {
            inner: Arc::new(Inner {
                name: conf.name,
                fields,
                field_map,
                pk_idx,
                store_path: conf.store_path,
                shards: conf.shards,
            }),
        })
    }

    pub fn to_conf(&self) -> SchemaConf {
        SchemaConf {
            name: self.inner.name.clone(),
            fields: self
                .inner
                .fields
                .iter()
                .map(|f| FieldConf {
                    name: f.name.clone(),
                    field_type: f.field_type,
                    pk: f.pk,
                    tokenizer: f.tokenizer,
                })
                .collect(),
            store_path: self.inner.store_path.clone(),
            shards: self.inner.shards,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn pk_idx(&self) -> &[usize] {
        &self.inner.pk_idx
    }

    pub fn store_path(&self) -> Option<&str> {
        self.inner.store_path.as_deref()
    }

    pub fn shards(&self) -> u32 {
        self.inner.shards
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.inner.field_map.get(name).copied()
    }

    fn field(&self, idx: usize) -> &Field {
        &self.inner.fields[idx]
    }

    pub fn tokenizer_of(&self, idx: usize) -> Tokenizer {
        self.field(idx).tokenizer
    }

    pub fn field_name(&self, idx: usize) -> &str {
        &self.field(idx).name
    }

    /// Coerces a raw JSON value into the field's declared native type (§4.2).
    pub fn coerce(&self, idx: usize, raw: &Value) -> Result<DocValue> {
        let field = self.field(idx);
        match field.field_type {
            FieldType::String => match raw {
                Value::String(s) => Ok(DocValue::Str(s.clone())),
                Value::Number(n) => Ok(DocValue::Str(n.to_string())),
                Value::Bool(b) => Ok(DocValue::Str(b.to_string())),
                other => Err(coercion_err(&field.name, "string", other)),
            },
            FieldType::Integer => match raw {
                Value::Number(n) if n.is_i64() => Ok(DocValue::Int(n.as_i64().unwrap())),
                Value::Number(n) if n.is_u64() => Ok(DocValue::Int(n.as_u64().unwrap() as i64)),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(DocValue::Int)
                    .map_err(|_| coercion_err(&field.name, "integer", raw)),
                other => Err(coercion_err(&field.name, "integer", other)),
            },
            FieldType::Float => match raw {
                Value::Number(n) => n
                    .as_f64()
                    .map(DocValue::Float)
                    .ok_or_else(|| coercion_err(&field.name, "float", raw)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(DocValue::Float)
                    .map_err(|_| coercion_err(&field.name, "float", raw)),
                other => Err(coercion_err(&field.name, "float", other)),
            },
            FieldType::Boolean => match raw {
                Value::Bool(b) => Ok(DocValue::Bool(*b)),
                Value::String(s) => s
                    .trim()
                    .parse::<bool>()
                    .map(DocValue::Bool)
                    .map_err(|_| coercion_err(&field.name, "boolean", raw)),
                other => Err(coercion_err(&field.name, "boolean", other)),
            },
        }
    }
}

fn coercion_err(field: &str, expected: &'static str, value: &Value) -> Error {
    Error::SchemaCoercion {
        field: field.to_string(),
        expected,
        value: value.to_string(),
    }
}

fn schema_path(schema_dir: &Path, name: &str) -> PathBuf {
    schema_dir.join(format!("{name}.json"))
}

pub fn load_schema(schema_dir: &Path, name: &str) -> Result<Schema> {
    let path = schema_path(schema_dir, name);
    let bytes = fs::read(&path).map_err(|_| Error::SchemaNotFound(name.to_string()))?;
    let conf: SchemaConf = serde_json::from_slice(&bytes)
        .map_err(|e| Error::BadRequest(format!("corrupt schema file for `{name}`: {e}")))?;
    Schema::from_conf(conf)
}

pub fn schema_exists(schema_dir: &Path, name: &str) -> bool {
    schema_path(schema_dir, name).is_file()
}

pub fn save_schema(schema_dir: &Path, name: &str, conf: &SchemaConf) -> Result<()> {
    if schema_exists(schema_dir, name) {
        return Err(Error::SchemaExists(name.to_string()));
    }
    fs::create_dir_all(schema_dir)?;
    let bytes = serde_json::to_vec_pretty(conf)
        .map_err(|e| Error::BadRequest(format!("could not serialize schema: {e}")))?;
    fs::write(schema_path(schema_dir, name), bytes)?;
    Ok(())
}

pub fn delete_schema(schema_dir: &Path, name: &str) -> Result<()> {
    let path = schema_path(schema_dir, name);
    fs::remove_file(&path).map_err(|_| Error::SchemaNotFound(name.to_string()))
}

pub fn rename_schema(schema_dir: &Path, old: &str, new: &str) -> Result<()> {
    if !schema_exists(schema_dir, old) {
        return Err(Error::SchemaNotFound(old.to_string()));
    }
    if schema_exists(schema_dir, new) {
        return Err(Error::SchemaExists(new.to_string()));
    }
    fs::rename(schema_path(schema_dir, old), schema_path(schema_dir, new))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books_schema() -> Schema {
        Schema::from_conf(SchemaConf {
            name: "books".into(),
            fields: vec![
                FieldConf { name: "id".into(), field_type: FieldType::Integer, pk: true, tokenizer: Tokenizer::None },
                FieldConf { name: "title".into(), field_type: FieldType::String, pk: false, tokenizer: Tokenizer::Whitespace },
            ],
            store_path: None,
            shards: 1,
        })
        .unwrap()
    }

    #[test]
    fn coerces_int_from_string() {
        let schema = books_schema();
        let idx = schema.field_index("id").unwrap();
        let v = schema.coerce(idx, &Value::String("42".into())).unwrap();
        assert_eq!(v, DocValue::Int(42));
    }

    #[test]
    fn rejects_composite_string_value() {
        let schema = books_schema();
        let idx = schema.field_index("title").unwrap();
        let err = schema.coerce(idx, &Value::Array(vec![])).unwrap_err();
        assert!(matches!(err, Error::SchemaCoercion { .. }));
    }

    #[test]
    fn pk_idx_follows_declaration_order() {
        let schema = Schema::from_conf(SchemaConf {
            name: "t".into(),
            fields: vec![
                FieldConf { name: "tenant".into(), field_type: FieldType::String, pk: true, tokenizer: Tokenizer::None },
                FieldConf { name: "id".into(), field_type: FieldType::Integer, pk: true, tokenizer: Tokenizer::None },
            ],
            store_path: None,
            shards: 1,
        })
        .unwrap();
        assert_eq!(schema.pk_idx(), &[0, 1]);
    }
}
