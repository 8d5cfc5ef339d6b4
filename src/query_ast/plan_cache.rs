use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use serde::{Deserialize, Serialize};

use super::emitter::dialect::SqlDialect;
use crate::models::enums::DatabaseType;
use crate::models::structs::Parameter;

/// Native type information for one mapped property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMap {
    pub native_type: String,
    pub max_length: Option<u32>,
    pub precision: Option<u8>,
    pub scale: Option<u8>,
}

/// External metadata service describing one entity (table or view).
pub trait ProviderMetadata: Send + Sync + Debug {
    /// Identity of the column set; keys the parameter cache.
    fn shape_id(&self) -> &str;
    fn table_name(&self) -> &str;
    fn column_names(&self) -> Vec<String>;
    fn type_map(&self, property: &str) -> Option<TypeMap>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub native_type: String,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u8>,
    #[serde(default)]
    pub scale: Option<u8>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn sized(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn numeric(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }
}

/// Plain in-memory [`ProviderMetadata`], loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    #[serde(default)]
    pub shape_id: String,
    pub table: String,
    pub columns: Vec<ColumnMetadata>,
}

impl EntityMetadata {
    pub fn new(db_type: DatabaseType, table: impl Into<String>, columns: Vec<ColumnMetadata>) -> Self {
        let table = table.into();
        let shape_id = compute_shape_id(db_type, &table, &columns);
        Self { shape_id, table, columns }
    }

    /// Fill in a missing shape id (metadata deserialized without one).
    pub fn with_shape_for(mut self, db_type: DatabaseType) -> Self {
        if self.shape_id.is_empty() {
            self.shape_id = compute_shape_id(db_type, &self.table, &self.columns);
        }
        self
    }
}

/// md5 over backend, table and column signature.
pub fn compute_shape_id(db_type: DatabaseType, table: &str, columns: &[ColumnMetadata]) -> String {
    let mut signature = format!("{:?}|{}", db_type, table);
    for c in columns {
        signature.push_str(&format!(
            "|{}:{}:{:?}:{:?}:{:?}",
            c.name, c.native_type, c.max_length, c.precision, c.scale
        ));
    }
    format!("{:x}", md5::compute(signature.as_bytes()))
}

impl ProviderMetadata for EntityMetadata {
    fn shape_id(&self) -> &str {
        &self.shape_id
    }

    fn table_name(&self) -> &str {
        &self.table
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn type_map(&self, property: &str) -> Option<TypeMap> {
        self.columns.iter().find(|c| c.name == property).map(|c| TypeMap {
            native_type: c.native_type.clone(),
            max_length: c.max_length,
            precision: c.precision,
            scale: c.scale,
        })
    }
}

/// Metadata by table name (case-insensitive).
#[derive(Debug, Default, Clone)]
pub struct MetadataCatalog {
    entities: HashMap<String, Arc<dyn ProviderMetadata>>,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metadata: Arc<dyn ProviderMetadata>) {
        self.entities.insert(metadata.table_name().to_ascii_lowercase(), metadata);
    }

    pub fn register_entity(&mut self, entity: EntityMetadata) {
        self.register(Arc::new(entity));
    }

    pub fn lookup(&self, table: &str) -> Option<Arc<dyn ProviderMetadata>> {
        self.entities.get(&table.to_ascii_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

type Prototypes = Arc<HashMap<String, Parameter>>;

#[derive(Default)]
struct CacheState {
    shapes: HashMap<String, Prototypes>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub shapes: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Per-shape parameter prototypes, built once and shared read-only.
///
/// Callers never mutate a cached [`Parameter`]; they clone one with
/// [`Parameter::instantiate`] before assigning a name and value.
#[derive(Default)]
pub struct ParameterCache {
    inner: Mutex<CacheState>,
}

impl ParameterCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // state stays consistent even if a holder panicked mid-lookup
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Prototypes for every column of `metadata` with a resolvable native type.
    pub fn get_parameters(
        &self,
        shape_id: &str,
        metadata: &dyn ProviderMetadata,
        dialect: &dyn SqlDialect,
    ) -> Prototypes {
        let mut state = self.lock();
        if let Some(found) = state.shapes.get(shape_id).cloned() {
            state.hits += 1;
            return found;
        }
        state.misses += 1;
        let built = Arc::new(build_prototypes(metadata, dialect));
        debug!(
            "parameter cache: shape {} for '{}' populated with {} prototypes",
            shape_id,
            metadata.table_name(),
            built.len()
        );
        state.shapes.insert(shape_id.to_string(), built.clone());
        built
    }

    /// Cloned prototype for one column, if it maps to a provider type.
    pub fn prototype(
        &self,
        metadata: &dyn ProviderMetadata,
        dialect: &dyn SqlDialect,
        column: &str,
    ) -> Option<Parameter> {
        self.get_parameters(metadata.shape_id(), metadata, dialect)
            .get(column)
            .cloned()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            shapes: state.shapes.len(),
            hits: state.hits,
            misses: state.misses,
        }
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.shapes.clear();
        state.hits = 0;
        state.misses = 0;
    }
}

fn build_prototypes(metadata: &dyn ProviderMetadata, dialect: &dyn SqlDialect) -> HashMap<String, Parameter> {
    let mut out = HashMap::new();
    for column in metadata.column_names() {
        let Some(map) = metadata.type_map(&column) else {
            continue;
        };
        let Some(provider_type) = dialect.provider_type(&map.native_type) else {
            debug!("parameter cache: no provider type for {} ({})", column, map.native_type);
            continue;
        };
        let mut p = Parameter::prototype(column.clone(), provider_type);
        if provider_type.is_numeric() {
            p.precision = map.precision;
            p.scale = map.scale;
        } else if provider_type.is_character() {
            p.size = map.max_length;
        } else if provider_type.is_temporal() {
            let (precision, scale) = dialect.temporal_precision_scale(provider_type);
            p.precision = precision;
            p.scale = scale;
        }
        out.insert(column, p);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ProviderType;
    use crate::query_ast::emitter::dialect::get_dialect;

    fn orders() -> EntityMetadata {
        EntityMetadata::new(
            DatabaseType::MsSQL,
            "Orders",
            vec![
                ColumnMetadata::new("Id", "int"),
                ColumnMetadata::new("Total", "decimal(18,2)").numeric(18, 2),
                ColumnMetadata::new("Customer", "nvarchar(50)").sized(50),
                ColumnMetadata::new("Placed", "datetime"),
                ColumnMetadata::new("Blob", "mystery_type"),
            ],
        )
    }

    #[test]
    fn prototypes_carry_type_specific_metadata() {
        let d = get_dialect(&DatabaseType::MsSQL);
        let meta = orders();
        let cache = ParameterCache::new();
        let map = cache.get_parameters(meta.shape_id(), &meta, d.as_ref());
        assert_eq!(map["Id"].provider_type, ProviderType::Int);
        assert_eq!((map["Total"].precision, map["Total"].scale), (Some(18), Some(2)));
        assert_eq!(map["Customer"].size, Some(50));
        assert_eq!((map["Placed"].precision, map["Placed"].scale), (Some(23), Some(3)));
        assert!(!map.contains_key("Blob"));
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let d = get_dialect(&DatabaseType::MsSQL);
        let meta = orders();
        let cache = ParameterCache::new();
        let a = cache.get_parameters(meta.shape_id(), &meta, d.as_ref());
        let b = cache.get_parameters(meta.shape_id(), &meta, d.as_ref());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.stats(), CacheStats { shapes: 1, hits: 1, misses: 1 });
    }

    #[test]
    fn shape_id_is_stable_and_column_sensitive() {
        let a = orders();
        let b = orders();
        assert_eq!(a.shape_id, b.shape_id);
        let c = EntityMetadata::new(DatabaseType::MsSQL, "Orders", vec![ColumnMetadata::new("Id", "bigint")]);
        assert_ne!(a.shape_id, c.shape_id);
        assert_eq!(a.shape_id.len(), 32);
    }

    #[test]
    fn catalog_lookup_ignores_case() {
        let mut catalog = MetadataCatalog::new();
        catalog.register_entity(orders());
        assert!(catalog.lookup("ORDERS").is_some());
        assert!(catalog.lookup("Customers").is_none());
    }
}
