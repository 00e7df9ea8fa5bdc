//! Row → value conversion.
//!
//! A [`RowConverter`] turns a [`RawRow`] (plus the reader's [`HeaderMap`], if any) into the value
//! a reader yields. [`DefaultConverter`] covers the two built-in targets:
//!
//! - [`RowMap`]: title → cell text. Cells missing at the end of a short row become `""`. Without a
//!   header map the keys are column letters (`A`, `B`, ...).
//! - any [`Record`]: each declared field reads the column named by its title. A field whose column
//!   is absent (no such title, or the row is too short) keeps its default.
//!
//! A row with one or more failing fields is rejected as a whole with a [`ConversionError`] that
//! lists every failure.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::column::{column_index, column_letter};
use crate::error::{ConversionError, FieldFailure};
use crate::header::HeaderMap;
use crate::types::{RawRow, RowMap};

pub mod cell;
pub mod date;
pub mod schema;

pub use cell::FromCell;
pub use schema::{FieldDescriptor, FieldSpec, Record, SchemaBuilder, SchemaDescriptor};

/// Converts raw rows into `T`.
pub trait RowConverter<T>: Send + Sync {
    fn convert(&self, headers: Option<&HeaderMap>, row: &RawRow) -> Result<T, ConversionError>;
}

impl<T, F> RowConverter<T> for F
where
    F: Fn(Option<&HeaderMap>, &RawRow) -> Result<T, ConversionError> + Send + Sync,
{
    fn convert(&self, headers: Option<&HeaderMap>, row: &RawRow) -> Result<T, ConversionError> {
        self(headers, row)
    }
}

/// Schema descriptors keyed by record type, built at most once per type.
#[derive(Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    builds: AtomicUsize,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor for `T`, describing the type on first use.
    pub fn descriptor<T: Record>(&self) -> Arc<SchemaDescriptor<T>> {
        let key = TypeId::of::<T>();
        if let Some(found) = self.entries.read().expect("schema cache lock poisoned").get(&key) {
            if let Ok(descriptor) = Arc::clone(found).downcast::<SchemaDescriptor<T>>() {
                return descriptor;
            }
        }

        // `T::describe` is user code and runs with no lock held.
        log::debug!("describing record type {}", std::any::type_name::<T>());
        let built = Arc::new(SchemaDescriptor::<T>::of());

        let mut entries = self.entries.write().expect("schema cache lock poisoned");
        // Another thread may have filled the slot while this one was describing.
        if let Some(found) = entries.get(&key) {
            if let Ok(descriptor) = Arc::clone(found).downcast::<SchemaDescriptor<T>>() {
                return descriptor;
            }
        }
        let _ = self.builds.fetch_add(1, Ordering::SeqCst);
        entries.insert(key, Arc::clone(&built) as Arc<dyn Any + Send + Sync>);
        built
    }

    /// Forget `T`'s descriptor; the next use describes it again.
    pub fn invalidate<T: Record>(&self) -> bool {
        self.entries
            .write()
            .expect("schema cache lock poisoned")
            .remove(&TypeId::of::<T>())
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.write().expect("schema cache lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("schema cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many descriptors have been stored over the cache's lifetime.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for SchemaCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaCache")
            .field("entries", &self.len())
            .field("builds", &self.builds())
            .finish()
    }
}

/// The built-in converter. Cloning shares the schema cache.
#[derive(Debug, Clone, Default)]
pub struct DefaultConverter {
    cache: Arc<SchemaCache>,
}

impl DefaultConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn to_map(&self, headers: Option<&HeaderMap>, row: &RawRow) -> RowMap {
        match headers {
            Some(headers) => headers
                .iter()
                .map(|(title, column)| (title, row.cell(column)))
                .collect(),
            None => row
                .cells
                .iter()
                .enumerate()
                .map(|(i, text)| (positional_key(i), text.as_str()))
                .collect(),
        }
    }

    pub fn to_record<T: Record>(
        &self,
        headers: Option<&HeaderMap>,
        row: &RawRow,
    ) -> Result<T, ConversionError> {
        let schema = self.cache.descriptor::<T>();
        let mut record = T::default();
        let mut failures = Vec::new();

        for field in schema.fields() {
            let column = match headers {
                Some(headers) => headers.get(field.title()),
                None => column_index(field.title()),
            };
            let Some(text) = column.and_then(|c| row.cells.get(c)) else {
                continue;
            };
            if let Err(message) = field.apply(&mut record, text) {
                failures.push(FieldFailure {
                    field: field.name().to_string(),
                    column: field.title().to_string(),
                    raw: text.clone(),
                    message,
                });
            }
        }

        if failures.is_empty() {
            Ok(record)
        } else {
            Err(ConversionError {
                sheet_index: row.sheet_index,
                row_index: row.row_index,
                failures,
            })
        }
    }
}

/// Column letter, or the 1-based column number past the lettered range.
fn positional_key(column: usize) -> String {
    column_letter(column).unwrap_or_else(|_| (column + 1).to_string())
}

impl RowConverter<RowMap> for DefaultConverter {
    fn convert(&self, headers: Option<&HeaderMap>, row: &RawRow) -> Result<RowMap, ConversionError> {
        Ok(self.to_map(headers, row))
    }
}

impl<T: Record> RowConverter<T> for DefaultConverter {
    fn convert(&self, headers: Option<&HeaderMap>, row: &RawRow) -> Result<T, ConversionError> {
        self.to_record(headers, row)
    }
}
