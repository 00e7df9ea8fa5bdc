//! Declared record layouts.
//!
//! A record type lists its fields once, in [`Record::describe`]:
//!
//! ```
//! use sheet_stream::convert::{FieldSpec, Record, SchemaBuilder};
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     name: String,
//!     age: u32,
//!     born: Option<chrono::NaiveDate>,
//! }
//!
//! impl Record for Person {
//!     fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
//!         schema
//!             .field("name", |p: &mut Person, v: String| p.name = v)
//!             .field(FieldSpec::named("age").title("Age"), |p: &mut Person, v: u32| p.age = v)
//!             .field(
//!                 FieldSpec::named("born").title("Born").format("%d/%m/%Y"),
//!                 |p: &mut Person, v: Option<chrono::NaiveDate>| p.born = v,
//!             )
//!     }
//! }
//! ```

use std::any::type_name;
use std::fmt;

use super::cell::FromCell;

/// A type rows can be converted into.
pub trait Record: Default + Send + 'static {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self>;
}

/// Field name plus optional column title and format pattern.
///
/// The title defaults to the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    title: Option<String>,
    format: Option<String>,
}

impl FieldSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            format: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

type Apply<T> = Box<dyn Fn(&mut T, &str) -> Result<(), String> + Send + Sync>;

/// One resolved field: where it reads from and how it is written.
pub struct FieldDescriptor<T> {
    name: String,
    title: String,
    format: Option<String>,
    type_name: &'static str,
    apply: Apply<T>,
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Coerce `text` and write it into `target`. On error `target` is unchanged.
    pub fn apply(&self, target: &mut T, text: &str) -> Result<(), String> {
        (self.apply)(target, text)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("format", &self.format)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Collects field declarations for a [`Record`].
pub struct SchemaBuilder<T> {
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a field read as `V` and written with `setter`.
    pub fn field<V, F>(mut self, spec: impl Into<FieldSpec>, setter: F) -> Self
    where
        V: FromCell + 'static,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let spec = spec.into();
        let format = spec.format.clone();
        let apply = Box::new(move |target: &mut T, text: &str| -> Result<(), String> {
            if let Some(value) = V::from_cell(text, format.as_deref())? {
                setter(target, value);
            }
            Ok(())
        });
        self.fields.push(FieldDescriptor {
            title: spec.title.unwrap_or_else(|| spec.name.clone()),
            name: spec.name,
            format: spec.format,
            type_name: type_name::<V>(),
            apply,
        });
        self
    }

    pub fn build(self) -> SchemaDescriptor<T> {
        SchemaDescriptor {
            fields: self.fields,
        }
    }
}

impl<T: 'static> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered field descriptors of one record type. Read-only after construction.
pub struct SchemaDescriptor<T> {
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: Record> SchemaDescriptor<T> {
    /// Run `T::describe`.
    pub fn of() -> Self {
        T::describe(SchemaBuilder::new()).build()
    }
}

impl<T> SchemaDescriptor<T> {
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> fmt::Debug for SchemaDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Item {
        sku: String,
        qty: i32,
    }

    impl Record for Item {
        fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
            schema
                .field("sku", |i: &mut Item, v: String| i.sku = v)
                .field(FieldSpec::named("qty").title("Quantity"), |i: &mut Item, v: i32| i.qty = v)
        }
    }

    #[test]
    fn titles_default_to_field_names() {
        let schema = SchemaDescriptor::<Item>::of();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.fields()[0].title(), "sku");
        assert_eq!(schema.field("qty").unwrap().title(), "Quantity");
        assert_eq!(schema.field("qty").unwrap().type_name(), "i32");
    }

    #[test]
    fn apply_leaves_target_untouched_on_error_or_empty() {
        let schema = SchemaDescriptor::<Item>::of();
        let qty = schema.field("qty").unwrap();
        let mut item = Item { qty: 5, ..Default::default() };

        assert!(qty.apply(&mut item, "x").is_err());
        assert_eq!(item.qty, 5);
        qty.apply(&mut item, "").unwrap();
        assert_eq!(item.qty, 5);
        qty.apply(&mut item, "12").unwrap();
        assert_eq!(item.qty, 12);
    }
}
