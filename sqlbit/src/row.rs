use crate::descriptor::{Slot, TypeDescriptor};
use crate::error::OrmError;
use crate::naming::{placeholder, prefixed};
use crate::value::Value;
use std::any::Any;

/// Ordered (column, value) cells of one table row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Row { cells: Vec::with_capacity(capacity) }
    }

    /// Pairs result columns with the values of one fetched record.
    pub fn from_columns(names: &[String], values: Vec<Value>) -> Self {
        Row { cells: names.iter().cloned().zip(values).collect() }
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.cells.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Named statement parameters, `:column` style.
    pub fn into_params(self) -> Vec<(String, Value)> {
        self.cells.into_iter().map(|(n, v)| (placeholder(&n), v)).collect()
    }
}

/// Marshals the scalar and flattened composite columns of `entity`.
pub fn to_row(desc: &TypeDescriptor, entity: &dyn Any) -> Result<Row, OrmError> {
    let mut row = Row::with_capacity(desc.columns().len());
    write_columns(desc, entity, None, &mut row)?;
    Ok(row)
}

fn write_columns(desc: &TypeDescriptor, entity: &dyn Any, prefix: Option<&str>, row: &mut Row) -> Result<(), OrmError> {
    for slot in desc.layout() {
        match *slot {
            Slot::Scalar(i) => {
                let field = &desc.scalar_fields()[i];
                let column = prefixed(prefix, &field.column_name);
                let value = field.get(entity).map_err(|e| e.in_column(&column))?;
                row.push(column, value);
            }
            Slot::Composite(i) => {
                let composite = &desc.composite_fields()[i];
                let nested = composite.get(entity)?;
                let nested_prefix = prefixed(prefix, &composite.name);
                write_columns(&composite.descriptor, nested, Some(&nested_prefix), row)?;
            }
        }
    }
    Ok(())
}

/// Materializes a fresh instance from a row; vector fields are left empty.
pub fn from_row(desc: &TypeDescriptor, row: &Row) -> Result<Box<dyn Any>, OrmError> {
    let mut instance = desc.new_instance();
    read_columns(desc, row, None, instance.as_mut())?;
    Ok(instance)
}

fn read_columns(desc: &TypeDescriptor, row: &Row, prefix: Option<&str>, entity: &mut dyn Any) -> Result<(), OrmError> {
    for slot in desc.layout() {
        match *slot {
            Slot::Scalar(i) => {
                let field = &desc.scalar_fields()[i];
                let column = prefixed(prefix, &field.column_name);
                let value = row
                    .get(&column)
                    .cloned()
                    .ok_or_else(|| OrmError::UnknownColumn { table: desc.table_name().to_string(), column: column.clone() })?;
                field.set(entity, value).map_err(|e| e.in_column(&column))?;
            }
            Slot::Composite(i) => {
                let composite = &desc.composite_fields()[i];
                let mut nested = composite.descriptor.new_instance();
                let nested_prefix = prefixed(prefix, &composite.name);
                read_columns(&composite.descriptor, row, Some(&nested_prefix), nested.as_mut())?;
                composite.set(entity, nested)?;
            }
        }
    }
    Ok(())
}
