//! Physical table layout derived from a descriptor tree: the root table plus one
//! child table per vector field, recursively.

use crate::descriptor::{Column, TypeDescriptor, VectorField};
use crate::error::OrmError;
use crate::naming::{child_table_name, foreign_key_column};
use crate::types::PortableSqlType;
use std::collections::HashSet;
use std::sync::Arc;

/// Edge from a child table to the table it references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParentLink {
    pub parent_table: String,
    pub parent_key: String,
    pub parent_key_type: PortableSqlType,
    pub foreign_key: String,
}

#[derive(Clone, Debug)]
pub struct TableShape {
    pub table: String,
    pub descriptor: Arc<TypeDescriptor>,
    /// Links from the root down to this table, empty for the root.
    pub lineage: Vec<ParentLink>,
}

impl TableShape {
    pub fn root(descriptor: &Arc<TypeDescriptor>) -> Self {
        TableShape { table: descriptor.table_name().to_string(), descriptor: descriptor.clone(), lineage: Vec::new() }
    }

    pub fn child(&self, field: &VectorField) -> Self {
        let pk = self.descriptor.primary_key();
        let mut lineage = self.lineage.clone();
        lineage.push(ParentLink {
            parent_table: self.table.clone(),
            parent_key: pk.column_name.clone(),
            parent_key_type: pk.portable_type,
            foreign_key: foreign_key_column(&self.table, &pk.column_name),
        });
        TableShape { table: child_table_name(&self.table, &field.name), descriptor: field.descriptor.clone(), lineage }
    }

    pub fn is_root(&self) -> bool {
        self.lineage.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.lineage.len()
    }

    /// Link to the direct parent.
    pub fn link(&self) -> Option<&ParentLink> {
        self.lineage.last()
    }

    /// Columns of this table. Child tables keep element keys as plain columns
    /// and append the foreign key last.
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = self.descriptor.columns().to_vec();
        if let Some(link) = self.link() {
            for c in columns.iter_mut() {
                c.primary_key = false;
            }
            columns.push(Column {
                name: link.foreign_key.clone(),
                portable_type: link.parent_key_type,
                primary_key: false,
                nullable: false,
            });
        }
        columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns().into_iter().map(|c| c.name).collect()
    }
}

/// Root table and its child tables, each child tagged with the index of the
/// vector field that produced it.
#[derive(Clone, Debug)]
pub struct TableNode {
    pub shape: TableShape,
    pub children: Vec<(usize, TableNode)>,
}

impl TableNode {
    pub fn build(descriptor: &Arc<TypeDescriptor>) -> Self {
        Self::grow(TableShape::root(descriptor))
    }

    fn grow(shape: TableShape) -> Self {
        let children = shape
            .descriptor
            .vector_fields()
            .iter()
            .enumerate()
            .map(|(idx, vf)| (idx, Self::grow(shape.child(vf))))
            .collect();
        TableNode { shape, children }
    }

    /// Every table of the tree must have distinct column names, foreign keys included.
    pub fn validate(&self) -> Result<(), OrmError> {
        for shape in self.preorder() {
            let mut seen = HashSet::new();
            for name in shape.column_names() {
                if !seen.insert(name.clone()) {
                    return Err(OrmError::DuplicateFieldName { type_name: shape.table.clone(), name });
                }
            }
        }
        Ok(())
    }

    /// Parents before children, depth first.
    pub fn preorder(&self) -> Vec<&TableShape> {
        let mut out = vec![&self.shape];
        for (_, child) in &self.children {
            out.extend(child.preorder());
        }
        out
    }

    /// Children before parents, depth first.
    pub fn postorder(&self) -> Vec<&TableShape> {
        let mut out = Vec::new();
        for (_, child) in &self.children {
            out.extend(child.postorder());
        }
        out.push(&self.shape);
        out
    }
}
