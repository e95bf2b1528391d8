//! Expands one logical CRUD call on a mapped type into the ordered statements
//! that realize it across the parent table and its child tables.

use crate::descriptor::TypeDescriptor;
use crate::error::OrmError;
use crate::generator::{scope_parameter, SqlGenerator};
use crate::naming::placeholder;
use crate::row::to_row;
use crate::schema::TableNode;
use crate::value::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    CreateTable,
    DropTable,
    Insert,
    Update,
    Delete,
    Select,
    Count,
}

/// One primitive statement of a cascade, bound to its table.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    pub table: String,
    pub operation: Operation,
    pub sql: Arc<str>,
    pub params: Vec<(String, Value)>,
}

impl Statement {
    fn new(table: &str, operation: Operation, sql: Arc<str>, params: Vec<(String, Value)>) -> Self {
        Statement { table: table.to_string(), operation, sql, params }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        for (name, value) in &self.params {
            write!(f, " {name}={value}")?;
        }
        Ok(())
    }
}

/// Update of the root row plus the child rewrite that follows it.
#[derive(Clone, Debug)]
pub struct UpdatePlan {
    /// `None` when the root table has nothing but its key.
    pub root: Option<Statement>,
    pub children: Vec<Statement>,
}

pub struct RelationManager<'g> {
    generator: &'g SqlGenerator,
}

impl<'g> RelationManager<'g> {
    pub fn new(generator: &'g SqlGenerator) -> Self {
        RelationManager { generator }
    }

    /// Parent tables before the child tables that reference them.
    pub fn create_plan(&self, desc: &Arc<TypeDescriptor>) -> Vec<Statement> {
        TableNode::build(desc)
            .preorder()
            .into_iter()
            .map(|shape| Statement::new(&shape.table, Operation::CreateTable, self.generator.create_table(shape), Vec::new()))
            .collect()
    }

    /// Child tables before their parents.
    pub fn drop_plan(&self, desc: &Arc<TypeDescriptor>) -> Vec<Statement> {
        TableNode::build(desc)
            .postorder()
            .into_iter()
            .map(|shape| Statement::new(&shape.table, Operation::DropTable, self.generator.drop_table(shape), Vec::new()))
            .collect()
    }

    /// Parent row first, then every vector element depth first.
    pub fn insert_plan(&self, desc: &Arc<TypeDescriptor>, entity: &dyn Any) -> Result<Vec<Statement>, OrmError> {
        let mut plan = Vec::new();
        self.insert_rows(&TableNode::build(desc), entity, None, &mut plan)?;
        Ok(plan)
    }

    fn insert_rows(&self, node: &TableNode, entity: &dyn Any, parent_key: Option<Value>, plan: &mut Vec<Statement>) -> Result<(), OrmError> {
        let desc = &node.shape.descriptor;
        let mut row = to_row(desc, entity)?;
        if let (Some(link), Some(key)) = (node.shape.link(), parent_key) {
            row.push(link.foreign_key.clone(), key);
        }
        plan.push(Statement::new(&node.shape.table, Operation::Insert, self.generator.insert(&node.shape), row.into_params()));
        if node.children.is_empty() {
            return Ok(());
        }
        let own_key = desc.primary_key().get(entity)?;
        for (idx, child) in &node.children {
            for element in desc.vector_fields()[*idx].elements(entity)? {
                self.insert_rows(child, element, Some(own_key.clone()), plan)?;
            }
        }
        Ok(())
    }

    /// Rewrites the root row, then replaces all child rows: existing ones are
    /// deleted deepest first and the current vector contents reinserted.
    pub fn update_plan(&self, desc: &Arc<TypeDescriptor>, entity: &dyn Any) -> Result<UpdatePlan, OrmError> {
        let root = match self.generator.update_statement(desc) {
            Some(sql) => Some(Statement::new(desc.table_name(), Operation::Update, sql, to_row(desc, entity)?.into_params())),
            None => None,
        };
        let node = TableNode::build(desc);
        let key = desc.primary_key().get(entity)?;
        let mut children = self.delete_children(&node, &key);
        for (idx, child) in &node.children {
            for element in desc.vector_fields()[*idx].elements(entity)? {
                self.insert_rows(child, element, Some(key.clone()), &mut children)?;
            }
        }
        Ok(UpdatePlan { root, children })
    }

    /// Descendant rows deepest first, the parent row last.
    pub fn delete_plan(&self, desc: &Arc<TypeDescriptor>, key: Value) -> Vec<Statement> {
        let node = TableNode::build(desc);
        let mut plan = self.delete_children(&node, &key);
        let param = placeholder(&desc.primary_key().column_name);
        plan.push(Statement::new(desc.table_name(), Operation::Delete, self.generator.delete_statement(desc), vec![(param, key)]));
        plan
    }

    fn delete_children(&self, node: &TableNode, key: &Value) -> Vec<Statement> {
        node.postorder()
            .into_iter()
            .filter_map(|shape| {
                let sql = self.generator.delete_by_scope(shape)?;
                let param = scope_parameter(shape)?;
                Some(Statement::new(&shape.table, Operation::Delete, sql, vec![(param, key.clone())]))
            })
            .collect()
    }

    pub fn select_all(&self, desc: &Arc<TypeDescriptor>) -> Statement {
        Statement::new(desc.table_name(), Operation::Select, self.generator.select_all_statement(desc), Vec::new())
    }

    pub fn select_by_key(&self, desc: &Arc<TypeDescriptor>, key: Value) -> Statement {
        let param = placeholder(&desc.primary_key().column_name);
        Statement::new(desc.table_name(), Operation::Select, self.generator.select_by_primary_key_statement(desc), vec![(param, key)])
    }

    pub fn select_where(&self, desc: &Arc<TypeDescriptor>, predicate: &str, params: Vec<(String, Value)>) -> Statement {
        let sql: Arc<str> = Arc::from(self.generator.select_where_statement(desc, predicate));
        Statement::new(desc.table_name(), Operation::Select, sql, params)
    }

    pub fn count(&self, desc: &Arc<TypeDescriptor>) -> Statement {
        Statement::new(desc.table_name(), Operation::Count, self.generator.count_statement(desc), Vec::new())
    }

    /// Rows of `child` owned by the parent row whose key is `parent_key`.
    pub fn select_children(&self, child: &TableNode, parent_key: Value) -> Option<Statement> {
        let link = child.shape.link()?;
        let sql = self.generator.select_by_parent(&child.shape)?;
        Some(Statement::new(&child.shape.table, Operation::Select, sql, vec![(placeholder(&link.foreign_key), parent_key)]))
    }
}
