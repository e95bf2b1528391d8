//! DDL/DML text for mapped types and their child tables.
//!
//! Every builder is a pure function of the descriptor tree, so results are cached.

use crate::cache::{StatementCache, DEFAULT_CAPACITY};
use crate::descriptor::TypeDescriptor;
use crate::error::OrmError;
use crate::naming::{placeholder, quote_ident};
use crate::schema::{ParentLink, TableShape};
use crate::types::{backend_type_string, Backend};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateTable,
    DropTable,
    Insert,
    Update,
    Delete,
    DeleteScope,
    SelectAll,
    SelectByKey,
    SelectByParent,
    Count,
}

pub struct SqlGenerator {
    backend: Backend,
    cache: StatementCache,
}

impl SqlGenerator {
    pub fn new(backend: Backend) -> Self {
        Self::with_cache_capacity(backend, DEFAULT_CAPACITY)
    }

    pub fn with_cache_capacity(backend: Backend, capacity: usize) -> Self {
        SqlGenerator { backend, cache: StatementCache::new(capacity) }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn cached_statements(&self) -> usize {
        self.cache.len()
    }

    fn cached<F: FnOnce() -> String>(&self, shape: &TableShape, kind: StatementKind, build: F) -> Arc<str> {
        self.cache.get_or_insert_with(shape.descriptor.id(), &shape.table, kind, build)
    }

    pub fn create_table_statement(&self, desc: &Arc<TypeDescriptor>) -> Arc<str> {
        self.create_table(&TableShape::root(desc))
    }

    pub fn insert_statement(&self, desc: &Arc<TypeDescriptor>) -> Arc<str> {
        self.insert(&TableShape::root(desc))
    }

    /// `None` when the type has no column besides its primary key.
    pub fn update_statement(&self, desc: &Arc<TypeDescriptor>) -> Option<Arc<str>> {
        if desc.columns().len() < 2 {
            return None;
        }
        let shape = TableShape::root(desc);
        Some(self.cached(&shape, StatementKind::Update, || {
            let assignments: Vec<String> = desc.columns().iter().filter(|c| !c.primary_key).map(|c| assignment(&c.name)).collect();
            format!("UPDATE {} SET {} WHERE {}", quote_ident(&shape.table), assignments.join(", "), key_predicate(desc))
        }))
    }

    /// Partial update of `columns`; the primary key can never be one of them.
    pub fn update_columns_statement(&self, desc: &TypeDescriptor, columns: &[&str]) -> Result<String, OrmError> {
        if columns.is_empty() {
            return Err(OrmError::InvalidDescriptor {
                type_name: desc.type_name().to_string(),
                reason: "partial update names no columns".to_string(),
            });
        }
        let mut assignments = Vec::with_capacity(columns.len());
        for name in columns {
            match desc.column(name) {
                Some(c) if c.primary_key => {
                    return Err(OrmError::PrimaryKeyImmutable { table: desc.table_name().to_string(), column: c.name.clone() })
                }
                Some(c) => assignments.push(assignment(&c.name)),
                None => return Err(OrmError::UnknownColumn { table: desc.table_name().to_string(), column: name.to_string() }),
            }
        }
        Ok(format!("UPDATE {} SET {} WHERE {}", quote_ident(desc.table_name()), assignments.join(", "), key_predicate(desc)))
    }

    pub fn delete_statement(&self, desc: &Arc<TypeDescriptor>) -> Arc<str> {
        let shape = TableShape::root(desc);
        self.cached(&shape, StatementKind::Delete, || format!("DELETE FROM {} WHERE {}", quote_ident(&shape.table), key_predicate(desc)))
    }

    pub fn select_all_statement(&self, desc: &Arc<TypeDescriptor>) -> Arc<str> {
        let shape = TableShape::root(desc);
        self.cached(&shape, StatementKind::SelectAll, || select_from(&shape))
    }

    pub fn select_by_primary_key_statement(&self, desc: &Arc<TypeDescriptor>) -> Arc<str> {
        let shape = TableShape::root(desc);
        self.cached(&shape, StatementKind::SelectByKey, || format!("{} WHERE {}", select_from(&shape), key_predicate(desc)))
    }

    /// Caller supplied predicate, passed through as is. A blank predicate selects all rows.
    pub fn select_where_statement(&self, desc: &Arc<TypeDescriptor>, predicate: &str) -> String {
        let shape = TableShape::root(desc);
        match predicate.trim() {
            "" => select_from(&shape),
            p => format!("{} WHERE {}", select_from(&shape), p),
        }
    }

    pub fn count_statement(&self, desc: &Arc<TypeDescriptor>) -> Arc<str> {
        let shape = TableShape::root(desc);
        self.cached(&shape, StatementKind::Count, || format!("SELECT COUNT(*) FROM {}", quote_ident(&shape.table)))
    }

    pub fn drop_table_statement(&self, desc: &Arc<TypeDescriptor>) -> Arc<str> {
        self.drop_table(&TableShape::root(desc))
    }

    pub fn create_table(&self, shape: &TableShape) -> Arc<str> {
        self.cached(shape, StatementKind::CreateTable, || {
            // grandchildren reference element keys, which must then be unique
            let unique_key = (!shape.is_root() && shape.descriptor.has_vectors()).then(|| &shape.descriptor.primary_key().column_name);
            let mut defs: Vec<String> = shape
                .columns()
                .iter()
                .map(|c| {
                    let def = format!("{} {}", quote_ident(&c.name), backend_type_string(self.backend, c.portable_type));
                    if c.primary_key {
                        format!("{def} PRIMARY KEY")
                    } else if unique_key == Some(&c.name) {
                        format!("{def} UNIQUE")
                    } else {
                        def
                    }
                })
                .collect();
            if let Some(link) = shape.link() {
                defs.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_ident(&link.foreign_key),
                    quote_ident(&link.parent_table),
                    quote_ident(&link.parent_key)
                ));
            }
            format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_ident(&shape.table), defs.join(", "))
        })
    }

    pub fn drop_table(&self, shape: &TableShape) -> Arc<str> {
        self.cached(shape, StatementKind::DropTable, || format!("DROP TABLE IF EXISTS {}", quote_ident(&shape.table)))
    }

    pub fn insert(&self, shape: &TableShape) -> Arc<str> {
        self.cached(shape, StatementKind::Insert, || {
            let names = shape.column_names();
            let columns: Vec<String> = names.iter().map(|n| quote_ident(n)).collect();
            let values: Vec<String> = names.iter().map(|n| placeholder(n)).collect();
            format!("INSERT INTO {} ({}) VALUES ({})", quote_ident(&shape.table), columns.join(", "), values.join(", "))
        })
    }

    /// Rows of a child table that belong to one parent row, in insertion order.
    pub fn select_by_parent(&self, shape: &TableShape) -> Option<Arc<str>> {
        let link = shape.link()?;
        Some(self.cached(shape, StatementKind::SelectByParent, || {
            let mut sql = format!("{} WHERE {} = {}", select_from(shape), quote_ident(&link.foreign_key), placeholder(&link.foreign_key));
            if self.backend == Backend::Sqlite {
                sql.push_str(" ORDER BY rowid");
            }
            sql
        }))
    }

    /// Deletes every row of a child table that descends from one root row.
    /// The root key binds to the placeholder named by [`scope_parameter`].
    pub fn delete_by_scope(&self, shape: &TableShape) -> Option<Arc<str>> {
        if shape.is_root() {
            return None;
        }
        Some(self.cached(shape, StatementKind::DeleteScope, || {
            format!("DELETE FROM {} WHERE {}", quote_ident(&shape.table), scope_predicate(&shape.lineage))
        }))
    }
}

/// Placeholder name of the root key in scoped child statements.
pub fn scope_parameter(shape: &TableShape) -> Option<String> {
    shape.lineage.first().map(|link| placeholder(&link.foreign_key))
}

fn scope_predicate(lineage: &[ParentLink]) -> String {
    match lineage {
        [] => String::new(),
        [root] => format!("{} = {}", quote_ident(&root.foreign_key), placeholder(&root.foreign_key)),
        [outer @ .., last] => format!(
            "{} IN (SELECT {} FROM {} WHERE {})",
            quote_ident(&last.foreign_key),
            quote_ident(&last.parent_key),
            quote_ident(&last.parent_table),
            scope_predicate(outer)
        ),
    }
}

fn select_from(shape: &TableShape) -> String {
    let columns: Vec<String> = shape.column_names().iter().map(|n| quote_ident(n)).collect();
    format!("SELECT {} FROM {}", columns.join(", "), quote_ident(&shape.table))
}

fn assignment(column: &str) -> String {
    format!("{} = {}", quote_ident(column), placeholder(column))
}

fn key_predicate(desc: &TypeDescriptor) -> String {
    assignment(&desc.primary_key().column_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::schema::TableNode;

    #[derive(Default)]
    struct Coordinate {
        x: i32,
        y: i32,
    }

    #[derive(Default)]
    struct Via {
        name: String,
        pos: Coordinate,
        holes: Vec<Coordinate>,
    }

    #[derive(Default)]
    struct Port {
        name: String,
        layer: i64,
        vias: Vec<Via>,
    }

    #[derive(Default)]
    struct Tag {
        id: u32,
    }

    struct Fixture {
        coordinate: Arc<TypeDescriptor>,
        port: Arc<TypeDescriptor>,
        tag: Arc<TypeDescriptor>,
    }

    fn fixture() -> Fixture {
        let registry = Registry::new();
        let coordinate = registry
            .register(
                TypeDescriptor::builder::<Coordinate>("Coordinate", "coordinate_table")
                    .primary_key("x", |c| c.x, |c, v| c.x = v)
                    .column("y", |c| c.y, |c, v| c.y = v),
            )
            .unwrap();
        registry
            .register(
                TypeDescriptor::builder::<Via>("Via", "via_table")
                    .primary_key("name", |v| v.name.clone(), |v, n| v.name = n)
                    .composite("pos", |v| &v.pos, |v| &mut v.pos)
                    .vector("holes", |v| &v.holes, |v| &mut v.holes),
            )
            .unwrap();
        let port = registry
            .register(
                TypeDescriptor::builder::<Port>("Port", "port_table")
                    .primary_key("name", |p| p.name.clone(), |p, n| p.name = n)
                    .column("layer", |p| p.layer, |p, v| p.layer = v)
                    .vector("vias", |p| &p.vias, |p| &mut p.vias),
            )
            .unwrap();
        let tag = registry.register(TypeDescriptor::builder::<Tag>("Tag", "tag").primary_key("id", |t| t.id, |t, v| t.id = v)).unwrap();
        Fixture { coordinate, port, tag }
    }

    #[test]
    fn coordinate_create_table_text() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        assert_eq!(
            &*generator.create_table_statement(&f.coordinate),
            "CREATE TABLE IF NOT EXISTS \"coordinate_table\" (\"x\" INTEGER PRIMARY KEY, \"y\" INTEGER)"
        );
    }

    #[test]
    fn crud_statements_for_coordinate() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        assert_eq!(&*generator.insert_statement(&f.coordinate), "INSERT INTO \"coordinate_table\" (\"x\", \"y\") VALUES (:x, :y)");
        assert_eq!(
            generator.update_statement(&f.coordinate).as_deref(),
            Some("UPDATE \"coordinate_table\" SET \"y\" = :y WHERE \"x\" = :x")
        );
        assert_eq!(&*generator.delete_statement(&f.coordinate), "DELETE FROM \"coordinate_table\" WHERE \"x\" = :x");
        assert_eq!(&*generator.select_all_statement(&f.coordinate), "SELECT \"x\", \"y\" FROM \"coordinate_table\"");
        assert_eq!(
            &*generator.select_by_primary_key_statement(&f.coordinate),
            "SELECT \"x\", \"y\" FROM \"coordinate_table\" WHERE \"x\" = :x"
        );
        assert_eq!(&*generator.count_statement(&f.coordinate), "SELECT COUNT(*) FROM \"coordinate_table\"");
        assert_eq!(&*generator.drop_table_statement(&f.coordinate), "DROP TABLE IF EXISTS \"coordinate_table\"");
    }

    #[test]
    fn primary_key_never_lands_in_set_clause() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        let sql = generator.update_statement(&f.port).unwrap();
        let set_clause = sql.split(" WHERE ").next().unwrap();
        assert!(!set_clause.contains("\"name\""));
        assert!(generator.update_statement(&f.tag).is_none());
        assert!(matches!(
            generator.update_columns_statement(&f.port, &["layer", "name"]),
            Err(OrmError::PrimaryKeyImmutable { column, .. }) if column == "name"
        ));
        assert!(matches!(generator.update_columns_statement(&f.port, &["depth"]), Err(OrmError::UnknownColumn { .. })));
        assert_eq!(
            generator.update_columns_statement(&f.port, &["layer"]).unwrap(),
            "UPDATE \"port_table\" SET \"layer\" = :layer WHERE \"name\" = :name"
        );
    }

    #[test]
    fn vector_fields_stay_out_of_parent_table() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        assert_eq!(
            &*generator.create_table_statement(&f.port),
            "CREATE TABLE IF NOT EXISTS \"port_table\" (\"name\" VARCHAR PRIMARY KEY, \"layer\" INTEGER)"
        );
    }

    #[test]
    fn child_tables_carry_foreign_key_last() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        let node = TableNode::build(&f.port);
        let vias = &node.children[0].1.shape;
        assert_eq!(
            &*generator.create_table(vias),
            "CREATE TABLE IF NOT EXISTS \"port_table__vias\" (\"name\" VARCHAR UNIQUE, \"pos_x\" INTEGER, \"pos_y\" INTEGER, \
             \"port_table__name\" VARCHAR, FOREIGN KEY (\"port_table__name\") REFERENCES \"port_table\" (\"name\"))"
        );
        assert_eq!(
            &*generator.insert(vias),
            "INSERT INTO \"port_table__vias\" (\"name\", \"pos_x\", \"pos_y\", \"port_table__name\") \
             VALUES (:name, :pos_x, :pos_y, :port_table__name)"
        );
        assert_eq!(
            generator.select_by_parent(vias).as_deref(),
            Some(
                "SELECT \"name\", \"pos_x\", \"pos_y\", \"port_table__name\" FROM \"port_table__vias\" \
                 WHERE \"port_table__name\" = :port_table__name ORDER BY rowid"
            )
        );
        assert!(generator.select_by_parent(&node.shape).is_none());
    }

    #[test]
    fn grandchild_scope_nests_through_parent_rows() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        let node = TableNode::build(&f.port);
        let holes = &node.children[0].1.children[0].1.shape;
        assert_eq!(holes.table, "port_table__vias__holes");
        assert_eq!(
            generator.delete_by_scope(holes).as_deref(),
            Some(
                "DELETE FROM \"port_table__vias__holes\" WHERE \"port_table__vias__name\" IN \
                 (SELECT \"name\" FROM \"port_table__vias\" WHERE \"port_table__name\" = :port_table__name)"
            )
        );
        assert_eq!(scope_parameter(holes).as_deref(), Some(":port_table__name"));
        assert_eq!(
            &*generator.create_table(holes),
            "CREATE TABLE IF NOT EXISTS \"port_table__vias__holes\" (\"x\" INTEGER, \"y\" INTEGER, \"port_table__vias__name\" VARCHAR, \
             FOREIGN KEY (\"port_table__vias__name\") REFERENCES \"port_table__vias\" (\"name\"))"
        );
        assert!(generator.delete_by_scope(&node.shape).is_none());
    }

    #[test]
    fn generation_is_idempotent_and_cached() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        let first = generator.create_table_statement(&f.coordinate);
        let second = generator.create_table_statement(&f.coordinate);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(generator.cached_statements(), 1);
        let fresh = SqlGenerator::new(Backend::Sqlite);
        assert_eq!(first, fresh.create_table_statement(&f.coordinate));
    }

    #[test]
    fn where_predicate_is_passed_through() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Sqlite);
        assert_eq!(
            generator.select_where_statement(&f.coordinate, "\"y\" > 3"),
            "SELECT \"x\", \"y\" FROM \"coordinate_table\" WHERE \"y\" > 3"
        );
        assert_eq!(generator.select_where_statement(&f.coordinate, "  "), "SELECT \"x\", \"y\" FROM \"coordinate_table\"");
    }

    #[test]
    fn postgres_renders_its_own_column_types() {
        let f = fixture();
        let generator = SqlGenerator::new(Backend::Postgres);
        assert_eq!(
            &*generator.create_table_statement(&f.port),
            "CREATE TABLE IF NOT EXISTS \"port_table\" (\"name\" VARCHAR PRIMARY KEY, \"layer\" BIGINT)"
        );
        let node = TableNode::build(&f.port);
        assert!(!generator.select_by_parent(&node.children[0].1.shape).unwrap().contains("rowid"));
    }

    #[test]
    fn one_generator_serves_registries_describing_a_type_differently() {
        let full = Registry::new()
            .register(
                TypeDescriptor::builder::<Coordinate>("Coordinate", "coordinate_table")
                    .primary_key("x", |c| c.x, |c, v| c.x = v)
                    .column("y", |c| c.y, |c, v| c.y = v),
            )
            .unwrap();
        let key_only = Registry::new()
            .register(TypeDescriptor::builder::<Coordinate>("Coordinate", "coordinate_table").primary_key("x", |c| c.x, |c, v| c.x = v))
            .unwrap();
        let generator = SqlGenerator::new(Backend::Sqlite);
        assert_eq!(&*generator.insert_statement(&full), "INSERT INTO \"coordinate_table\" (\"x\", \"y\") VALUES (:x, :y)");
        assert_eq!(&*generator.insert_statement(&key_only), "INSERT INTO \"coordinate_table\" (\"x\") VALUES (:x)");
        assert_eq!(generator.cached_statements(), 2);
    }
}
