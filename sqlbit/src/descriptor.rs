//! Runtime description of a mapped type: its table, primary key, scalar columns,
//! flattened composites and one-to-many vector relations.
//!
//! Accessors are type erased behind `&dyn Any` so that generator, relation manager
//! and session can walk descriptors of different Rust types uniformly.

use crate::codec::ExternalCodec;
use crate::error::OrmError;
use crate::naming::{child_table_name, flattened_column, foreign_key_column};
use crate::types::{NativeType, PortableSqlType};
use crate::value::{SqlValue, Value};
use std::any::{type_name, Any, TypeId};
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type ScalarGet = Arc<dyn Fn(&dyn Any) -> Result<Value, OrmError> + Send + Sync>;
type ScalarSet = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), OrmError> + Send + Sync>;
type NestedGet = Arc<dyn for<'a> Fn(&'a dyn Any) -> Result<&'a dyn Any, OrmError> + Send + Sync>;
type NestedSet = Arc<dyn Fn(&mut dyn Any, Box<dyn Any>) -> Result<(), OrmError> + Send + Sync>;
type ElementsGet = Arc<dyn for<'a> Fn(&'a dyn Any) -> Result<Vec<&'a dyn Any>, OrmError> + Send + Sync>;
type ElementsSet = Arc<dyn Fn(&mut dyn Any, Vec<Box<dyn Any>>) -> Result<(), OrmError> + Send + Sync>;

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

fn downcast<E: 'static>(entity: &dyn Any) -> Result<&E, OrmError> {
    entity
        .downcast_ref::<E>()
        .ok_or_else(|| OrmError::TypeMismatch { expected: type_name::<E>(), found: "foreign entity".to_string() })
}

fn downcast_mut<E: 'static>(entity: &mut dyn Any) -> Result<&mut E, OrmError> {
    entity
        .downcast_mut::<E>()
        .ok_or_else(|| OrmError::TypeMismatch { expected: type_name::<E>(), found: "foreign entity".to_string() })
}

fn seed<E: Default + 'static>() -> Box<dyn Any> {
    Box::new(E::default())
}

fn unbox<C: 'static>(boxed: Box<dyn Any>) -> Result<C, OrmError> {
    boxed
        .downcast::<C>()
        .map(|b| *b)
        .map_err(|_| OrmError::TypeMismatch { expected: type_name::<C>(), found: "foreign entity".to_string() })
}

// pins the higher ranked signature the closures need
fn nested_get<F>(f: F) -> NestedGet
where
    F: for<'a> Fn(&'a dyn Any) -> Result<&'a dyn Any, OrmError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn elements_get<F>(f: F) -> ElementsGet
where
    F: for<'a> Fn(&'a dyn Any) -> Result<Vec<&'a dyn Any>, OrmError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// One column backed by one field of the owning type.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub column_name: String,
    pub native_type: NativeType,
    pub portable_type: PortableSqlType,
    pub is_primary_key: bool,
    pub nullable: bool,
    rust_type: &'static str,
    get: ScalarGet,
    set: ScalarSet,
}

impl FieldDescriptor {
    /// Reads the field of `entity` as a cell value.
    pub fn get(&self, entity: &dyn Any) -> Result<Value, OrmError> {
        (self.get)(entity)
    }

    /// Writes a cell value into the field of `entity`.
    pub fn set(&self, entity: &mut dyn Any, value: Value) -> Result<(), OrmError> {
        (self.set)(entity, value)
    }

    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("column_name", &self.column_name)
            .field("portable_type", &self.portable_type)
            .field("is_primary_key", &self.is_primary_key)
            .field("nullable", &self.nullable)
            .finish()
    }
}

/// A single embedded object whose columns are flattened into the owner's table.
#[derive(Clone)]
pub struct CompositeField {
    pub name: String,
    pub descriptor: Arc<TypeDescriptor>,
    get: NestedGet,
    set: NestedSet,
}

impl CompositeField {
    pub fn get<'a>(&self, entity: &'a dyn Any) -> Result<&'a dyn Any, OrmError> {
        (self.get)(entity)
    }

    pub fn set(&self, entity: &mut dyn Any, nested: Box<dyn Any>) -> Result<(), OrmError> {
        (self.set)(entity, nested)
    }
}

impl fmt::Debug for CompositeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeField")
            .field("name", &self.name)
            .field("type_name", &self.descriptor.type_name())
            .finish()
    }
}

/// A one-to-many relation stored in its own child table.
#[derive(Clone)]
pub struct VectorField {
    pub name: String,
    pub descriptor: Arc<TypeDescriptor>,
    /// Child table and foreign key names when the owner is a root table.
    /// Nested owners get longer names, see [`crate::schema::TableShape::child`].
    pub child_table: String,
    pub foreign_key: String,
    get: ElementsGet,
    set: ElementsSet,
}

impl VectorField {
    pub fn elements<'a>(&self, entity: &'a dyn Any) -> Result<Vec<&'a dyn Any>, OrmError> {
        (self.get)(entity)
    }

    pub fn set_elements(&self, entity: &mut dyn Any, elements: Vec<Box<dyn Any>>) -> Result<(), OrmError> {
        (self.set)(entity, elements)
    }
}

impl fmt::Debug for VectorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorField")
            .field("name", &self.name)
            .field("type_name", &self.descriptor.type_name())
            .field("child_table", &self.child_table)
            .field("foreign_key", &self.foreign_key)
            .finish()
    }
}

/// A physical column of the owner's table after composite flattening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub portable_type: PortableSqlType,
    pub primary_key: bool,
    pub nullable: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Scalar(usize),
    Composite(usize),
}

/// Immutable metadata of one mapped type, owned by the registry.
pub struct TypeDescriptor {
    id: u64,
    type_name: String,
    table_name: String,
    type_id: TypeId,
    rust_type: &'static str,
    seed: fn() -> Box<dyn Any>,
    scalar_fields: Vec<FieldDescriptor>,
    composite_fields: Vec<CompositeField>,
    vector_fields: Vec<VectorField>,
    layout: Vec<Slot>,
    columns: Vec<Column>,
}

impl TypeDescriptor {
    pub fn builder<E: Default + 'static>(type_name: &str, table_name: &str) -> TypeDescriptorBuilder<E> {
        TypeDescriptorBuilder {
            type_name: type_name.to_string(),
            table_name: table_name.to_string(),
            members: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Process unique identity of this descriptor, distinct even for the same
    /// Rust type described in two registries.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn rust_type(&self) -> &'static str {
        self.rust_type
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.scalar_fields[0]
    }

    /// Scalar fields, primary key first.
    pub fn scalar_fields(&self) -> &[FieldDescriptor] {
        &self.scalar_fields
    }

    pub fn composite_fields(&self) -> &[CompositeField] {
        &self.composite_fields
    }

    pub fn vector_fields(&self) -> &[VectorField] {
        &self.vector_fields
    }

    /// Flattened columns in table order, primary key first.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_vectors(&self) -> bool {
        !self.vector_fields.is_empty()
    }

    /// Fresh default instance of the described type.
    pub fn new_instance(&self) -> Box<dyn Any> {
        (self.seed)()
    }

    pub(crate) fn layout(&self) -> &[Slot] {
        &self.layout
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("columns", &self.columns)
            .field("vector_fields", &self.vector_fields)
            .finish()
    }
}

enum Member {
    Scalar(FieldDescriptor),
    Composite { name: String, nested: TypeId, nested_name: &'static str, get: NestedGet, set: NestedSet },
    Vector { name: String, child: TypeId, child_name: &'static str, get: ElementsGet, set: ElementsSet },
}

impl Member {
    fn name(&self) -> &str {
        match self {
            Member::Scalar(f) => &f.name,
            Member::Composite { name, .. } | Member::Vector { name, .. } => name,
        }
    }
}

/// Collects fields of `E` in declaration order; validated when the registry builds it.
pub struct TypeDescriptorBuilder<E> {
    type_name: String,
    table_name: String,
    members: Vec<Member>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Default + 'static> TypeDescriptorBuilder<E> {
    pub fn primary_key<V: SqlValue + Clone>(self, name: &str, get: fn(&E) -> V, set: fn(&mut E, V)) -> Self {
        self.scalar(name, true, get, set)
    }

    pub fn column<V: SqlValue + Clone>(self, name: &str, get: fn(&E) -> V, set: fn(&mut E, V)) -> Self {
        self.scalar(name, false, get, set)
    }

    fn scalar<V: SqlValue + Clone>(mut self, name: &str, is_primary_key: bool, get: fn(&E) -> V, set: fn(&mut E, V)) -> Self {
        let native_type = V::native_type();
        self.members.push(Member::Scalar(FieldDescriptor {
            name: name.to_string(),
            column_name: name.to_string(),
            native_type,
            portable_type: native_type.portable(),
            is_primary_key,
            nullable: V::nullable(),
            rust_type: type_name::<V>(),
            get: Arc::new(move |entity: &dyn Any| get(downcast::<E>(entity)?).into_value()),
            set: Arc::new(move |entity: &mut dyn Any, value: Value| {
                let v = V::from_value(value)?;
                set(downcast_mut::<E>(entity)?, v);
                Ok(())
            }),
        }));
        self
    }

    /// Field stored as one blob column through `codec`.
    pub fn external<V: 'static>(mut self, name: &str, codec: ExternalCodec<V>, get: fn(&E) -> &V, set: fn(&mut E, V)) -> Self {
        self.members.push(Member::Scalar(FieldDescriptor {
            name: name.to_string(),
            column_name: name.to_string(),
            native_type: NativeType::Opaque,
            portable_type: NativeType::Opaque.portable(),
            is_primary_key: false,
            nullable: false,
            rust_type: type_name::<V>(),
            get: Arc::new(move |entity: &dyn Any| (codec.encode)(get(downcast::<E>(entity)?)).map(Value::Blob)),
            set: Arc::new(move |entity: &mut dyn Any, value: Value| match value {
                Value::Blob(bytes) => {
                    let v = (codec.decode)(&bytes)?;
                    set(downcast_mut::<E>(entity)?, v);
                    Ok(())
                }
                Value::Null => Err(OrmError::UnexpectedNull { target: type_name::<V>() }),
                other => Err(OrmError::TypeMismatch { expected: "BLOB", found: other.kind_name().to_string() }),
            }),
        }));
        self
    }

    /// Single embedded object of a registered type, flattened into this table.
    pub fn composite<C: Default + 'static>(mut self, name: &str, get: fn(&E) -> &C, get_mut: fn(&mut E) -> &mut C) -> Self {
        self.members.push(Member::Composite {
            name: name.to_string(),
            nested: TypeId::of::<C>(),
            nested_name: type_name::<C>(),
            get: nested_get(move |entity| Ok(get(downcast::<E>(entity)?) as &dyn Any)),
            set: Arc::new(move |entity: &mut dyn Any, nested: Box<dyn Any>| {
                let c = unbox::<C>(nested)?;
                *get_mut(downcast_mut::<E>(entity)?) = c;
                Ok(())
            }),
        });
        self
    }

    /// Ordered collection of a registered type, stored in a child table.
    pub fn vector<C: Default + 'static>(mut self, name: &str, get: fn(&E) -> &Vec<C>, get_mut: fn(&mut E) -> &mut Vec<C>) -> Self {
        self.members.push(Member::Vector {
            name: name.to_string(),
            child: TypeId::of::<C>(),
            child_name: type_name::<C>(),
            get: elements_get(move |entity| Ok(get(downcast::<E>(entity)?).iter().map(|c| c as &dyn Any).collect())),
            set: Arc::new(move |entity: &mut dyn Any, elements: Vec<Box<dyn Any>>| {
                let items = elements.into_iter().map(unbox::<C>).collect::<Result<Vec<C>, _>>()?;
                *get_mut(downcast_mut::<E>(entity)?) = items;
                Ok(())
            }),
        });
        self
    }

    fn invalid(&self, reason: impl Into<String>) -> OrmError {
        OrmError::InvalidDescriptor { type_name: self.type_name.clone(), reason: reason.into() }
    }

    /// Validates and freezes the descriptor, resolving nested types through `resolve`.
    pub(crate) fn build<R>(self, resolve: R) -> Result<TypeDescriptor, OrmError>
    where
        R: Fn(TypeId) -> Option<Arc<TypeDescriptor>>,
    {
        if self.type_name.trim().is_empty() {
            return Err(self.invalid("type name is empty"));
        }
        if self.table_name.trim().is_empty() {
            return Err(self.invalid("table name is empty"));
        }

        let mut names = HashSet::new();
        for member in &self.members {
            if member.name().is_empty() {
                return Err(self.invalid("field name is empty"));
            }
            if !names.insert(member.name().to_string()) {
                return Err(OrmError::DuplicateFieldName { type_name: self.type_name.clone(), name: member.name().to_string() });
            }
            if let Member::Scalar(field) = member {
                if !field.portable_type.is_supported() {
                    return Err(OrmError::UnsupportedFieldType {
                        type_name: self.type_name.clone(),
                        field: field.name.clone(),
                        rust_type: field.rust_type,
                    });
                }
            }
        }

        let keys: Vec<&FieldDescriptor> = self
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Scalar(f) if f.is_primary_key => Some(f),
                _ => None,
            })
            .collect();
        let pk = match keys.as_slice() {
            [] => return Err(self.invalid("missing primary key")),
            [pk] => (*pk).clone(),
            _ => return Err(self.invalid("more than one primary key")),
        };
        if pk.portable_type == PortableSqlType::Composite {
            return Err(self.invalid(format!("primary key `{}` cannot be composite", pk.name)));
        }
        if pk.nullable {
            return Err(self.invalid(format!("primary key `{}` cannot be nullable", pk.name)));
        }

        let mut scalar_fields = vec![pk];
        let mut composite_fields = Vec::new();
        let mut vector_fields = Vec::new();
        let mut layout = vec![Slot::Scalar(0)];

        for member in self.members.iter() {
            match member {
                Member::Scalar(field) if field.is_primary_key => {}
                Member::Scalar(field) => {
                    layout.push(Slot::Scalar(scalar_fields.len()));
                    scalar_fields.push(field.clone());
                }
                Member::Composite { name, nested, nested_name, get, set } => {
                    let descriptor = resolve(*nested).ok_or_else(|| OrmError::UnregisteredNestedType {
                        type_name: self.type_name.clone(),
                        field: name.clone(),
                        nested: *nested_name,
                    })?;
                    if descriptor.has_vectors() {
                        return Err(self.invalid(format!(
                            "composite `{}` of type `{}` carries vector fields",
                            name,
                            descriptor.type_name()
                        )));
                    }
                    layout.push(Slot::Composite(composite_fields.len()));
                    composite_fields.push(CompositeField { name: name.clone(), descriptor, get: get.clone(), set: set.clone() });
                }
                Member::Vector { name, child, child_name, get, set } => {
                    let descriptor = resolve(*child).ok_or_else(|| OrmError::UnregisteredNestedType {
                        type_name: self.type_name.clone(),
                        field: name.clone(),
                        nested: *child_name,
                    })?;
                    vector_fields.push(VectorField {
                        name: name.clone(),
                        descriptor,
                        child_table: child_table_name(&self.table_name, name),
                        foreign_key: foreign_key_column(&self.table_name, &scalar_fields[0].column_name),
                        get: get.clone(),
                        set: set.clone(),
                    });
                }
            }
        }

        let mut columns = Vec::new();
        for slot in &layout {
            match *slot {
                Slot::Scalar(i) => {
                    let f = &scalar_fields[i];
                    columns.push(Column {
                        name: f.column_name.clone(),
                        portable_type: f.portable_type,
                        primary_key: f.is_primary_key,
                        nullable: f.nullable,
                    });
                }
                Slot::Composite(i) => {
                    let cf = &composite_fields[i];
                    for nested in cf.descriptor.columns() {
                        columns.push(Column {
                            name: flattened_column(&cf.name, &nested.name),
                            portable_type: nested.portable_type,
                            primary_key: false,
                            nullable: nested.nullable,
                        });
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(OrmError::DuplicateFieldName { type_name: self.type_name.clone(), name: column.name.clone() });
            }
        }

        Ok(TypeDescriptor {
            id: NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed),
            type_name: self.type_name,
            table_name: self.table_name,
            type_id: TypeId::of::<E>(),
            rust_type: type_name::<E>(),
            seed: seed::<E>,
            scalar_fields,
            composite_fields,
            vector_fields,
            layout,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Marker {
        label: String,
        pos: Point,
        weight: Option<f64>,
    }

    fn point() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptor::builder::<Point>("Point", "point_table")
                .primary_key("x", |p| p.x, |p, v| p.x = v)
                .column("y", |p| p.y, |p, v| p.y = v)
                .build(|_| None)
                .unwrap(),
        )
    }

    fn resolve_point(point: Arc<TypeDescriptor>) -> impl Fn(TypeId) -> Option<Arc<TypeDescriptor>> {
        move |id| (id == TypeId::of::<Point>()).then(|| point.clone())
    }

    #[test]
    fn primary_key_is_moved_first() {
        let desc = TypeDescriptor::builder::<Point>("Point", "point_table")
            .column("y", |p| p.y, |p, v| p.y = v)
            .primary_key("x", |p| p.x, |p, v| p.x = v)
            .build(|_| None)
            .unwrap();
        assert_eq!(desc.primary_key().name, "x");
        let names: Vec<&str> = desc.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(desc.columns()[0].primary_key);
    }

    #[test]
    fn composite_columns_are_flattened_in_declaration_order() {
        let desc = TypeDescriptor::builder::<Marker>("Marker", "marker_table")
            .primary_key("label", |m| m.label.clone(), |m, v| m.label = v)
            .composite("pos", |m| &m.pos, |m| &mut m.pos)
            .column("weight", |m| m.weight, |m, v| m.weight = v)
            .build(resolve_point(point()))
            .unwrap();
        let names: Vec<&str> = desc.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["label", "pos_x", "pos_y", "weight"]);
        assert!(!desc.columns()[1].primary_key);
        assert!(desc.column("weight").unwrap().nullable);
    }

    #[test]
    fn accessors_read_and_write_through_any() {
        let desc = point();
        let mut instance = desc.new_instance();
        desc.scalar_fields()[1].set(instance.as_mut(), Value::Integer(9)).unwrap();
        assert_eq!(desc.scalar_fields()[1].get(instance.as_ref()).unwrap(), Value::Integer(9));
        assert_eq!(instance.downcast_ref::<Point>(), Some(&Point { x: 0, y: 9 }));
        let wrong = Marker::default();
        assert!(matches!(desc.primary_key().get(&wrong), Err(OrmError::TypeMismatch { .. })));
    }

    #[test]
    fn missing_or_duplicate_primary_key_is_rejected() {
        let none = TypeDescriptor::builder::<Point>("Point", "point_table").column("y", |p| p.y, |p, v| p.y = v).build(|_| None);
        assert!(matches!(none, Err(OrmError::InvalidDescriptor { .. })));
        let two = TypeDescriptor::builder::<Point>("Point", "point_table")
            .primary_key("x", |p| p.x, |p, v| p.x = v)
            .primary_key("y", |p| p.y, |p, v| p.y = v)
            .build(|_| None);
        assert!(matches!(two, Err(OrmError::InvalidDescriptor { .. })));
    }

    #[test]
    fn empty_table_name_is_rejected() {
        let built = TypeDescriptor::builder::<Point>("Point", " ").primary_key("x", |p| p.x, |p, v| p.x = v).build(|_| None);
        assert!(matches!(built, Err(OrmError::InvalidDescriptor { .. })));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let fields = TypeDescriptor::builder::<Point>("Point", "point_table")
            .primary_key("x", |p| p.x, |p, v| p.x = v)
            .column("x", |p| p.y, |p, v| p.y = v)
            .build(|_| None);
        assert!(matches!(fields, Err(OrmError::DuplicateFieldName { .. })));

        let flattened = TypeDescriptor::builder::<Marker>("Marker", "marker_table")
            .primary_key("label", |m| m.label.clone(), |m, v| m.label = v)
            .composite("pos", |m| &m.pos, |m| &mut m.pos)
            .column("pos_x", |m| m.weight, |m, v| m.weight = v)
            .build(resolve_point(point()));
        assert!(matches!(flattened, Err(OrmError::DuplicateFieldName { name, .. }) if name == "pos_x"));
    }

    #[test]
    fn nested_types_must_be_registered_first() {
        let built = TypeDescriptor::builder::<Marker>("Marker", "marker_table")
            .primary_key("label", |m| m.label.clone(), |m, v| m.label = v)
            .composite("pos", |m| &m.pos, |m| &mut m.pos)
            .build(|_| None);
        assert!(matches!(built, Err(OrmError::UnregisteredNestedType { field, .. }) if field == "pos"));
    }

    #[test]
    fn unknown_and_nullable_keys_are_refused() {
        #[derive(Clone, Default)]
        struct Celsius(i32);
        impl SqlValue for Celsius {
            fn into_value(self) -> Result<Value, OrmError> {
                Ok(Value::Integer(i64::from(self.0)))
            }
            fn from_value(value: Value) -> Result<Self, OrmError> {
                i32::from_value(value).map(Celsius)
            }
        }
        #[derive(Default)]
        struct Reading {
            id: Option<i64>,
            temp: Celsius,
        }
        let unknown = TypeDescriptor::builder::<Reading>("Reading", "reading")
            .primary_key("id", |r| r.id.unwrap_or_default(), |r, v| r.id = Some(v))
            .column("temp", |r| r.temp.clone(), |r, v| r.temp = v)
            .build(|_| None);
        assert!(matches!(unknown, Err(OrmError::UnsupportedFieldType { field, .. }) if field == "temp"));

        let nullable = TypeDescriptor::builder::<Reading>("Reading", "reading").primary_key("id", |r| r.id, |r, v| r.id = v).build(|_| None);
        assert!(matches!(nullable, Err(OrmError::InvalidDescriptor { .. })));
    }

    #[test]
    fn vector_fields_know_their_child_table() {
        #[derive(Default)]
        struct Path {
            name: String,
            points: Vec<Point>,
        }
        let desc = TypeDescriptor::builder::<Path>("Path", "path_table")
            .primary_key("name", |p| p.name.clone(), |p, v| p.name = v)
            .vector("points", |p| &p.points, |p| &mut p.points)
            .build(resolve_point(point()))
            .unwrap();
        let vf = &desc.vector_fields()[0];
        assert_eq!(vf.child_table, "path_table__points");
        assert_eq!(vf.foreign_key, "path_table__name");
        assert_eq!(desc.columns().len(), 1);

        let path = Path { name: "p".into(), points: vec![Point { x: 1, y: 2 }, Point { x: 3, y: 4 }] };
        assert_eq!(vf.elements(&path).unwrap().len(), 2);
    }
}
