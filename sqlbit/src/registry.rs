use crate::descriptor::{TypeDescriptor, TypeDescriptorBuilder};
use crate::error::OrmError;
use crate::schema::TableNode;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Default)]
struct Entries {
    by_name: HashMap<String, Arc<TypeDescriptor>>,
    by_type: HashMap<TypeId, Arc<TypeDescriptor>>,
    order: Vec<String>,
}

/// Owner of all type descriptors. Types register leaf to root.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Entries>,
}

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Process wide registry used by [`crate::Session::connect`].
pub fn global() -> Arc<Registry> {
    GLOBAL.clone()
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: Default + 'static>(&self, builder: TypeDescriptorBuilder<E>) -> Result<Arc<TypeDescriptor>, OrmError> {
        let mut entries = self.entries.write()?;
        let descriptor = builder.build(|id| entries.by_type.get(&id).cloned())?;
        if entries.by_name.contains_key(descriptor.type_name()) || entries.by_type.contains_key(&descriptor.type_id()) {
            return Err(OrmError::AlreadyRegistered(descriptor.type_name().to_string()));
        }
        if let Some(taken) = entries.by_name.values().find(|d| d.table_name() == descriptor.table_name()) {
            return Err(OrmError::InvalidDescriptor {
                type_name: descriptor.type_name().to_string(),
                reason: format!("table `{}` already belongs to `{}`", descriptor.table_name(), taken.type_name()),
            });
        }
        let descriptor = Arc::new(descriptor);
        TableNode::build(&descriptor).validate()?;
        entries.by_name.insert(descriptor.type_name().to_string(), descriptor.clone());
        entries.by_type.insert(descriptor.type_id(), descriptor.clone());
        entries.order.push(descriptor.type_name().to_string());
        crate::info!(
            "registered {} as \"{}\" with {} columns and {} vector relations",
            descriptor.type_name(),
            descriptor.table_name(),
            descriptor.columns().len(),
            descriptor.vector_fields().len()
        );
        Ok(descriptor)
    }

    pub fn lookup(&self, type_name: &str) -> Result<Arc<TypeDescriptor>, OrmError> {
        self.entries.read()?.by_name.get(type_name).cloned().ok_or_else(|| OrmError::UnregisteredType(type_name.to_string()))
    }

    pub fn lookup_type<T: 'static>(&self) -> Result<Arc<TypeDescriptor>, OrmError> {
        self.lookup_type_id(TypeId::of::<T>()).map_err(|_| OrmError::UnregisteredType(std::any::type_name::<T>().to_string()))
    }

    pub(crate) fn lookup_type_id(&self, id: TypeId) -> Result<Arc<TypeDescriptor>, OrmError> {
        self.entries.read()?.by_type.get(&id).cloned().ok_or_else(|| OrmError::UnregisteredType(format!("{id:?}")))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.lookup_type_id(TypeId::of::<T>()).is_ok()
    }

    /// Registered type names in registration order.
    pub fn type_names(&self) -> Vec<String> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).order.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Via {
        name: String,
        x: i32,
    }

    #[derive(Default)]
    struct Port {
        name: String,
        vias: Vec<Via>,
    }

    fn via() -> TypeDescriptorBuilder<Via> {
        TypeDescriptor::builder::<Via>("Via", "via_table")
            .primary_key("name", |v| v.name.clone(), |v, n| v.name = n)
            .column("x", |v| v.x, |v, x| v.x = x)
    }

    fn port() -> TypeDescriptorBuilder<Port> {
        TypeDescriptor::builder::<Port>("Port", "port_table")
            .primary_key("name", |p| p.name.clone(), |p, n| p.name = n)
            .vector("vias", |p| &p.vias, |p| &mut p.vias)
    }

    #[test]
    fn it_should_register_leaf_to_root() {
        let registry = Registry::new();
        registry.register(via()).unwrap();
        let port = registry.register(port()).unwrap();
        assert_eq!(port.vector_fields()[0].descriptor.type_name(), "Via");
        assert_eq!(registry.type_names(), vec!["Via".to_string(), "Port".to_string()]);
        assert_eq!(registry.lookup("Port").unwrap().table_name(), "port_table");
        assert!(registry.contains::<Via>());
        assert_eq!(registry.lookup_type::<Port>().unwrap().type_name(), "Port");
    }

    #[test]
    fn it_should_refuse_root_before_leaf() {
        let registry = Registry::new();
        assert!(matches!(registry.register(port()), Err(OrmError::UnregisteredNestedType { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn it_should_refuse_double_registration() {
        let registry = Registry::new();
        registry.register(via()).unwrap();
        assert!(matches!(registry.register(via()), Err(OrmError::AlreadyRegistered(name)) if name == "Via"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn it_should_refuse_shared_table_names() {
        let registry = Registry::new();
        registry.register(via()).unwrap();
        let clash = TypeDescriptor::builder::<Port>("Port", "via_table").primary_key("name", |p| p.name.clone(), |p, n| p.name = n);
        assert!(matches!(registry.register(clash), Err(OrmError::InvalidDescriptor { .. })));
    }

    #[test]
    fn it_should_report_unknown_lookups() {
        let registry = Registry::new();
        assert!(matches!(registry.lookup("Nope"), Err(OrmError::UnregisteredType(_))));
        assert!(matches!(registry.lookup_type::<Port>(), Err(OrmError::UnregisteredType(_))));
    }

    #[test]
    fn it_should_refuse_foreign_keys_clashing_with_grandchild_columns() {
        #[derive(Default)]
        struct Hole {
            id: i32,
            owner: String,
        }

        #[derive(Default)]
        struct Pad {
            name: String,
            holes: Vec<Hole>,
        }

        #[derive(Default)]
        struct Net {
            name: String,
            pads: Vec<Pad>,
        }

        let registry = Registry::new();
        registry
            .register(
                TypeDescriptor::builder::<Hole>("Hole", "hole_table")
                    .primary_key("id", |h| h.id, |h, v| h.id = v)
                    .column("net_table__pads__name", |h| h.owner.clone(), |h, v| h.owner = v),
            )
            .unwrap();
        registry
            .register(
                TypeDescriptor::builder::<Pad>("Pad", "pad_table")
                    .primary_key("name", |p| p.name.clone(), |p, v| p.name = v)
                    .vector("holes", |p| &p.holes, |p| &mut p.holes),
            )
            .unwrap();
        let net = TypeDescriptor::builder::<Net>("Net", "net_table")
            .primary_key("name", |n| n.name.clone(), |n, v| n.name = v)
            .vector("pads", |n| &n.pads, |n| &mut n.pads);
        let err = registry.register(net).unwrap_err();
        assert!(
            matches!(&err, OrmError::DuplicateFieldName { type_name, name } if type_name == "net_table__pads__holes" && name == "net_table__pads__name"),
            "{err}"
        );
        assert!(!registry.contains::<Net>());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn it_should_list_types_after_a_poisoned_write() {
        let registry = Registry::new();
        registry.register(via()).unwrap();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = registry.entries.write().unwrap();
            panic!("writer died");
        }));
        assert!(matches!(registry.lookup("Via"), Err(OrmError::Poisoned(_))));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.type_names(), vec!["Via".to_string()]);
    }
}
