use crate::config::SessionConfig;
use crate::connection::{Connection, DriverError};
use crate::descriptor::TypeDescriptor;
use crate::error::{FailureKind, OrmError};
use crate::generator::SqlGenerator;
use crate::registry::{self, Registry};
use crate::relation::{Operation, RelationManager, Statement};
use crate::retry::{retry_with_delay, RetryPolicy};
use crate::row::{from_row, to_row, Row};
use crate::schema::TableNode;
use crate::sqlite::SqliteConnection;
use crate::types::Backend;
use crate::value::{SqlValue, Value};
use crate::{debug, error};
use std::any::{type_name, Any};
use std::sync::Arc;

/// Executes generated statements for registered types over one connection.
///
/// Cascades are not wrapped in a transaction; use [`Session::transaction`] when
/// a multi-table write must be atomic.
pub struct Session<C: Connection = SqliteConnection> {
    connection: C,
    registry: Arc<Registry>,
    generator: SqlGenerator,
    retry: RetryPolicy,
    in_transaction: bool,
}

impl Session<SqliteConnection> {
    /// Opens a SQLite session bound to the process wide registry.
    pub fn connect(connection_string: &str) -> Result<Self, OrmError> {
        let config: SessionConfig = connection_string.parse()?;
        Self::open(&config, registry::global())
    }

    pub fn open(config: &SessionConfig, registry: Arc<Registry>) -> Result<Self, OrmError> {
        let connection = SqliteConnection::open(config)?;
        Ok(Session {
            connection,
            registry,
            generator: SqlGenerator::with_cache_capacity(Backend::Sqlite, config.statement_cache_size),
            retry: config.retry_policy(),
            in_transaction: false,
        })
    }
}

impl<C: Connection> Session<C> {
    pub fn new(connection: C, registry: Arc<Registry>) -> Self {
        Session { connection, registry, generator: SqlGenerator::new(Backend::Sqlite), retry: RetryPolicy::none(), in_transaction: false }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn generator(&self) -> &SqlGenerator {
        &self.generator
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn create_tables<T: 'static>(&mut self) -> Result<(), OrmError> {
        let desc = self.descriptor::<T>()?;
        let plan = RelationManager::new(&self.generator).create_plan(&desc);
        self.run_cascade(&plan, 0).map(|_| ())
    }

    pub fn drop_tables<T: 'static>(&mut self) -> Result<(), OrmError> {
        let desc = self.descriptor::<T>()?;
        let plan = RelationManager::new(&self.generator).drop_plan(&desc);
        self.run_cascade(&plan, 0).map(|_| ())
    }

    pub fn insert<T: 'static>(&mut self, entity: &T) -> Result<(), OrmError> {
        let desc = self.descriptor::<T>()?;
        let plan = RelationManager::new(&self.generator).insert_plan(&desc, entity)?;
        self.run_cascade(&plan, 0).map(|_| ())
    }

    /// Rewrites the row keyed by `entity`'s primary key and replaces its vector contents.
    /// Returns `false` when no such row exists, in which case nothing is written.
    pub fn update<T: 'static>(&mut self, entity: &T) -> Result<bool, OrmError> {
        let desc = self.descriptor::<T>()?;
        let plan = RelationManager::new(&self.generator).update_plan(&desc, entity)?;
        let start = match &plan.root {
            Some(root) => {
                if self.execute(root)? == 0 {
                    return Ok(false);
                }
                1
            }
            None => {
                if !self.exists_key(&desc, desc.primary_key().get(entity)?)? {
                    return Ok(false);
                }
                0
            }
        };
        self.run_cascade(&plan.children, start)?;
        Ok(true)
    }

    /// Updates the row stored under `key` with the contents of `entity`,
    /// which must carry the same key.
    pub fn update_by_key<T: 'static, K: SqlValue>(&mut self, key: K, entity: &T) -> Result<bool, OrmError> {
        let desc = self.descriptor::<T>()?;
        let key = key.into_value()?;
        let pk = desc.primary_key();
        if pk.get(entity)? != key {
            return Err(OrmError::PrimaryKeyImmutable { table: desc.table_name().to_string(), column: pk.column_name.clone() });
        }
        self.update(entity)
    }

    /// Writes only `columns` of `entity`; vector fields are untouched.
    pub fn update_columns<T: 'static>(&mut self, entity: &T, columns: &[&str]) -> Result<bool, OrmError> {
        let desc = self.descriptor::<T>()?;
        let sql = self.generator.update_columns_statement(&desc, columns)?;
        let key_column = desc.primary_key().column_name.clone();
        let params = to_row(&desc, entity)?
            .into_params()
            .into_iter()
            .filter(|(name, _)| name[1..] == key_column || columns.contains(&&name[1..]))
            .collect();
        let statement = Statement { table: desc.table_name().to_string(), operation: Operation::Update, sql: Arc::from(sql), params };
        Ok(self.execute(&statement)? > 0)
    }

    pub fn delete<T: 'static>(&mut self, entity: &T) -> Result<bool, OrmError> {
        let desc = self.descriptor::<T>()?;
        let key = desc.primary_key().get(entity)?;
        self.delete_descriptor(&desc, key)
    }

    pub fn delete_by_key<T: 'static, K: SqlValue>(&mut self, key: K) -> Result<bool, OrmError> {
        let desc = self.descriptor::<T>()?;
        self.delete_descriptor(&desc, key.into_value()?)
    }

    fn delete_descriptor(&mut self, desc: &Arc<TypeDescriptor>, key: Value) -> Result<bool, OrmError> {
        let plan = RelationManager::new(&self.generator).delete_plan(desc, key);
        let affected = self.run_cascade(&plan, 0)?;
        Ok(affected.last().is_some_and(|n| *n > 0))
    }

    pub fn select_all<T: 'static>(&mut self) -> Result<Vec<T>, OrmError> {
        let desc = self.descriptor::<T>()?;
        let statement = RelationManager::new(&self.generator).select_all(&desc);
        self.load_all(&desc, &statement)
    }

    pub fn select_by_key<T: 'static, K: SqlValue>(&mut self, key: K) -> Result<Option<T>, OrmError> {
        let desc = self.descriptor::<T>()?;
        let statement = RelationManager::new(&self.generator).select_by_key(&desc, key.into_value()?);
        Ok(self.load_all(&desc, &statement)?.pop())
    }

    /// Rows matching a caller supplied SQL predicate; `params` bind its `:name` placeholders.
    pub fn select_where<T: 'static>(&mut self, predicate: &str, params: &[(&str, Value)]) -> Result<Vec<T>, OrmError> {
        let desc = self.descriptor::<T>()?;
        let params = params.iter().map(|(name, value)| (name.to_string(), value.clone())).collect();
        let statement = RelationManager::new(&self.generator).select_where(&desc, predicate, params);
        self.load_all(&desc, &statement)
    }

    pub fn count<T: 'static>(&mut self) -> Result<u64, OrmError> {
        let desc = self.descriptor::<T>()?;
        let statement = RelationManager::new(&self.generator).count(&desc);
        let records = self.query(&statement)?;
        match records.into_iter().next().and_then(|r| r.into_iter().next()) {
            Some(value) => u64::from_value(value),
            None => Ok(0),
        }
    }

    pub fn exists<T: 'static, K: SqlValue>(&mut self, key: K) -> Result<bool, OrmError> {
        let desc = self.descriptor::<T>()?;
        self.exists_key(&desc, key.into_value()?)
    }

    fn exists_key(&mut self, desc: &Arc<TypeDescriptor>, key: Value) -> Result<bool, OrmError> {
        let statement = RelationManager::new(&self.generator).select_by_key(desc, key);
        Ok(!self.query(&statement)?.is_empty())
    }

    /// Runs `work` inside BEGIN/COMMIT, rolling back when it fails.
    /// Nested calls join the outer transaction.
    pub fn transaction<R, F>(&mut self, work: F) -> Result<R, OrmError>
    where
        F: FnOnce(&mut Self) -> Result<R, OrmError>,
    {
        if self.in_transaction {
            return work(self);
        }
        self.connection.begin().map_err(|e| e.into_orm("BEGIN"))?;
        self.in_transaction = true;
        let outcome = work(self);
        self.in_transaction = false;
        match outcome {
            Ok(value) => match self.connection.commit() {
                Ok(()) => Ok(value),
                Err(e) => {
                    self.rollback_quietly();
                    Err(e.into_orm("COMMIT"))
                }
            },
            Err(e) => {
                self.rollback_quietly();
                Err(e)
            }
        }
    }

    fn rollback_quietly(&mut self) {
        if let Err(e) = self.connection.rollback() {
            error!("rollback failed: {}", e);
        }
    }

    fn descriptor<T: 'static>(&self) -> Result<Arc<TypeDescriptor>, OrmError> {
        self.registry.lookup_type::<T>()
    }

    fn execute(&mut self, statement: &Statement) -> Result<usize, OrmError> {
        debug!("{}", statement);
        let RetryPolicy { attempts, delay } = self.retry;
        let connection = &mut self.connection;
        retry_with_delay(attempts, delay, || connection.execute(&statement.sql, &statement.params), is_busy)
            .map_err(|e| e.into_orm(&statement.sql))
    }

    fn query(&mut self, statement: &Statement) -> Result<Vec<Vec<Value>>, OrmError> {
        debug!("{}", statement);
        let RetryPolicy { attempts, delay } = self.retry;
        let connection = &mut self.connection;
        retry_with_delay(attempts, delay, || connection.query(&statement.sql, &statement.params), is_busy)
            .map_err(|e| e.into_orm(&statement.sql))
    }

    /// Executes `steps`, numbering them from `first`. A failure after any step
    /// has succeeded is reported as a partial cascade.
    fn run_cascade(&mut self, steps: &[Statement], first: usize) -> Result<Vec<usize>, OrmError> {
        let total = first + steps.len();
        let mut affected = Vec::with_capacity(steps.len());
        for (offset, statement) in steps.iter().enumerate() {
            let step = first + offset;
            match self.execute(statement) {
                Ok(n) => affected.push(n),
                Err(e) if step == 0 => return Err(e),
                Err(e) => {
                    error!("cascade stopped at step {} of {} on {}: {}", step, total, statement.table, e);
                    return Err(OrmError::PartialCascadeFailure { step, total, table: statement.table.clone(), source: Box::new(e) });
                }
            }
        }
        Ok(affected)
    }

    fn load_all<T: 'static>(&mut self, desc: &Arc<TypeDescriptor>, statement: &Statement) -> Result<Vec<T>, OrmError> {
        let node = TableNode::build(desc);
        self.load(&node, statement)?
            .into_iter()
            .map(|boxed| {
                boxed
                    .downcast::<T>()
                    .map(|b| *b)
                    .map_err(|_| OrmError::TypeMismatch { expected: type_name::<T>(), found: desc.type_name().to_string() })
            })
            .collect()
    }

    fn load(&mut self, node: &TableNode, statement: &Statement) -> Result<Vec<Box<dyn Any>>, OrmError> {
        let desc = node.shape.descriptor.clone();
        let names = node.shape.column_names();
        let records = self.query(statement)?;
        let mut instances = Vec::with_capacity(records.len());
        for record in records {
            let row = Row::from_columns(&names, record);
            let mut instance = from_row(&desc, &row)?;
            if !node.children.is_empty() {
                let key = desc.primary_key().get(instance.as_ref())?;
                for (idx, child) in &node.children {
                    let Some(select) = RelationManager::new(&self.generator).select_children(child, key.clone()) else {
                        continue;
                    };
                    let elements = self.load(child, &select)?;
                    desc.vector_fields()[*idx].set_elements(instance.as_mut(), elements)?;
                }
            }
            instances.push(instance);
        }
        Ok(instances)
    }
}

fn is_busy(e: &DriverError) -> bool {
    e.kind == FailureKind::Busy
}
