//! sqlbit maps plain Rust structs onto relational tables through runtime type descriptors.
//!
//! A [`TypeDescriptor`] lists a struct's scalar, composite and vector fields together with
//! accessor functions. Once registered in a [`Registry`], the [`SqlGenerator`] derives DDL and DML
//! for it, composites are flattened into prefixed columns and vectors get child tables
//! linked by a foreign key column. A [`Session`] executes the generated statements over SQLite
//! via `rusqlite`, cascading writes into child tables and loading vectors back in insertion order.
//!

pub mod cache;
pub mod codec;
pub mod config;
pub mod connection;
pub mod descriptor;
pub mod error;
pub mod generator;
pub mod logger;
pub mod macro_rules;
pub mod naming;
pub mod registry;
pub mod relation;
pub mod retry;
pub mod row;
pub mod schema;
pub mod session;
pub mod sqlite;
pub mod types;
pub mod value;

pub use bincode;
pub use chrono;
pub use once_cell;
pub use rusqlite;
pub use serde;
pub use serde_json;

pub use cache::{CacheKey, StatementCache};
pub use codec::ExternalCodec;
pub use crate::config::{load_config, SessionConfig};
pub use connection::{Connection, DriverError};
pub use descriptor::{Column, CompositeField, FieldDescriptor, TypeDescriptor, TypeDescriptorBuilder, VectorField};
pub use error::{FailureKind, OrmError};
pub use generator::{SqlGenerator, StatementKind};
pub use registry::{global, Registry};
pub use relation::{Operation, RelationManager, Statement, UpdatePlan};
pub use retry::{retry_with_delay, RetryPolicy};
pub use row::{from_row, to_row, Row};
pub use schema::{TableNode, TableShape};
pub use session::Session;
pub use sqlite::SqliteConnection;
pub use types::{Backend, BackendStorageType, NativeType, PortableSqlType};
pub use value::{SqlValue, Value};
