//! Two-stage type mapping: native field type -> portable SQL type -> backend storage type.
//!
//! A new backend only needs a portable -> backend table, the native -> portable table is shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Native field types the mapper knows how to persist.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    Bytes,
    /// Value stored through a user supplied encode/decode pair.
    Opaque,
    Unknown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortableSqlType {
    Char,
    Varchar,
    Text,
    Binary,
    Varbinary,
    Blob,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Real,
    Double,
    Decimal,
    Boolean,
    Composite,
    Unknown,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend {
    Sqlite,
    Postgres,
}

/// Physical storage class a backend uses for a portable type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendStorageType {
    Null,
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
    Boolean,
    Composite,
}

pub fn to_portable_type(native: NativeType) -> PortableSqlType {
    match native {
        NativeType::Bool => PortableSqlType::Boolean,
        NativeType::I8 | NativeType::U8 => PortableSqlType::TinyInt,
        NativeType::I16 | NativeType::U16 => PortableSqlType::SmallInt,
        NativeType::I32 | NativeType::U32 => PortableSqlType::Integer,
        NativeType::I64 | NativeType::U64 => PortableSqlType::BigInt,
        NativeType::F32 => PortableSqlType::Float,
        NativeType::F64 => PortableSqlType::Double,
        NativeType::Char => PortableSqlType::Char,
        NativeType::String => PortableSqlType::Varchar,
        NativeType::Bytes => PortableSqlType::Blob,
        NativeType::Opaque => PortableSqlType::Composite,
        NativeType::Unknown => PortableSqlType::Unknown,
    }
}

pub fn to_backend_type(backend: Backend, portable: PortableSqlType) -> BackendStorageType {
    match backend {
        Backend::Sqlite => sqlite_storage(portable),
        Backend::Postgres => postgres_storage(portable),
    }
}

fn sqlite_storage(portable: PortableSqlType) -> BackendStorageType {
    use PortableSqlType::*;
    match portable {
        TinyInt | SmallInt | Integer | BigInt | Boolean => BackendStorageType::Integer,
        Float | Real | Double => BackendStorageType::Real,
        Decimal => BackendStorageType::Numeric,
        Char | Varchar | Text => BackendStorageType::Text,
        Binary | Varbinary | Blob => BackendStorageType::Blob,
        Composite => BackendStorageType::Composite,
        Unknown => BackendStorageType::Null,
    }
}

fn postgres_storage(portable: PortableSqlType) -> BackendStorageType {
    use PortableSqlType::*;
    match portable {
        TinyInt | SmallInt | Integer | BigInt => BackendStorageType::Integer,
        Boolean => BackendStorageType::Boolean,
        Float | Real | Double => BackendStorageType::Real,
        Decimal => BackendStorageType::Numeric,
        Char | Varchar | Text => BackendStorageType::Text,
        Binary | Varbinary | Blob => BackendStorageType::Blob,
        Composite => BackendStorageType::Composite,
        Unknown => BackendStorageType::Null,
    }
}

pub fn portable_type_string(portable: PortableSqlType) -> &'static str {
    use PortableSqlType::*;
    match portable {
        Char => "CHAR",
        Varchar => "VARCHAR",
        Text => "TEXT",
        Binary => "BINARY",
        Varbinary => "VARBINARY",
        Blob => "BLOB",
        TinyInt => "TINYINT",
        SmallInt => "SMALLINT",
        Integer => "INTEGER",
        BigInt => "BIGINT",
        Float => "FLOAT",
        Real => "REAL",
        Double => "DOUBLE",
        Decimal => "DECIMAL",
        Boolean => "BOOLEAN",
        Composite => "COMPOSITE",
        Unknown => "UNKNOWN",
    }
}

/// Column type text used in DDL for `portable` on `backend`.
pub fn backend_type_string(backend: Backend, portable: PortableSqlType) -> &'static str {
    use PortableSqlType::*;
    match backend {
        Backend::Sqlite => match portable {
            Char => "CHAR",
            Varchar => "VARCHAR",
            Text => "TEXT",
            Decimal => "NUMERIC",
            _ => match sqlite_storage(portable) {
                BackendStorageType::Integer => "INTEGER",
                BackendStorageType::Real => "REAL",
                BackendStorageType::Blob | BackendStorageType::Composite => "BLOB",
                _ => "NULL",
            },
        },
        Backend::Postgres => match portable {
            TinyInt | SmallInt => "SMALLINT",
            Integer => "INTEGER",
            BigInt => "BIGINT",
            Float | Real => "REAL",
            Double => "DOUBLE PRECISION",
            Decimal => "NUMERIC",
            Boolean => "BOOLEAN",
            Char => "CHAR(1)",
            Varchar => "VARCHAR",
            Text => "TEXT",
            Binary | Varbinary | Blob | Composite => "BYTEA",
            Unknown => "NULL",
        },
    }
}

impl NativeType {
    pub fn portable(self) -> PortableSqlType {
        to_portable_type(self)
    }
}

impl PortableSqlType {
    pub fn backend(self, backend: Backend) -> BackendStorageType {
        to_backend_type(backend, self)
    }

    pub fn is_supported(self) -> bool {
        self != PortableSqlType::Unknown
    }
}

impl fmt::Display for PortableSqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(portable_type_string(*self))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Postgres => f.write_str("postgres"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_NATIVE: [NativeType; 14] = [
        NativeType::Bool,
        NativeType::I8,
        NativeType::I16,
        NativeType::I32,
        NativeType::I64,
        NativeType::U8,
        NativeType::U16,
        NativeType::U32,
        NativeType::U64,
        NativeType::F32,
        NativeType::F64,
        NativeType::Char,
        NativeType::String,
        NativeType::Bytes,
    ];

    #[test]
    fn integers_render_integer_on_sqlite() {
        for native in [NativeType::I32, NativeType::I64, NativeType::U8, NativeType::I16, NativeType::Bool] {
            let portable = to_portable_type(native);
            assert_eq!(to_backend_type(Backend::Sqlite, portable), BackendStorageType::Integer);
            assert_eq!(backend_type_string(Backend::Sqlite, portable), "INTEGER");
        }
    }

    #[test]
    fn floats_render_real_and_strings_varchar() {
        assert_eq!(backend_type_string(Backend::Sqlite, to_portable_type(NativeType::F32)), "REAL");
        assert_eq!(backend_type_string(Backend::Sqlite, to_portable_type(NativeType::F64)), "REAL");
        assert_eq!(backend_type_string(Backend::Sqlite, to_portable_type(NativeType::String)), "VARCHAR");
        assert_eq!(to_backend_type(Backend::Sqlite, PortableSqlType::Varchar), BackendStorageType::Text);
    }

    #[test]
    fn mapping_is_deterministic() {
        for native in ALL_NATIVE {
            let first = (to_portable_type(native), backend_type_string(Backend::Sqlite, to_portable_type(native)));
            for _ in 0..3 {
                let again = (to_portable_type(native), backend_type_string(Backend::Sqlite, to_portable_type(native)));
                assert_eq!(first, again);
            }
            assert!(to_portable_type(native).is_supported(), "{native:?} must be mapped");
        }
    }

    #[test]
    fn opaque_values_use_blob_storage() {
        let portable = to_portable_type(NativeType::Opaque);
        assert_eq!(portable, PortableSqlType::Composite);
        assert_eq!(to_backend_type(Backend::Sqlite, portable), BackendStorageType::Composite);
        assert_eq!(backend_type_string(Backend::Sqlite, portable), "BLOB");
        assert_eq!(backend_type_string(Backend::Postgres, portable), "BYTEA");
    }

    #[test]
    fn unknown_stays_unknown() {
        let portable = to_portable_type(NativeType::Unknown);
        assert_eq!(portable, PortableSqlType::Unknown);
        assert!(!portable.is_supported());
        assert_eq!(to_backend_type(Backend::Sqlite, portable), BackendStorageType::Null);
    }

    #[test]
    fn postgres_table_differs_only_in_backend_stage() {
        assert_eq!(to_portable_type(NativeType::I64), PortableSqlType::BigInt);
        assert_eq!(backend_type_string(Backend::Postgres, PortableSqlType::BigInt), "BIGINT");
        assert_eq!(to_backend_type(Backend::Postgres, PortableSqlType::Boolean), BackendStorageType::Boolean);
        assert_eq!(backend_type_string(Backend::Postgres, PortableSqlType::Double), "DOUBLE PRECISION");
    }
}
