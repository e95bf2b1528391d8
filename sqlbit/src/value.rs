use crate::error::OrmError;
use crate::types::NativeType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend agnostic cell value carried by row buffers and statement parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// A Rust type that can live in a single column.
///
/// Types that do not override [`SqlValue::native_type`] report [`NativeType::Unknown`]
/// and are refused at registration.
pub trait SqlValue: Sized + 'static {
    fn native_type() -> NativeType {
        NativeType::Unknown
    }

    fn nullable() -> bool {
        false
    }

    fn into_value(self) -> Result<Value, OrmError>;

    fn from_value(value: Value) -> Result<Self, OrmError>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> Result<T, OrmError> {
    match found {
        Value::Null => Err(OrmError::UnexpectedNull { target: expected }),
        other => Err(OrmError::TypeMismatch { expected, found: other.kind_name().to_string() }),
    }
}

macro_rules! impl_sql_value_integer {
    ($t:ty, $native:ident) => {
        impl SqlValue for $t {
            fn native_type() -> NativeType {
                NativeType::$native
            }
            fn into_value(self) -> Result<Value, OrmError> {
                Ok(Value::Integer(i64::from(self)))
            }
            fn from_value(value: Value) -> Result<Self, OrmError> {
                match value {
                    Value::Integer(i) => <$t>::try_from(i)
                        .map_err(|_| OrmError::ValueOutOfRange { value: i.to_string(), target: stringify!($t) }),
                    other => mismatch(stringify!($t), &other),
                }
            }
        }
    };
}

impl_sql_value_integer!(i8, I8);
impl_sql_value_integer!(i16, I16);
impl_sql_value_integer!(i32, I32);
impl_sql_value_integer!(i64, I64);
impl_sql_value_integer!(u8, U8);
impl_sql_value_integer!(u16, U16);
impl_sql_value_integer!(u32, U32);

impl SqlValue for u64 {
    fn native_type() -> NativeType {
        NativeType::U64
    }
    fn into_value(self) -> Result<Value, OrmError> {
        i64::try_from(self)
            .map(Value::Integer)
            .map_err(|_| OrmError::ValueOutOfRange { value: self.to_string(), target: "INTEGER" })
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Integer(i) => u64::try_from(i).map_err(|_| OrmError::ValueOutOfRange { value: i.to_string(), target: "u64" }),
            other => mismatch("u64", &other),
        }
    }
}

impl SqlValue for bool {
    fn native_type() -> NativeType {
        NativeType::Bool
    }
    fn into_value(self) -> Result<Value, OrmError> {
        Ok(Value::Integer(i64::from(self)))
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Integer(i) => Ok(i != 0),
            other => mismatch("bool", &other),
        }
    }
}

impl SqlValue for f64 {
    fn native_type() -> NativeType {
        NativeType::F64
    }
    fn into_value(self) -> Result<Value, OrmError> {
        Ok(Value::Real(self))
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Real(r) => Ok(r),
            // integral reals may come back with integer storage class
            Value::Integer(i) => Ok(i as f64),
            other => mismatch("f64", &other),
        }
    }
}

impl SqlValue for f32 {
    fn native_type() -> NativeType {
        NativeType::F32
    }
    fn into_value(self) -> Result<Value, OrmError> {
        Ok(Value::Real(f64::from(self)))
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Real(r) => Ok(r as f32),
            Value::Integer(i) => Ok(i as f32),
            other => mismatch("f32", &other),
        }
    }
}

impl SqlValue for char {
    fn native_type() -> NativeType {
        NativeType::Char
    }
    fn into_value(self) -> Result<Value, OrmError> {
        Ok(Value::Text(self.to_string()))
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(OrmError::ValueOutOfRange { value: s, target: "char" }),
                }
            }
            other => mismatch("char", &other),
        }
    }
}

impl SqlValue for String {
    fn native_type() -> NativeType {
        NativeType::String
    }
    fn into_value(self) -> Result<Value, OrmError> {
        Ok(Value::Text(self))
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Text(s) => Ok(s),
            other => mismatch("String", &other),
        }
    }
}

impl SqlValue for Vec<u8> {
    fn native_type() -> NativeType {
        NativeType::Bytes
    }
    fn into_value(self) -> Result<Value, OrmError> {
        Ok(Value::Blob(self))
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Blob(b) => Ok(b),
            other => mismatch("Vec<u8>", &other),
        }
    }
}

impl<T: SqlValue> SqlValue for Option<T> {
    fn native_type() -> NativeType {
        T::native_type()
    }
    fn nullable() -> bool {
        true
    }
    fn into_value(self) -> Result<Value, OrmError> {
        match self {
            Some(v) => v.into_value(),
            None => Ok(Value::Null),
        }
    }
    fn from_value(value: Value) -> Result<Self, OrmError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
