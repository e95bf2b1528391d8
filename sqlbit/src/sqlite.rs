use crate::config::SessionConfig;
use crate::connection::{Connection, DriverError};
use crate::error::{FailureKind, OrmError};
use crate::value::Value;
use rusqlite::types::{ToSql, ToSqlOutput, Value as DbValue, ValueRef};
use rusqlite::ErrorCode;

/// [`Connection`] over a single rusqlite handle.
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Opens the database named by `config` and applies its pragmas.
    pub fn open(config: &SessionConfig) -> Result<Self, OrmError> {
        let opened = if config.is_in_memory() {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&config.db_path)
        };
        let conn = opened.map_err(|e| classify(e).into_orm(&format!("open {}", config.db_path)))?;
        conn.busy_timeout(config.busy_timeout()).map_err(|e| classify(e).into_orm("busy_timeout"))?;
        let mut pragmas = vec![format!("PRAGMA foreign_keys = {}", if config.foreign_keys { "ON" } else { "OFF" })];
        pragmas.extend(config.pragmas.iter().map(|(key, value)| format!("PRAGMA {key} = {value}")));
        for pragma in &pragmas {
            conn.execute_batch(pragma).map_err(|e| classify(e).into_orm(pragma))?;
        }
        crate::info!("opened sqlite database {} (foreign_keys={})", config.db_path, config.foreign_keys);
        Ok(SqliteConnection { conn })
    }

    pub fn open_in_memory() -> Result<Self, OrmError> {
        Self::open(&SessionConfig::in_memory())
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        SqliteConnection { conn }
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

fn classify(e: rusqlite::Error) -> DriverError {
    let kind = match &e {
        rusqlite::Error::SqliteFailure(err, _) => match err.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => FailureKind::Busy,
            ErrorCode::ConstraintViolation => FailureKind::Constraint,
            _ => FailureKind::Other,
        },
        _ => FailureKind::Other,
    };
    DriverError::new(kind, e.to_string())
}

fn named(params: &[(String, Value)]) -> Vec<(&str, &dyn ToSql)> {
    params.iter().map(|(name, value)| (name.as_str(), value as &dyn ToSql)).collect()
}

fn to_value(cell: ValueRef<'_>) -> Result<Value, DriverError> {
    Ok(match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(
            std::str::from_utf8(t)
                .map_err(|e| DriverError::new(FailureKind::Other, format!("invalid utf-8 text: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    })
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(DbValue::Null),
            Value::Integer(i) => ToSqlOutput::Owned(DbValue::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(DbValue::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[(String, Value)]) -> Result<usize, DriverError> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(classify)?;
        stmt.execute(named(params).as_slice()).map_err(classify)
    }

    fn query(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Vec<Vec<Value>>, DriverError> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(classify)?;
        let width = stmt.column_count();
        let bound = named(params);
        let mut rows = stmt.query(bound.as_slice()).map_err(classify)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut record = Vec::with_capacity(width);
            for idx in 0..width {
                record.push(to_value(row.get_ref(idx).map_err(classify)?)?);
            }
            records.push(record);
        }
        Ok(records)
    }

    fn begin(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("BEGIN").map_err(classify)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("COMMIT").map_err(classify)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.conn.execute_batch("ROLLBACK").map_err(classify)
    }
}
