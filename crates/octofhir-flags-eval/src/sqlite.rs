//! SQLite-backed query execution

use crate::error::{EvalError, EvalResult};
use crate::query::QueryExecutor;
use crate::types::Truth;
use octofhir_flags_logic::{PatientId, PatientRecord};
use parking_lot::Mutex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::Connection;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::rc::Rc;

/// [`QueryExecutor`] over a single SQLite connection
///
/// The connection is guarded by its own mutex, so a slow statement only blocks
/// other query evaluations.
pub struct SqliteQueryExecutor {
    conn: Mutex<Connection>,
}

impl SqliteQueryExecutor {
    /// Wrap an open connection and register the `rarray` table-valued function
    pub fn from_connection(conn: Connection) -> EvalResult<Self> {
        rusqlite::vtab::array::load_module(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref();
        log::info!("Opening patient database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> EvalResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// In-memory database with one table holding `records`
    ///
    /// Columns are the id column plus every attribute seen in any record.
    pub fn seeded(table: &str, id_column: &str, records: &[PatientRecord]) -> EvalResult<Self> {
        let executor = Self::open_in_memory()?;
        {
            let mut conn = executor.conn.lock();
            let mut columns: Vec<&str> = Vec::new();
            for record in records {
                for name in record.attributes.keys() {
                    if name != id_column && !columns.contains(&name.as_str()) {
                        columns.push(name);
                    }
                }
            }

            let mut ddl = format!("CREATE TABLE {} ({} INTEGER PRIMARY KEY", quote(table), quote(id_column));
            for column in &columns {
                ddl.push_str(", ");
                ddl.push_str(&quote(column));
            }
            ddl.push(')');

            let placeholders = vec!["?"; columns.len() + 1].join(", ");
            let mut names = vec![quote(id_column)];
            names.extend(columns.iter().map(|c| quote(c)));
            let insert = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                names.join(", "),
                placeholders
            );

            let tx = conn.transaction()?;
            tx.execute(&ddl, [])?;
            {
                let mut stmt = tx.prepare(&insert)?;
                for record in records {
                    let mut row = vec![Value::Integer(record.id.value())];
                    row.extend(columns.iter().map(|c| {
                        record
                            .get(c)
                            .map(|v| sql_value(&v.to_json()))
                            .unwrap_or(Value::Null)
                    }));
                    stmt.execute(rusqlite::params_from_iter(row))?;
                }
            }
            tx.commit()?;
            log::debug!("Seeded table {} with {} patients", table, records.len());
        }
        Ok(executor)
    }

    /// Run a batch of setup statements
    pub fn execute_batch(&self, sql: &str) -> EvalResult<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

/// SQL truthiness: NULL is indeterminate, numbers are true when non-zero
fn truth(value: ValueRef<'_>) -> Result<Truth, String> {
    match value {
        ValueRef::Null => Ok(Truth::Indeterminate),
        ValueRef::Integer(i) => Ok(Truth::from(i != 0)),
        ValueRef::Real(f) => Ok(Truth::from(f != 0.0)),
        other => Err(other.data_type().to_string()),
    }
}

impl QueryExecutor for SqliteQueryExecutor {
    fn prepare(&self, sql: &str) -> EvalResult<()> {
        self.conn.lock().prepare(sql)?;
        Ok(())
    }

    fn verdicts(&self, sql: &str, ids: &[PatientId]) -> EvalResult<Vec<(PatientId, Truth)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let ids: Rc<Vec<Value>> = Rc::new(ids.iter().map(|id| Value::Integer(id.value())).collect());

        let rows = stmt.query_map([ids], |row| {
            let id: i64 = row.get(0)?;
            Ok((id, truth(row.get_ref(1)?)))
        })?;

        let mut verdicts = Vec::new();
        for row in rows {
            let (id, verdict) = row?;
            let verdict = verdict.map_err(|found| EvalError::NonBoolean { patient: id, found })?;
            verdicts.push((PatientId(id), verdict));
        }
        Ok(verdicts)
    }
}
