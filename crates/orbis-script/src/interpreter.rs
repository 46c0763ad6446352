//! Rhai scripts with access to the console and the session connection.
//!
//! Two values are bound into the script scope:
//!
//! - `out`: `out.println(value)` and `out.eprintln(value)`
//! - `db`: `db.execute(sql)`, `db.execute_batch(sql)`, `db.query(sql)` and
//!   `db.scalar(sql)`, all running on the session's own connection
//!
//! `print` and `debug` are routed to the same console as `out`, and
//! `import "name"` loads `name.rhai` from the script's own directory.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta};
use duckdb::types::Value;
use orbis_config::ScriptConfig;
use orbis_core::Console;
use orbis_session::{Session, SharedConnection};
use rhai::module_resolvers::FileModuleResolver;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope};

use crate::ScriptError;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Output sink bound as `out`.
#[derive(Clone)]
pub struct OutputSink {
    console: Console,
}

impl OutputSink {
    fn println(&mut self, value: Dynamic) -> ScriptResult<()> {
        self.console
            .println(value)
            .map_err(|error| error.to_string().into())
    }

    fn eprintln(&mut self, value: Dynamic) -> ScriptResult<()> {
        self.console
            .eprintln(value)
            .map_err(|error| error.to_string().into())
    }
}

/// Query handle bound as `db`.
#[derive(Clone)]
pub struct QueryHandle {
    conn: SharedConnection,
}

impl QueryHandle {
    fn execute(&mut self, sql: &str) -> ScriptResult<i64> {
        let changed = self.conn.execute(sql, []).map_err(engine_error)?;
        Ok(i64::try_from(changed).unwrap_or(i64::MAX))
    }

    fn execute_batch(&mut self, sql: &str) -> ScriptResult<()> {
        self.conn.execute_batch(sql).map_err(engine_error)
    }

    fn query(&mut self, sql: &str) -> ScriptResult<Array> {
        let mut stmt = self.conn.prepare(sql).map_err(engine_error)?;
        let mut rows = stmt.query([]).map_err(engine_error)?;
        let columns = rows
            .as_ref()
            .map(|stmt| stmt.column_names())
            .unwrap_or_default();

        let mut records = Array::new();
        while let Some(row) = rows.next().map_err(engine_error)? {
            let mut record = Map::new();
            for (index, name) in columns.iter().enumerate() {
                let value: Value = row.get(index).map_err(engine_error)?;
                record.insert(name.as_str().into(), to_dynamic(value));
            }
            records.push(Dynamic::from_map(record));
        }
        Ok(records)
    }

    fn scalar(&mut self, sql: &str) -> ScriptResult<Dynamic> {
        let mut stmt = self.conn.prepare(sql).map_err(engine_error)?;
        let mut rows = stmt.query([]).map_err(engine_error)?;
        match rows.next().map_err(engine_error)? {
            Some(row) => {
                let value: Value = row.get(0).map_err(engine_error)?;
                Ok(to_dynamic(value))
            }
            None => Ok(Dynamic::UNIT),
        }
    }
}

fn engine_error(error: duckdb::Error) -> Box<EvalAltResult> {
    error.to_string().into()
}

fn to_dynamic(value: Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Boolean(flag) => Dynamic::from_bool(flag),
        Value::TinyInt(n) => Dynamic::from_int(n.into()),
        Value::SmallInt(n) => Dynamic::from_int(n.into()),
        Value::Int(n) => Dynamic::from_int(n.into()),
        Value::BigInt(n) => Dynamic::from_int(n),
        Value::UTinyInt(n) => Dynamic::from_int(n.into()),
        Value::USmallInt(n) => Dynamic::from_int(n.into()),
        Value::UInt(n) => Dynamic::from_int(n.into()),
        Value::UBigInt(n) => i64::try_from(n).map_or_else(|_| n.to_string().into(), Dynamic::from_int),
        Value::HugeInt(n) => i64::try_from(n).map_or_else(|_| n.to_string().into(), Dynamic::from_int),
        Value::Float(n) => Dynamic::from_float(n.into()),
        Value::Double(n) => Dynamic::from_float(n),
        // Rhai has no decimal type; the exact digits survive as text if the
        // float parse ever fails.
        Value::Decimal(n) => {
            let digits = n.to_string();
            digits
                .parse::<f64>()
                .map_or_else(|_| digits.into(), Dynamic::from_float)
        }
        Value::Text(text) | Value::Enum(text) => text.into(),
        Value::Blob(bytes) => Dynamic::from_blob(bytes),
        Value::Date32(days) => date_text(days),
        Value::Timestamp(unit, amount) => timestamp_text(unit.to_micros(amount)),
        Value::Time64(unit, amount) => time_text(unit.to_micros(amount)),
        Value::Interval {
            months,
            days,
            nanos,
        } => {
            let mut parts = Map::new();
            parts.insert("months".into(), Dynamic::from_int(months.into()));
            parts.insert("days".into(), Dynamic::from_int(days.into()));
            parts.insert("nanos".into(), Dynamic::from_int(nanos));
            Dynamic::from_map(parts)
        }
        Value::List(items) | Value::Array(items) => {
            Dynamic::from_array(items.into_iter().map(to_dynamic).collect())
        }
        Value::Struct(fields) => Dynamic::from_map(
            fields
                .iter()
                .map(|(name, field)| (name.as_str().into(), to_dynamic(field.clone())))
                .collect(),
        ),
        Value::Map(entries) => Dynamic::from_map(
            entries
                .iter()
                .map(|(key, entry)| {
                    (
                        to_dynamic(key.clone()).to_string().into(),
                        to_dynamic(entry.clone()),
                    )
                })
                .collect(),
        ),
        Value::Union(inner) => to_dynamic(*inner),
        other => format!("{other:?}").into(),
    }
}

/// `DATE` as `YYYY-MM-DD`.
fn date_text(days_since_epoch: i32) -> Dynamic {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_signed(TimeDelta::days(days_since_epoch.into())))
        .map_or_else(
            || days_since_epoch.to_string().into(),
            |date| date.format("%Y-%m-%d").to_string().into(),
        )
}

/// `TIMESTAMP` as `YYYY-MM-DD HH:MM:SS[.fff]`, the way DuckDB prints it.
fn timestamp_text(micros: i64) -> Dynamic {
    DateTime::from_timestamp_micros(micros).map_or_else(
        || micros.to_string().into(),
        |stamp| stamp.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string().into(),
    )
}

/// `TIME` as `HH:MM:SS[.fff]`.
fn time_text(micros: i64) -> Dynamic {
    let seconds = u32::try_from(micros.div_euclid(1_000_000)).ok();
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok();
    seconds
        .zip(nanos)
        .and_then(|(seconds, nanos)| NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos))
        .map_or_else(
            || micros.to_string().into(),
            |time| time.format("%H:%M:%S%.f").to_string().into(),
        )
}

/// A configured interpreter for one general-purpose script.
pub struct Interpreter {
    engine: Engine,
    sink: OutputSink,
    handle: QueryHandle,
}

impl Interpreter {
    /// # Errors
    ///
    /// Returns [`ScriptError::Session`] if the session is already closed.
    pub fn new(
        session: &Session,
        console: &Console,
        config: &ScriptConfig,
    ) -> Result<Self, ScriptError> {
        let handle = QueryHandle {
            conn: session.share()?,
        };
        let sink = OutputSink {
            console: console.clone(),
        };

        let mut engine = Engine::new();
        if let Some(limit) = config.operation_limit() {
            engine.set_max_operations(limit);
        }

        let print_console = console.clone();
        engine.on_print(move |text| {
            let _ = print_console.println(text);
        });
        let debug_console = console.clone();
        engine.on_debug(move |text, _source, position| {
            let _ = debug_console.eprintln(format!("[{position}] {text}"));
        });

        engine
            .register_type_with_name::<OutputSink>("OutputSink")
            .register_fn("println", OutputSink::println)
            .register_fn("eprintln", OutputSink::eprintln);
        engine
            .register_type_with_name::<QueryHandle>("QueryHandle")
            .register_fn("execute", QueryHandle::execute)
            .register_fn("execute_batch", QueryHandle::execute_batch)
            .register_fn("query", QueryHandle::query)
            .register_fn("scalar", QueryHandle::scalar);

        Ok(Self {
            engine,
            sink,
            handle,
        })
    }

    /// Evaluate `source`. Consumes the interpreter so the lent connection
    /// handle is released as soon as evaluation ends. `import` statements
    /// resolve relative to the directory holding `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Eval`] with the interpreter's diagnostic.
    pub fn run(self, path: &Path, source: &str) -> Result<(), ScriptError> {
        let Self {
            mut engine,
            sink,
            handle,
        } = self;

        let base = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        engine.set_module_resolver(FileModuleResolver::new_with_path(base));

        let mut scope = Scope::new();
        scope.push("out", sink);
        scope.push("db", handle);

        tracing::debug!(path = %path.display(), "evaluating rhai script");
        engine
            .run_with_scope(&mut scope, source)
            .map_err(|error| ScriptError::Eval {
                path: path.to_path_buf(),
                message: error.to_string(),
            })
    }
}

/// Read a general-purpose script into memory.
///
/// # Errors
///
/// Returns [`ScriptError::OpenFailed`] if the file cannot be opened and
/// [`ScriptError::ReadFailed`] if its contents cannot be read as UTF-8 text.
pub fn read_source(path: &Path) -> Result<String, ScriptError> {
    let mut file = File::open(path).map_err(|source| ScriptError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut source = String::new();
    file.read_to_string(&mut source)
        .map_err(|error| ScriptError::ReadFailed {
            path: path.to_path_buf(),
            source: error,
        })?;
    Ok(source)
}
