//! One script execution with its timing summary.

use chrono::{DateTime, Local};
use orbis_config::ScriptConfig;
use orbis_core::{elapsed_seconds, format_timestamp, Console};
use orbis_session::Session;

use crate::interpreter::{read_source, Interpreter};
use crate::sql::SqlScript;
use crate::{ScriptError, ScriptMode};

/// Timing of a finished job.
#[derive(Debug, Clone)]
pub struct ScriptReport {
    pub mode: ScriptMode,
    pub started: DateTime<Local>,
    pub finished: DateTime<Local>,
}

impl ScriptReport {
    #[must_use]
    pub fn elapsed_seconds(&self) -> i64 {
        elapsed_seconds(&self.started, &self.finished)
    }

    #[must_use]
    pub fn finished_line(&self) -> String {
        format!(
            "Finished at {}, elapsed = {} seconds",
            format_timestamp(&self.finished),
            self.elapsed_seconds()
        )
    }
}

#[must_use]
pub fn started_line(started: &DateTime<Local>) -> String {
    format!("Started at {}", format_timestamp(started))
}

/// Run `mode` against `session`, writing the started/finished summary to `console`.
///
/// The script file is opened before the start timestamp is taken, so an
/// unreadable file produces no summary at all.
///
/// # Errors
///
/// [`ScriptError::OpenFailed`] when the file cannot be opened,
/// [`ScriptError::ReadFailed`] when its contents are not readable text,
/// [`ScriptError::Sql`] or [`ScriptError::Eval`] when execution fails, and
/// [`ScriptError::Session`] if the session is already closed.
pub fn run(
    mode: &ScriptMode,
    session: &Session,
    console: &Console,
    config: &ScriptConfig,
) -> Result<ScriptReport, ScriptError> {
    tracing::info!(%mode, session = session.id(), "script job starting");
    match mode {
        ScriptMode::DeclarativeQuery(path) => {
            let script = SqlScript::open(path)?;
            let conn = session.connection()?;
            timed(mode, console, || script.execute(conn))
        }
        ScriptMode::GeneralScript(path) => {
            let source = read_source(path)?;
            let interpreter = Interpreter::new(session, console, config)?;
            timed(mode, console, || interpreter.run(path, &source))
        }
    }
}

fn timed(
    mode: &ScriptMode,
    console: &Console,
    body: impl FnOnce() -> Result<(), ScriptError>,
) -> Result<ScriptReport, ScriptError> {
    let started = Local::now();
    console.println(started_line(&started))?;

    body()?;

    let report = ScriptReport {
        mode: mode.clone(),
        started,
        finished: Local::now(),
    };
    console.println(report.finished_line())?;
    tracing::info!(
        mode = mode.label(),
        elapsed_secs = report.elapsed_seconds(),
        "script job finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use chrono::TimeZone;
    use orbis_config::SessionConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    struct Fixture {
        dir: TempDir,
        session: Session,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().expect("tempdir should create");
            let config = SessionConfig {
                temp_dir: dir.path().to_string_lossy().into_owned(),
                load_spatial: false,
                ..SessionConfig::default()
            };
            let session = Session::create(&config, 1_000).expect("session opens");
            Self { dir, session }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn count(&self, table: &str) -> i64 {
            self.session
                .connection()
                .unwrap()
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap()
        }
    }

    fn line_times(stdout: &str) -> (String, String) {
        let lines: Vec<&str> = stdout.lines().collect();
        let started = lines
            .iter()
            .find_map(|line| line.strip_prefix("Started at "))
            .expect("started line");
        let finished = lines
            .iter()
            .find_map(|line| line.strip_prefix("Finished at "))
            .and_then(|rest| rest.split(',').next())
            .expect("finished line");
        (started.to_string(), finished.to_string())
    }

    #[test]
    fn sql_script_runs_against_the_session() {
        let mut fx = Fixture::new();
        let path = fx.write(
            "load.sql",
            "CREATE TABLE t(id INT); INSERT INTO t VALUES (1);",
        );
        let (console, captured) = Console::buffered();

        let report = run(
            &ScriptMode::DeclarativeQuery(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .expect("script runs");

        assert_eq!(fx.count("t"), 1);
        assert!(report.finished >= report.started);

        let stdout = captured.stdout();
        let started_at = stdout.find("Started at").expect("started printed");
        let finished_at = stdout.find("Finished at").expect("finished printed");
        assert!(started_at < finished_at);
        let (started, finished) = line_times(&stdout);
        assert!(finished >= started);
        assert!(stdout.contains("elapsed = 0 seconds"));

        fx.session.close().expect("session closes");
    }

    #[test]
    fn missing_sql_file_is_an_open_failure_without_summary() {
        let mut fx = Fixture::new();
        let (console, captured) = Console::buffered();

        let error = run(
            &ScriptMode::DeclarativeQuery(fx.dir.path().join("absent.sql")),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(error, ScriptError::OpenFailed { .. }));
        assert!(captured.stdout().is_empty());
        fx.session.close().expect("cleanup still succeeds");
    }

    #[test]
    fn failing_statement_is_reported_and_session_survives() {
        let mut fx = Fixture::new();
        let path = fx.write("broken.sql", "CREATE TABLE ok(x INT); SELEKT nonsense;");
        let (console, _captured) = Console::buffered();

        let error = run(
            &ScriptMode::DeclarativeQuery(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .unwrap_err();

        assert!(error.is_execution_failure());
        assert!(fx.session.engine_version().is_ok());
        fx.session.close().expect("session closes");
    }

    #[test]
    fn rhai_bindings_share_the_session_connection() {
        let mut fx = Fixture::new();
        let path = fx.write(
            "job.rhai",
            r#"
                db.execute_batch("CREATE TABLE points(id INT, label TEXT)");
                let inserted = db.execute("INSERT INTO points VALUES (1, 'a'), (2, 'b')");
                out.println(`inserted ${inserted}`);
                let rows = db.query("SELECT id, label FROM points ORDER BY id");
                out.println(rows[1].label);
                print(db.scalar("SELECT COUNT(*) FROM points"));
            "#,
        );
        let (console, captured) = Console::buffered();

        run(
            &ScriptMode::GeneralScript(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .expect("script runs");

        let stdout = captured.stdout();
        assert!(stdout.contains("inserted 2\n"));
        assert!(stdout.contains("b\n"));
        assert!(stdout.contains("2\n"));
        assert_eq!(fx.count("points"), 2);

        fx.session.close().expect("lent handle was released");
    }

    #[test]
    fn rhai_error_is_reported_not_raised() {
        let mut fx = Fixture::new();
        let path = fx.write("bad.rhai", "out.println(\"before\");\nundefined_fn();");
        let (console, captured) = Console::buffered();

        let error = run(
            &ScriptMode::GeneralScript(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(error, ScriptError::Eval { .. }));
        assert!(error.to_string().contains("undefined_fn"));
        assert!(captured.stdout().contains("before"));
        assert!(!captured.stdout().contains("Finished at"));
        fx.session.close().expect("session closes");
    }

    #[test]
    fn operation_limit_stops_runaway_scripts() {
        let mut fx = Fixture::new();
        let path = fx.write("spin.rhai", "let x = 0; loop { x += 1; }");
        let (console, _captured) = Console::buffered();
        let config = ScriptConfig {
            max_operations: 1_000,
        };

        let error = run(&ScriptMode::GeneralScript(path), &fx.session, &console, &config)
            .unwrap_err();

        assert!(matches!(error, ScriptError::Eval { .. }));
        fx.session.close().expect("session closes");
    }

    #[test]
    fn missing_rhai_file_is_an_open_failure() {
        let fx = Fixture::new();
        let (console, _captured) = Console::buffered();
        let error = run(
            &ScriptMode::GeneralScript(Path::new("/nonexistent/job.rhai").to_path_buf()),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(error, ScriptError::OpenFailed { .. }));
    }

    #[test]
    fn sql_file_with_invalid_utf8_is_a_read_failure() {
        let mut fx = Fixture::new();
        let path = fx.dir.path().join("latin1.sql");
        std::fs::write(&path, b"SELECT '\xff\xfe';").unwrap();
        let (console, captured) = Console::buffered();

        let error = run(
            &ScriptMode::DeclarativeQuery(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(error, ScriptError::ReadFailed { .. }));
        assert!(error.to_string().starts_with("cannot read script"));
        assert!(!captured.stdout().contains("Finished at"));
        fx.session.close().expect("session closes");
    }

    #[test]
    fn rhai_file_with_invalid_utf8_is_a_read_failure() {
        let fx = Fixture::new();
        let path = fx.dir.path().join("latin1.rhai");
        std::fs::write(&path, b"out.println(\"\xff\");").unwrap();
        let (console, captured) = Console::buffered();

        let error = run(
            &ScriptMode::GeneralScript(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(error, ScriptError::ReadFailed { .. }));
        assert!(captured.stdout().is_empty());
    }

    #[test]
    fn rhai_sees_temporal_decimal_and_nested_values_natively() {
        let mut fx = Fixture::new();
        let path = fx.write(
            "types.rhai",
            r#"
                let price = db.scalar("SELECT 1.5");
                out.println(`decimal ${type_of(price)} ${price + 1.0}`);
                let stamp = db.scalar("SELECT TIMESTAMP '2024-01-02 03:04:05'");
                out.println(`timestamp ${stamp}`);
                let day = db.scalar("SELECT DATE '2024-02-29'");
                out.println(`date ${day}`);
                let clock = db.scalar("SELECT TIME '12:34:56'");
                out.println(`time ${clock}`);
                let span = db.scalar("SELECT INTERVAL 3 DAY");
                out.println(`interval ${span.days}`);
                let record = db.scalar("SELECT {'a': 1, 'b': 'x'}");
                out.println(`struct ${record.a} ${record.b}`);
            "#,
        );
        let (console, captured) = Console::buffered();

        run(
            &ScriptMode::GeneralScript(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .expect("script runs");

        let stdout = captured.stdout();
        assert!(stdout.contains("decimal f64 2.5\n"), "{stdout}");
        assert!(stdout.contains("timestamp 2024-01-02 03:04:05\n"), "{stdout}");
        assert!(stdout.contains("date 2024-02-29\n"), "{stdout}");
        assert!(stdout.contains("time 12:34:56\n"), "{stdout}");
        assert!(stdout.contains("interval 3\n"), "{stdout}");
        assert!(stdout.contains("struct 1 x\n"), "{stdout}");
        fx.session.close().expect("session closes");
    }

    #[test]
    fn rhai_imports_resolve_next_to_the_script() {
        let mut fx = Fixture::new();
        fx.write("helper.rhai", "fn double(x) { x * 2 }");
        let path = fx.write(
            "main.rhai",
            "import \"helper\" as h;\nout.println(h::double(21));",
        );
        let (console, captured) = Console::buffered();

        run(
            &ScriptMode::GeneralScript(path),
            &fx.session,
            &console,
            &ScriptConfig::default(),
        )
        .expect("import resolves from the script directory");

        assert!(captured.stdout().contains("42\n"));
        fx.session.close().expect("session closes");
    }

    #[test]
    fn finished_line_truncates_elapsed() {
        let started = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let report = ScriptReport {
            mode: ScriptMode::DeclarativeQuery("x.sql".into()),
            started,
            finished: started + chrono::Duration::milliseconds(2_750),
        };
        assert_eq!(
            report.finished_line(),
            "Finished at 2024/01/02 03:04:07, elapsed = 2 seconds"
        );
        assert_eq!(started_line(&started), "Started at 2024/01/02 03:04:05");
    }
}
