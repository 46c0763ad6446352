//! # orbis-session
//!
//! One ephemeral, file-backed `DuckDB` database per invocation.
//!
//! The backing file lives in the temp directory under
//! `<prefix>_<processStartMillis>.<ext>`, so two invocations started at
//! different instants never share a file. The engine runs single-threaded with
//! a zero checkpoint threshold, which keeps the write-ahead log empty after
//! every commit; durability beyond process lifetime is not a goal.
//!
//! A [`Session`] owns exactly one [`duckdb::Connection`]. Callers borrow it
//! through [`Session::connection`] or lend a shared handle through
//! [`Session::share`]; [`Session::close`] releases it once and is a no-op on
//! later calls. Dropping an open session closes it as a last resort.

pub mod error;

pub use error::SessionError;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use duckdb::{AccessMode, Config, Connection};
use orbis_config::SessionConfig;

/// Connection handle lent to code that outlives a plain borrow.
pub type SharedConnection = Rc<Connection>;

const SPATIAL_EXTENSION: &str = "spatial";

/// Engine options applied on top of the typed settings.
const ENGINE_SETTINGS: &[(&str, &str)] = &[
    // checkpoint on every commit so no WAL outlives a statement
    ("checkpoint_threshold", "0KB"),
];

/// Backing file for a session started at `started_at_millis`.
#[must_use]
pub fn backing_file_path(
    dir: &Path,
    prefix: &str,
    extension: &str,
    started_at_millis: i64,
) -> PathBuf {
    dir.join(format!("{prefix}_{started_at_millis}.{extension}"))
}

/// Write-ahead log that `DuckDB` keeps next to a database file.
fn wal_path(path: &Path) -> PathBuf {
    let mut wal = path.as_os_str().to_owned();
    wal.push(".wal");
    PathBuf::from(wal)
}

pub struct Session {
    id: String,
    path: PathBuf,
    conn: Option<SharedConnection>,
    remove_on_close: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create the invocation's session.
    ///
    /// Removes any stale file at the derived path, opens the engine with the
    /// throwaway settings and loads the spatial extension when configured.
    ///
    /// # Errors
    ///
    /// Every failure here satisfies [`SessionError::is_creation_failure`].
    pub fn create(config: &SessionConfig, started_at_millis: i64) -> Result<Self, SessionError> {
        let dir = config.resolved_temp_dir();
        std::fs::create_dir_all(&dir).map_err(|source| SessionError::TempDir {
            path: dir.clone(),
            source,
        })?;

        let path = backing_file_path(
            &dir,
            &config.file_prefix,
            &config.file_extension,
            started_at_millis,
        );
        remove_stale(&path)?;
        remove_stale(&wal_path(&path))?;

        let conn = open_connection(&path, config)?;
        if config.load_spatial {
            load_spatial(&conn, config.install_spatial)?;
        }

        let id = format!("{}_{started_at_millis}", config.file_prefix);
        tracing::debug!(session = %id, path = %path.display(), "session opened");

        Ok(Self {
            id,
            path,
            conn: Some(Rc::new(conn)),
            remove_on_close: config.remove_on_close,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn backing_path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Borrow the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after [`Self::close`].
    pub fn connection(&self) -> Result<&Connection, SessionError> {
        self.conn
            .as_deref()
            .ok_or_else(|| SessionError::Closed(self.id.clone()))
    }

    /// Lend the live connection to a holder that needs `'static` access.
    ///
    /// The handle must be dropped before [`Self::close`]; the session stays
    /// the only owner allowed to close it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] after [`Self::close`].
    pub fn share(&self) -> Result<SharedConnection, SessionError> {
        self.conn
            .clone()
            .ok_or_else(|| SessionError::Closed(self.id.clone()))
    }

    /// Version string reported by the engine.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] or the engine's query error.
    pub fn engine_version(&self) -> Result<String, SessionError> {
        let version = self
            .connection()?
            .query_row("SELECT version()", [], |row| row.get::<_, String>(0))?;
        Ok(version)
    }

    /// Close the connection. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Close`] when the engine reports a failure or a
    /// lent handle is still alive. The session counts as closed either way.
    pub fn close(&mut self) -> Result<(), SessionError> {
        let Some(shared) = self.conn.take() else {
            return Ok(());
        };

        let result = match Rc::try_unwrap(shared) {
            Ok(conn) => conn.close().map_err(|(_, error)| SessionError::Close {
                id: self.id.clone(),
                reason: error.to_string(),
            }),
            Err(still_lent) => {
                drop(still_lent);
                Err(SessionError::Close {
                    id: self.id.clone(),
                    reason: "connection is still lent out".to_string(),
                })
            }
        };

        if self.remove_on_close {
            for path in [self.path.clone(), wal_path(&self.path)] {
                if let Err(error) = std::fs::remove_file(&path)
                    && error.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(path = %path.display(), %error, "could not remove backing file");
                }
            }
        }

        tracing::debug!(session = %self.id, "session closed");
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_open()
            && let Err(error) = self.close()
        {
            tracing::warn!(%error, "session close on drop failed");
        }
    }
}

fn remove_stale(path: &Path) -> Result<(), SessionError> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale backing file");
            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SessionError::StaleFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn open_connection(path: &Path, config: &SessionConfig) -> Result<Connection, SessionError> {
    let mut engine = Config::default()
        .access_mode(AccessMode::ReadWrite)
        .map_err(|source| SessionError::Configure {
            setting: "access_mode",
            source,
        })?
        .threads(i64::from(config.threads))
        .map_err(|source| SessionError::Configure {
            setting: "threads",
            source,
        })?;

    for &(setting, value) in ENGINE_SETTINGS {
        engine = engine
            .with(setting, value)
            .map_err(|source| SessionError::Configure { setting, source })?;
    }

    Connection::open_with_flags(path, engine).map_err(|source| SessionError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn load_spatial(conn: &Connection, install: bool) -> Result<(), SessionError> {
    if install {
        conn.execute_batch(&format!("INSTALL {SPATIAL_EXTENSION};"))
            .map_err(SessionError::SpatialExtension)?;
    }
    conn.execute_batch(&format!("LOAD {SPATIAL_EXTENSION};"))
        .map_err(SessionError::SpatialExtension)?;
    tracing::debug!("spatial extension loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn offline_config(dir: &TempDir) -> SessionConfig {
        SessionConfig {
            temp_dir: dir.path().to_string_lossy().into_owned(),
            load_spatial: false,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn backing_path_embeds_prefix_and_start_millis() {
        let path = backing_file_path(Path::new("/tmp"), "orbis", "duckdb", 1_700_000_000_123);
        assert_eq!(path, PathBuf::from("/tmp/orbis_1700000000123.duckdb"));
    }

    #[test]
    fn distinct_start_times_never_collide() {
        let dir = Path::new("/tmp");
        let first = backing_file_path(dir, "orbis", "duckdb", 1_000);
        let second = backing_file_path(dir, "orbis", "duckdb", 1_001);
        assert_ne!(first, second);
    }

    #[test]
    fn create_opens_a_usable_connection() {
        let dir = TempDir::new().expect("tempdir should create");
        let mut session = Session::create(&offline_config(&dir), 42).expect("session opens");

        assert_eq!(session.id(), "orbis_42");
        assert_eq!(session.backing_path(), dir.path().join("orbis_42.duckdb"));

        let conn = session.connection().unwrap();
        conn.execute_batch("CREATE TABLE t(id INTEGER); INSERT INTO t VALUES (1), (2);")
            .unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
        assert!(session.backing_path().exists());

        session.close().expect("close succeeds");
    }

    #[test]
    fn stale_file_at_derived_path_is_replaced() {
        let dir = TempDir::new().expect("tempdir should create");
        let stale = dir.path().join("orbis_7.duckdb");
        std::fs::write(&stale, b"not a database").unwrap();

        let mut session = Session::create(&offline_config(&dir), 7).expect("session opens");
        assert!(session.engine_version().unwrap().starts_with('v'));
        session.close().unwrap();
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_use() {
        let dir = TempDir::new().expect("tempdir should create");
        let mut session = Session::create(&offline_config(&dir), 9).unwrap();

        session.close().expect("first close");
        session.close().expect("second close is a no-op");
        assert!(!session.is_open());
        assert!(matches!(session.connection(), Err(SessionError::Closed(_))));
    }

    #[test]
    fn backing_file_is_kept_unless_configured_otherwise() {
        let dir = TempDir::new().expect("tempdir should create");

        let mut kept = Session::create(&offline_config(&dir), 1).unwrap();
        kept.connection().unwrap().execute_batch("CREATE TABLE k(x INT)").unwrap();
        kept.close().unwrap();
        assert!(dir.path().join("orbis_1.duckdb").exists());

        let config = SessionConfig {
            remove_on_close: true,
            ..offline_config(&dir)
        };
        let mut removed = Session::create(&config, 2).unwrap();
        removed.connection().unwrap().execute_batch("CREATE TABLE r(x INT)").unwrap();
        removed.close().unwrap();
        assert!(!dir.path().join("orbis_2.duckdb").exists());
    }

    #[test]
    fn closing_while_lent_reports_cleanup_failure() {
        let dir = TempDir::new().expect("tempdir should create");
        let mut session = Session::create(&offline_config(&dir), 3).unwrap();
        let lent = session.share().unwrap();

        let error = session.close().unwrap_err();
        assert!(!error.is_creation_failure());
        assert!(!session.is_open());
        drop(lent);
    }

    #[test]
    fn drop_closes_an_open_session() {
        let dir = TempDir::new().expect("tempdir should create");
        let config = SessionConfig {
            remove_on_close: true,
            ..offline_config(&dir)
        };
        {
            let session = Session::create(&config, 5).unwrap();
            session.connection().unwrap().execute_batch("CREATE TABLE d(x INT)").unwrap();
        }
        assert!(!dir.path().join("orbis_5.duckdb").exists());
    }

    #[test]
    fn unusable_directory_is_a_creation_failure() {
        let dir = TempDir::new().expect("tempdir should create");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let config = SessionConfig {
            temp_dir: blocker.join("nested").to_string_lossy().into_owned(),
            load_spatial: false,
            ..SessionConfig::default()
        };

        let error = Session::create(&config, 11).unwrap_err();
        assert!(error.is_creation_failure());
    }
}
