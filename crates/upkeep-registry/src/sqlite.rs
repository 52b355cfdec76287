//! SQLite-backed release registry.
//!
//! Three tables, created if absent on open:
//!
//! - `FILERELEASE(ID, BUNDLE_ID?, PROJECT_ID?, PATH, FILENAME, MAJORVERSION,
//!   MINORVERSION, BUILD, REVISION, HASH)` with a case-insensitive index on `PATH`
//! - `BUNDLE(ID, FILENAME, NAME, MAJORVERSION, MINORVERSION, BUILD, REVISION)`
//! - `PROJECT(ID, NAME, BACKUPFILENAME?, MAJORVERSION, MINORVERSION, BUILD, REVISION)`
//!
//! One connection behind a mutex gives the single-writer discipline; each
//! [`ReleaseRegistry::register_files`] call is one immediate transaction that
//! rolls back when dropped uncommitted.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OpenFlags, Row, TransactionBehavior};
use tracing::debug;
use upkeep_types::{BundleInfo, FileRelease, Fingerprint, RegisteredProjectInfo, ReleaseVersion};

use crate::error::{RegistryError, RegistryResult};
use crate::record::{BundleId, NewFileRelease, ProjectId};
use crate::traits::ReleaseRegistry;

const SELECT_FILES: &str = "SELECT f.PATH, f.FILENAME, f.MAJORVERSION, f.MINORVERSION, f.BUILD,
        f.REVISION, f.HASH,
        f.BUNDLE_ID, b.ID, b.NAME, b.FILENAME, b.MAJORVERSION, b.MINORVERSION, b.BUILD, b.REVISION,
        f.PROJECT_ID, p.ID, p.NAME, p.BACKUPFILENAME, p.MAJORVERSION, p.MINORVERSION, p.BUILD,
        p.REVISION
    FROM FILERELEASE f
    LEFT JOIN BUNDLE b ON b.ID = f.BUNDLE_ID
    LEFT JOIN PROJECT p ON p.ID = f.PROJECT_ID";

/// Persistent release registry stored in a SQLite database file.
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteRegistry {
    /// Open (or create) the database at `path`, applying schema and PRAGMAs.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// A throwaway registry that lives only as long as this value.
    pub fn open_in_memory() -> RegistryResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> RegistryResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        apply_schema(&conn)?;
        debug!(path = ?path, "release registry opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Path to the database file, if it is file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn connection(&self) -> RegistryResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    fn query_files(&self, filter: &str, arg: &str) -> RegistryResult<Vec<FileRelease>> {
        let conn = self.connection()?;
        let sql = format!("{SELECT_FILES} WHERE {filter} ORDER BY f.ID");
        let mut stmt = conn.prepare_cached(&sql)?;
        let raw = stmt
            .query_map(params![arg], RawFileRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawFileRow::into_release).collect()
    }
}

impl ReleaseRegistry for SqliteRegistry {
    fn register_project(&self, project: &RegisteredProjectInfo) -> RegistryResult<ProjectId> {
        let conn = self.connection()?;
        let v = project.version;
        conn.prepare_cached(
            "INSERT INTO PROJECT (NAME, BACKUPFILENAME, MAJORVERSION, MINORVERSION, BUILD, REVISION)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            project.name,
            project.backup_file_name,
            v.major,
            v.minor,
            v.build,
            v.revision
        ])?;
        Ok(ProjectId(conn.last_insert_rowid()))
    }

    fn register_bundle(&self, bundle: &BundleInfo) -> RegistryResult<BundleId> {
        let conn = self.connection()?;
        let v = bundle.version;
        conn.prepare_cached(
            "INSERT INTO BUNDLE (FILENAME, NAME, MAJORVERSION, MINORVERSION, BUILD, REVISION)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            bundle.file_name,
            bundle.name,
            v.major,
            v.minor,
            v.build,
            v.revision
        ])?;
        Ok(BundleId(conn.last_insert_rowid()))
    }

    fn register_files(&self, rows: &[NewFileRelease]) -> RegistryResult<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO FILERELEASE (BUNDLE_ID, PROJECT_ID, PATH, FILENAME, MAJORVERSION,
                    MINORVERSION, BUILD, REVISION, HASH)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                let v = row.version;
                stmt.execute(params![
                    row.bundle.map(|b| b.0),
                    row.project.map(|p| p.0),
                    row.path,
                    row.file_name,
                    v.major,
                    v.minor,
                    v.build,
                    v.revision,
                    &row.fingerprint.as_bytes()[..],
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn lookup_by_path(&self, path: &str) -> RegistryResult<Vec<FileRelease>> {
        self.query_files("f.PATH = ?1 COLLATE NOCASE", path)
    }

    fn lookup_by_filename(&self, file_name: &str) -> RegistryResult<Vec<FileRelease>> {
        self.query_files("f.FILENAME = ?1 COLLATE NOCASE", file_name)
    }

    fn registered_bundles(&self) -> RegistryResult<Vec<BundleInfo>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(
            "SELECT NAME, FILENAME, MAJORVERSION, MINORVERSION, BUILD, REVISION
             FROM BUNDLE ORDER BY ID",
        )?;
        let bundles = stmt
            .query_map([], |row| {
                Ok(BundleInfo::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    version_at(row, 2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bundles)
    }

    fn registered_projects(&self) -> RegistryResult<Vec<RegisteredProjectInfo>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(
            "SELECT NAME, BACKUPFILENAME, MAJORVERSION, MINORVERSION, BUILD, REVISION
             FROM PROJECT ORDER BY ID",
        )?;
        let projects = stmt
            .query_map([], |row| {
                Ok(RegisteredProjectInfo {
                    name: row.get(0)?,
                    backup_file_name: row.get(1)?,
                    version: version_at(row, 2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    fn file_count(&self) -> RegistryResult<usize> {
        let conn = self.connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM FILERELEASE", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|_| RegistryError::Corrupt(format!("row count {count}")))
    }
}

impl std::fmt::Debug for SqliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistry")
            .field("path", &self.path)
            .finish()
    }
}

fn apply_schema(conn: &Connection) -> RegistryResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS BUNDLE (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            FILENAME TEXT NOT NULL,
            NAME TEXT NOT NULL,
            MAJORVERSION INTEGER NOT NULL,
            MINORVERSION INTEGER NOT NULL,
            BUILD INTEGER NOT NULL,
            REVISION INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS PROJECT (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            NAME TEXT NOT NULL,
            BACKUPFILENAME TEXT,
            MAJORVERSION INTEGER NOT NULL,
            MINORVERSION INTEGER NOT NULL,
            BUILD INTEGER NOT NULL,
            REVISION INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS FILERELEASE (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            BUNDLE_ID INTEGER REFERENCES BUNDLE(ID),
            PROJECT_ID INTEGER REFERENCES PROJECT(ID),
            PATH TEXT NOT NULL,
            FILENAME TEXT NOT NULL,
            MAJORVERSION INTEGER NOT NULL,
            MINORVERSION INTEGER NOT NULL,
            BUILD INTEGER NOT NULL,
            REVISION INTEGER NOT NULL,
            HASH BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS IDX_FILERELEASE_PATH ON FILERELEASE(PATH COLLATE NOCASE);",
    )?;
    Ok(())
}

fn version_at(row: &Row<'_>, start: usize) -> rusqlite::Result<ReleaseVersion> {
    Ok(ReleaseVersion::new(
        row.get(start)?,
        row.get(start + 1)?,
        row.get(start + 2)?,
        row.get(start + 3)?,
    ))
}

/// A `FILERELEASE` row joined with its bundle and project, before integrity
/// checks.
struct RawFileRow {
    path: String,
    file_name: String,
    version: ReleaseVersion,
    hash: Vec<u8>,
    bundle_ref: Option<i64>,
    bundle: Option<BundleInfo>,
    project_ref: Option<i64>,
    project: Option<RegisteredProjectInfo>,
}

impl RawFileRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let bundle = match row.get::<_, Option<i64>>(8)? {
            Some(_) => Some(BundleInfo::new(
                row.get::<_, String>(9)?,
                row.get::<_, String>(10)?,
                version_at(row, 11)?,
            )),
            None => None,
        };
        let project = match row.get::<_, Option<i64>>(16)? {
            Some(_) => Some(RegisteredProjectInfo {
                name: row.get(17)?,
                backup_file_name: row.get(18)?,
                version: version_at(row, 19)?,
            }),
            None => None,
        };
        Ok(Self {
            path: row.get(0)?,
            file_name: row.get(1)?,
            version: version_at(row, 2)?,
            hash: row.get(6)?,
            bundle_ref: row.get(7)?,
            bundle,
            project_ref: row.get(15)?,
            project,
        })
    }

    fn into_release(self) -> RegistryResult<FileRelease> {
        let fingerprint = Fingerprint::from_slice(&self.hash)
            .map_err(|e| RegistryError::Corrupt(format!("hash of '{}': {e}", self.path)))?;
        if let (Some(id), None) = (self.bundle_ref, &self.bundle) {
            return Err(RegistryError::Corrupt(format!(
                "'{}' references missing bundle {id}",
                self.path
            )));
        }
        if let (Some(id), None) = (self.project_ref, &self.project) {
            return Err(RegistryError::Corrupt(format!(
                "'{}' references missing project {id}",
                self.path
            )));
        }
        Ok(FileRelease {
            path: self.path,
            file_name: self.file_name,
            version: self.version,
            fingerprint,
            bundle: self.bundle,
            project: self.project,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upkeep_crypto::ContentHasher;

    fn v(s: &str) -> ReleaseVersion {
        s.parse().unwrap()
    }

    fn row(path: &str, content: &[u8], version: &str) -> NewFileRelease {
        NewFileRelease::new(path, v(version), ContentHasher::FILE.hash(content))
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    #[test]
    fn reopening_keeps_rows_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("releases.db");
        {
            let reg = SqliteRegistry::open(&db).unwrap();
            reg.register(&row("a.txt", b"a", "1.0")).unwrap();
        }
        let reg = SqliteRegistry::open(&db).unwrap();
        assert_eq!(reg.file_count().unwrap(), 1);
        assert_eq!(reg.path(), Some(db.as_path()));
    }

    #[test]
    fn path_index_exists() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        let conn = reg.connection().unwrap();
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'IDX_FILERELEASE_PATH'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(n, 1);
    }

    // -----------------------------------------------------------------------
    // Registration and lookup
    // -----------------------------------------------------------------------

    #[test]
    fn lookup_resolves_project_and_bundle() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        let pid = reg
            .register_project(
                &RegisteredProjectInfo::new("Portal", v("7.0.1.0")).with_backup("p.bak"),
            )
            .unwrap();
        let bid = reg
            .register_bundle(&BundleInfo::new("Reports", "reports.zip", v("7.0.1.2")))
            .unwrap();
        reg.register_files(&[
            row("bin/Core.dll", b"core", "7.0.1.0").in_project(pid),
            row("bin/Core.dll", b"core", "7.0.1.2").in_bundle(bid),
        ])
        .unwrap();

        let found = reg.lookup_by_path("BIN/core.DLL").unwrap();
        assert_eq!(found.len(), 2);
        let project = found[0].project.as_ref().unwrap();
        assert_eq!(project.name, "Portal");
        assert_eq!(project.backup_file_name.as_deref(), Some("p.bak"));
        assert_eq!(found[1].bundle.as_ref().unwrap().version, v("7.0.1.2"));
        assert_eq!(found[0].fingerprint, found[1].fingerprint);
    }

    #[test]
    fn lookup_by_filename_ignores_case() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        reg.register_files(&[row("x/Web.config", b"1", "1.0"), row("y/web.config", b"2", "1.0")])
            .unwrap();
        assert_eq!(reg.lookup_by_filename("WEB.CONFIG").unwrap().len(), 2);
    }

    #[test]
    fn catalogs_list_registrations() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        reg.register_bundle(&BundleInfo::new("B", "b.zip", v("1.2.3.4")))
            .unwrap();
        reg.register_project(&RegisteredProjectInfo::new("P", v("1.2")))
            .unwrap();
        let bundles = reg.registered_bundles().unwrap();
        assert_eq!(bundles[0].version, v("1.2.3.4"));
        let projects = reg.registered_projects().unwrap();
        assert_eq!(projects[0].backup_file_name, None);
    }

    // -----------------------------------------------------------------------
    // Window atomicity
    // -----------------------------------------------------------------------

    #[test]
    fn failed_window_rolls_back_only_itself() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        reg.register_files(&[row("first.txt", b"1", "1.0")]).unwrap();

        let err = reg.register_files(&[
            row("second.txt", b"2", "1.0"),
            row("third.txt", b"3", "1.0").in_bundle(BundleId(99)),
        ]);
        assert!(err.is_err());
        assert_eq!(reg.file_count().unwrap(), 1);
        assert!(reg.lookup_by_path("second.txt").unwrap().is_empty());

        // The store is still usable after the rollback.
        reg.register(&row("fourth.txt", b"4", "1.0")).unwrap();
        assert_eq!(reg.file_count().unwrap(), 2);
    }

    // -----------------------------------------------------------------------
    // Integrity
    // -----------------------------------------------------------------------

    #[test]
    fn truncated_hash_is_corrupt() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        reg.connection()
            .unwrap()
            .execute(
                "INSERT INTO FILERELEASE (PATH, FILENAME, MAJORVERSION, MINORVERSION, BUILD, REVISION, HASH)
                 VALUES ('bad.txt', 'bad.txt', 1, 0, 0, 0, x'0102')",
                [],
            )
            .unwrap();
        let err = reg.lookup_by_path("bad.txt").unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt(_)));
    }

    #[test]
    fn dangling_bundle_reference_is_corrupt() {
        let reg = SqliteRegistry::open_in_memory().unwrap();
        let conn = reg.connection().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        conn.execute(
            "INSERT INTO FILERELEASE (BUNDLE_ID, PATH, FILENAME, MAJORVERSION, MINORVERSION, BUILD, REVISION, HASH)
             VALUES (7, 'orphan.txt', 'orphan.txt', 1, 0, 0, 0, ?1)",
            params![&[0u8; 32][..]],
        )
        .unwrap();
        drop(conn);
        let err = reg.lookup_by_path("orphan.txt").unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt(msg) if msg.contains("bundle 7")));
    }
}
