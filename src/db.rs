use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::PathBuf;

use crate::models::{Employer, Vacancy};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS employers (
    employer_id INTEGER PRIMARY KEY,
    employer_name TEXT NOT NULL CHECK (length(employer_name) <= 250),
    url TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vacancies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vacancy_id INTEGER NOT NULL UNIQUE,
    employer_id INTEGER NOT NULL REFERENCES employers(employer_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT,
    salary INTEGER,
    url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vacancies_employer ON vacancies(employer_id);
"#;

/// Handle to the vacancy database. Holds only the file path; every
/// operation opens its own connection and releases it on return, error
/// paths included.
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Drops the named database if it exists and starts fresh. Destructive:
    /// any previously loaded data is gone after this call.
    pub fn provision(name: &str) -> Result<Self> {
        let db = Self::at_path(Self::default_path(name)?);
        if db.path.exists() {
            std::fs::remove_file(&db.path)
                .with_context(|| format!("Failed to remove {}", db.path.display()))?;
        }
        Ok(db)
    }

    /// Opens the named database without touching existing data.
    pub fn open(name: &str) -> Result<Self> {
        Ok(Self::at_path(Self::default_path(name)?))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path(name: &str) -> Result<PathBuf> {
        // XDG data directory, with a cwd fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "vacdb") {
            Ok(proj_dirs.data_dir().join(format!("{name}.db")))
        } else {
            Ok(PathBuf::from(format!("{name}.db")))
        }
    }

    pub(crate) fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.path)
            .with_context(|| format!("Failed to open database {}", self.path.display()))?;
        // SQLite leaves foreign keys off unless asked
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    /// Creates the employers and vacancies tables. Safe to call against an
    /// already provisioned database.
    pub fn init(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create tables")?;
        Ok(())
    }

    /// Inserts employers in one transaction. A record whose employer_id
    /// already exists is ignored; the stored row wins. Returns the number
    /// of rows actually inserted.
    pub fn insert_employers(&self, employers: &[Employer]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO employers (employer_id, employer_name, url)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (employer_id) DO NOTHING",
            )?;
            for emp in employers {
                inserted += stmt
                    .execute(params![emp.employer_id, emp.employer_name, emp.url])
                    .context("Failed to insert employer")?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Inserts vacancies in one transaction, ignoring duplicate
    /// vacancy_ids. Referenced employers must already be loaded; an
    /// unknown employer_id fails the whole batch and nothing is kept.
    pub fn insert_vacancies(&self, vacancies: &[Vacancy]) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO vacancies (vacancy_id, employer_id, name, description, salary, url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (vacancy_id) DO NOTHING",
            )?;
            for vac in vacancies {
                inserted += stmt
                    .execute(params![
                        vac.vacancy_id,
                        vac.employer_id,
                        vac.name,
                        vac.description,
                        vac.salary,
                        vac.url
                    ])
                    .context("Failed to insert vacancy")?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::at_path(dir.path().join("test.db"));
        db.init().unwrap();
        (dir, db)
    }

    fn employer(id: i64, name: &str) -> Employer {
        Employer {
            employer_id: id,
            employer_name: name.to_string(),
            url: format!("https://example.com/employer/{id}"),
        }
    }

    fn vacancy(id: i64, employer_id: i64, name: &str, salary: Option<i64>) -> Vacancy {
        Vacancy {
            vacancy_id: id,
            employer_id,
            name: name.to_string(),
            description: None,
            salary,
            url: format!("https://example.com/vacancy/{id}"),
        }
    }

    #[test]
    fn init_is_idempotent() {
        let (_dir, db) = test_db();
        db.init().unwrap();
        db.init().unwrap();
    }

    #[test]
    fn duplicate_employer_insert_keeps_first_row() {
        let (_dir, db) = test_db();
        db.insert_employers(&[employer(1, "First")]).unwrap();
        let inserted = db.insert_employers(&[employer(1, "Second")]).unwrap();
        assert_eq!(inserted, 0);

        let conn = db.connect().unwrap();
        let (count, name): (i64, String) = conn
            .query_row(
                "SELECT COUNT(*), MAX(employer_name) FROM employers WHERE employer_id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(name, "First");
    }

    #[test]
    fn duplicate_vacancy_insert_keeps_first_row() {
        let (_dir, db) = test_db();
        db.insert_employers(&[employer(1, "A")]).unwrap();
        db.insert_vacancies(&[vacancy(10, 1, "Dev", Some(1000))])
            .unwrap();
        let inserted = db
            .insert_vacancies(&[vacancy(10, 1, "Renamed", Some(9999))])
            .unwrap();
        assert_eq!(inserted, 0);

        let conn = db.connect().unwrap();
        let name: String = conn
            .query_row(
                "SELECT name FROM vacancies WHERE vacancy_id = 10",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(name, "Dev");
    }

    #[test]
    fn overlong_employer_name_is_rejected() {
        let (_dir, db) = test_db();
        db.insert_employers(&[employer(1, &"x".repeat(250))]).unwrap();
        assert!(db.insert_employers(&[employer(2, &"x".repeat(251))]).is_err());
    }

    #[test]
    fn orphan_vacancy_is_rejected() {
        let (_dir, db) = test_db();
        let result = db.insert_vacancies(&[vacancy(10, 999, "Orphan", None)]);
        assert!(result.is_err());

        // The failed batch must leave nothing behind.
        let conn = db.connect().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vacancies", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn failed_batch_rolls_back_entirely() {
        let (_dir, db) = test_db();
        db.insert_employers(&[employer(1, "A")]).unwrap();
        // Second record references a missing employer, so the first must
        // not survive either.
        let result = db.insert_vacancies(&[
            vacancy(10, 1, "Dev", Some(1000)),
            vacancy(11, 999, "Orphan", None),
        ]);
        assert!(result.is_err());

        let conn = db.connect().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vacancies", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn deleting_employer_cascades_to_vacancies() {
        let (_dir, db) = test_db();
        db.insert_employers(&[employer(1, "A")]).unwrap();
        db.insert_vacancies(&[vacancy(10, 1, "Dev", None), vacancy(11, 1, "QA", None)])
            .unwrap();

        let conn = db.connect().unwrap();
        conn.execute("DELETE FROM employers WHERE employer_id = 1", [])
            .unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vacancies", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
