use anyhow::{Context, Result};
use rusqlite::OptionalExtension;

use crate::db::Database;

/// Cells wider than this are truncated in the rendered table.
const MAX_CELL_WIDTH: usize = 60;

/// A materialized query result: fixed headers plus stringified rows.
#[derive(Debug)]
pub struct Report {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the report as a column-aligned plain-text table.
    pub fn render(&self) -> String {
        let truncated: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|cell| truncate(cell, MAX_CELL_WIDTH)).collect())
            .collect();

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &truncated {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for (i, header) in self.headers.iter().enumerate() {
            out.push_str(&pad(header, widths[i]));
            if i + 1 < widths.len() {
                out.push_str("  ");
            }
        }
        out.push('\n');
        let total: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
        out.push_str(&"-".repeat(total));
        out.push('\n');
        for row in &truncated {
            for (i, cell) in row.iter().enumerate() {
                out.push_str(&pad(cell, widths[i]));
                if i + 1 < widths.len() {
                    out.push_str("  ");
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Read-only aggregate queries over a loaded database. Each call opens its
/// own connection and releases it before returning.
pub struct Reporter<'a> {
    db: &'a Database,
}

impl<'a> Reporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Every employer with its vacancy count, busiest first. Employers
    /// without a single vacancy still show up with a count of zero.
    pub fn employers_with_vacancy_counts(&self) -> Result<Report> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT e.employer_name, COUNT(v.vacancy_id) AS vacancy_count
             FROM employers e
             LEFT JOIN vacancies v ON e.employer_id = v.employer_id
             GROUP BY e.employer_id, e.employer_name
             ORDER BY vacancy_count DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok(vec![name, count.to_string()])
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to count vacancies per employer")?;

        Ok(Report {
            headers: vec!["Employer", "Vacancies"],
            rows,
        })
    }

    /// All vacancies with their employer, best paid first.
    pub fn all_vacancies(&self) -> Result<Report> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT e.employer_name, v.name, v.salary, v.url
             FROM vacancies v
             JOIN employers e ON v.employer_id = e.employer_id
             ORDER BY v.salary DESC",
        )?;
        let rows = stmt
            .query_map([], Self::vacancy_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list vacancies")?;

        Ok(Report {
            headers: vec!["Employer", "Vacancy", "Salary", "URL"],
            rows,
        })
    }

    /// Average salary over all salaried vacancies, rounded to the nearest
    /// integer. No salaried vacancies yields an empty report.
    pub fn average_salary(&self) -> Result<Report> {
        let conn = self.db.connect()?;
        let avg: Option<i64> = conn
            .query_row(
                "SELECT CAST(ROUND(AVG(salary)) AS INTEGER) FROM vacancies",
                [],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to compute average salary")?
            .flatten();

        Ok(Report {
            headers: vec!["Average salary"],
            rows: avg.map(|v| vec![vec![v.to_string()]]).unwrap_or_default(),
        })
    }

    /// Vacancies paying strictly more than the global average. Empty when
    /// no vacancy carries a salary at all.
    pub fn vacancies_above_average_salary(&self) -> Result<Report> {
        let conn = self.db.connect()?;
        let mut stmt = conn.prepare(
            "SELECT e.employer_name, v.name, v.salary, v.url
             FROM vacancies v
             JOIN employers e ON v.employer_id = e.employer_id
             WHERE v.salary > (SELECT AVG(salary) FROM vacancies)",
        )?;
        let rows = stmt
            .query_map([], Self::vacancy_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list vacancies above the average salary")?;

        Ok(Report {
            headers: vec!["Employer", "Vacancy", "Salary", "URL"],
            rows,
        })
    }

    /// Vacancies whose name or description contains the keyword,
    /// case-insensitively. The fold happens in Rust: SQLite's LOWER and
    /// LIKE only fold ASCII, and the upstream data is largely Russian.
    pub fn vacancies_with_keyword(&self, keyword: &str) -> Result<Report> {
        let conn = self.db.connect()?;
        let needle = keyword.to_lowercase();
        let mut stmt = conn.prepare("SELECT name, description, salary, url FROM vacancies")?;
        let candidates = stmt
            .query_map([], |row| {
                let name: String = row.get(0)?;
                let description: Option<String> = row.get(1)?;
                let salary: Option<i64> = row.get(2)?;
                let url: String = row.get(3)?;
                Ok((name, description, salary, url))
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to search vacancies for '{keyword}'"))?;

        let rows = candidates
            .into_iter()
            .filter(|(name, description, _, _)| {
                name.to_lowercase().contains(&needle)
                    || description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .map(|(name, _, salary, url)| vec![name, format_salary(salary), url])
            .collect();

        Ok(Report {
            headers: vec!["Vacancy", "Salary", "URL"],
            rows,
        })
    }

    fn vacancy_row(row: &rusqlite::Row) -> rusqlite::Result<Vec<String>> {
        let employer: String = row.get(0)?;
        let name: String = row.get(1)?;
        let salary: Option<i64> = row.get(2)?;
        let url: String = row.get(3)?;
        Ok(vec![employer, name, format_salary(salary), url])
    }
}

fn format_salary(salary: Option<i64>) -> String {
    salary.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    let mut padded = s.to_string();
    padded.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    padded
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
