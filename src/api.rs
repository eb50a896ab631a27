use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::models::{Employer, Vacancy};

/// Vacancy pages are capped upstream at 100 items per request.
const PER_PAGE: u32 = 100;

// --- Upstream response shapes ---
//
// hh.ru serves ids as JSON strings; they are parsed into i64 on projection.

#[derive(Debug, Deserialize)]
struct EmployerResponse {
    id: String,
    name: String,
    alternate_url: String,
}

#[derive(Debug, Deserialize)]
struct VacanciesPage {
    items: Vec<VacancyItem>,
}

#[derive(Debug, Deserialize)]
struct VacancyItem {
    id: String,
    name: String,
    salary: Option<SalaryRange>,
    snippet: Option<Snippet>,
    alternate_url: String,
}

#[derive(Debug, Deserialize)]
struct SalaryRange {
    from: Option<i64>,
    to: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    requirement: Option<String>,
    responsibility: Option<String>,
}

/// Client for the hh.ru public API.
pub struct HhClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HhClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Looks up each employer id in turn. An id whose lookup fails (network
    /// error or non-success status) is skipped; the rest of the batch
    /// continues, so the output may be shorter than the input.
    pub fn fetch_employers(&self, ids: &[i64]) -> Vec<Employer> {
        let mut employers = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.lookup_employer(id) {
                Ok(employer) => employers.push(employer),
                Err(e) => warn!("skipping employer {id}: {e:#}"),
            }
        }
        employers
    }

    /// Fetches up to one page of salaried vacancies for one employer.
    /// Any failure yields an empty list rather than an error.
    pub fn fetch_vacancies(&self, employer_id: i64) -> Vec<Vacancy> {
        match self.list_vacancies(employer_id) {
            Ok(vacancies) => vacancies,
            Err(e) => {
                warn!("no vacancies for employer {employer_id}: {e:#}");
                Vec::new()
            }
        }
    }

    /// Vacancies for every employer id, employers processed in input order.
    pub fn fetch_all_vacancies(&self, ids: &[i64]) -> Vec<Vacancy> {
        ids.iter()
            .flat_map(|&id| self.fetch_vacancies(id))
            .collect()
    }

    fn lookup_employer(&self, id: i64) -> Result<Employer> {
        let url = format!("{}/employers/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Failed to request {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("employer lookup returned {}", response.status()));
        }

        let body: EmployerResponse = response
            .json()
            .context("Failed to parse employer response")?;
        employer_from_response(body)
    }

    fn list_vacancies(&self, employer_id: i64) -> Result<Vec<Vacancy>> {
        let url = format!("{}/vacancies", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("employer_id", employer_id.to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("only_with_salary", "true".to_string()),
            ])
            .send()
            .with_context(|| format!("Failed to request {url}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("vacancy listing returned {}", response.status()));
        }

        let page: VacanciesPage = response
            .json()
            .context("Failed to parse vacancies response")?;

        let mut vacancies = Vec::with_capacity(page.items.len());
        for item in page.items {
            match vacancy_from_item(item, employer_id) {
                Ok(vacancy) => vacancies.push(vacancy),
                Err(e) => warn!("skipping vacancy for employer {employer_id}: {e:#}"),
            }
        }
        Ok(vacancies)
    }
}

// --- Projection ---

fn employer_from_response(body: EmployerResponse) -> Result<Employer> {
    let employer_id: i64 = body
        .id
        .parse()
        .with_context(|| format!("non-numeric employer id: {}", body.id))?;
    Ok(Employer {
        employer_id,
        employer_name: body.name,
        url: body.alternate_url,
    })
}

fn vacancy_from_item(item: VacancyItem, employer_id: i64) -> Result<Vacancy> {
    let vacancy_id: i64 = item
        .id
        .parse()
        .with_context(|| format!("non-numeric vacancy id: {}", item.id))?;
    Ok(Vacancy {
        vacancy_id,
        employer_id,
        name: item.name,
        description: item.snippet.and_then(snippet_text),
        salary: item.salary.and_then(|s| resolve_salary(s.from, s.to)),
        url: item.alternate_url,
    })
}

/// First non-empty of the two snippet fields, if any.
fn snippet_text(snippet: Snippet) -> Option<String> {
    [snippet.requirement, snippet.responsibility]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

/// Single point estimate from a salary range: the lower bound when present,
/// otherwise the upper bound, otherwise none.
fn resolve_salary(from: Option<i64>, to: Option<i64>) -> Option<i64> {
    from.or(to)
}
