/// A company sourced from the upstream API, keyed by its upstream id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Employer {
    pub employer_id: i64,
    pub employer_name: String,
    pub url: String,
}

/// A job posting belonging to exactly one employer.
///
/// `vacancy_id` is the upstream id, distinct from the surrogate row id the
/// database assigns. `salary` is a single point estimate derived from the
/// upstream range (lower bound preferred, then upper, else none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vacancy {
    pub vacancy_id: i64,
    pub employer_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub salary: Option<i64>,
    pub url: String,
}
