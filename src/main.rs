mod api;
mod config;
mod db;
mod models;
mod reports;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, Write};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use api::HhClient;
use config::Config;
use db::Database;
use reports::{Report, Reporter};

#[derive(Parser)]
#[command(name = "vacdb")]
#[command(about = "Collect employer vacancies from hh.ru and report on them")]
struct Cli {
    /// Employer ids to fetch (comma-separated), overriding EMPLOYER_IDS
    #[arg(long, value_delimiter = ',')]
    ids: Vec<i64>,

    /// Database name, overriding DATABASE_NAME
    #[arg(long)]
    db: Option<String>,

    /// Reuse the existing database and go straight to the menu
    #[arg(long)]
    skip_fetch: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if !cli.ids.is_empty() {
        config.employer_ids = cli.ids;
    }
    if let Some(name) = cli.db {
        config.database_name = name;
    }

    let db = if cli.skip_fetch {
        let db = Database::open(&config.database_name)?;
        db.init()?;
        db
    } else {
        // A failed load leaves nothing worth reporting on, so any error
        // here stops the program before the menu.
        run_pipeline(&config)?
    };

    menu_loop(&db)
}

/// One full fetch-then-load pass: employers first, then their vacancies,
/// into a freshly provisioned database.
fn run_pipeline(config: &Config) -> Result<Database> {
    let client = HhClient::new(&config.base_url, config.http_timeout)?;

    println!("Fetching vacancies from hh.ru, please wait ...");
    let employers = client.fetch_employers(&config.employer_ids);
    // Only employers that resolved; a vacancy without its employer row
    // would fail the foreign key on load.
    let fetched_ids: Vec<i64> = employers.iter().map(|e| e.employer_id).collect();
    let vacancies = client.fetch_all_vacancies(&fetched_ids);
    println!(
        "Fetched {} vacancies from {} employers",
        vacancies.len(),
        employers.len()
    );

    let db = Database::provision(&config.database_name)
        .context("Failed to provision the database")?;
    db.init().context("Failed to create tables")?;
    let employers_loaded = db
        .insert_employers(&employers)
        .context("Failed to load employers")?;
    let vacancies_loaded = db
        .insert_vacancies(&vacancies)
        .context("Failed to load vacancies")?;
    info!(
        "loaded {employers_loaded} employers and {vacancies_loaded} vacancies into {}",
        db.path().display()
    );

    Ok(db)
}

fn menu_loop(db: &Database) -> Result<()> {
    let reporter = Reporter::new(db);
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    loop {
        println!();
        println!("1. Employers and their vacancy counts");
        println!("2. All vacancies with employer, salary and link");
        println!("3. Average salary across vacancies");
        println!("4. Vacancies paying above the average salary");
        println!("5. Search vacancies by keyword");
        println!("6. Exit");

        let Some(choice) = prompt(&mut input, "Choose a menu item: ")? else {
            break;
        };

        match choice.as_str() {
            "1" => show(reporter.employers_with_vacancy_counts()),
            "2" => show(reporter.all_vacancies()),
            "3" => show(reporter.average_salary()),
            "4" => show(reporter.vacancies_above_average_salary()),
            "5" => {
                let Some(keyword) = prompt(&mut input, "Enter a keyword to search for: ")?
                else {
                    break;
                };
                show(reporter.vacancies_with_keyword(&keyword));
            }
            "6" => break,
            _ => println!("Invalid choice, try again"),
        }
    }

    println!("Bye");
    Ok(())
}

/// Prints a prompt and reads one trimmed line. `None` means end of input.
fn prompt(input: &mut impl BufRead, text: &str) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    let read = input.read_line(&mut line).context("Failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Report errors are logged and shown as a failure line; the menu keeps
/// running either way.
fn show(result: Result<Report>) {
    match result {
        Ok(report) if report.is_empty() => println!("\nNo data to display."),
        Ok(report) => println!("\n{}", report.render()),
        Err(e) => {
            error!("report failed: {e:#}");
            println!("\nCould not produce the report.");
        }
    }
}
