mod collection;
mod config;
mod error;
mod gateway;
mod http;
mod models;
mod pages;
mod session;
mod tui;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use collection::Notice;
use config::Config;
use gateway::{ApplicationGateway, CompanyGateway, JobGateway};
use http::HttpClient;
use models::{Application, ApplicationStatus, Company, CompanyDraft, Job, JobDraft, JOB_CATEGORIES};
use pages::{ApplicationsPage, CompaniesPage, JobDetailsPage, JobFilter, JobsPage, LookupKind};
use session::{Session, SessionStorage};
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Job board client - browse jobs, apply, and manage company postings")]
struct Cli {
    /// Backend base URL
    #[arg(long, global = true, env = "JOBBOARD_API_URL")]
    api_url: Option<String>,

    /// Where the logged-in company is remembered
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and manage job postings
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Review applications
    Apps {
        #[command(subcommand)]
        command: AppCommands,
    },

    /// Company directory, login and profile
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List jobs
    List {
        /// Keyword search on the server
        #[arg(short, long, conflicts_with_all = ["category", "company"])]
        search: Option<String>,

        /// Server-side category lookup
        #[arg(short, long, conflicts_with = "company")]
        category: Option<String>,

        /// Jobs posted by one company
        #[arg(long)]
        company: Option<i64>,

        /// Narrow the fetched list to one category without another request
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show job details
    Show {
        /// Job ID
        id: i64,
    },

    /// Post a job as the logged-in company
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// One of `jobboard jobs categories`
        #[arg(long)]
        category: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        salary: String,
    },

    /// Edit a job your company posted
    Edit {
        /// Job ID
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        salary: Option<String>,
    },

    /// Delete a job your company posted
    Delete {
        /// Job ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Apply to a job
    Apply {
        /// Job ID
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Cover letter text
        #[arg(long)]
        cover_letter: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        resume_url: Option<String>,
    },

    /// List the suggested job categories
    Categories,
}

#[derive(Subcommand)]
enum AppCommands {
    /// Find applications by job, company or applicant
    #[command(group(ArgGroup::new("lookup").required(true).args(["job", "company", "applicant"])))]
    List {
        #[arg(long)]
        job: Option<String>,
        #[arg(long)]
        company: Option<String>,
        /// Applicant email
        #[arg(long)]
        applicant: Option<String>,
        /// Only show one status
        #[arg(short, long, value_enum)]
        status: Option<ApplicationStatus>,
    },

    /// Change an application's status
    SetStatus {
        /// Application ID
        id: i64,
        #[arg(value_enum)]
        status: ApplicationStatus,
    },

    /// Interactive review of the applications your company received
    Browse {
        /// Company ID (defaults to the logged-in company)
        #[arg(long)]
        company: Option<i64>,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// List all companies
    List,

    /// Show one company
    Show {
        /// Company ID
        id: i64,
    },

    /// Register a new company and log in as it
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        size: Option<String>,
    },

    /// Log in as a company
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the logged-in company
    Logout,

    /// Show the logged-in company
    Whoami,

    /// Update the logged-in company's profile
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        website: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config::log_filter()))
        .with_writer(io::stderr)
        .init();

    let config = Config::resolve(cli.api_url, cli.session_file, cli.timeout);
    let session = Rc::new(Session::open(SessionStorage::new(&config.session_file)));
    let http = HttpClient::new(&config.api_url, config.timeout, session.clone())
        .with_context(|| format!("Failed to set up client for {}", config.api_url))?;

    let was_logged_in = session.is_authenticated();
    let result = match cli.command {
        Commands::Jobs { command } => run_jobs(command, &http, &session),
        Commands::Apps { command } => run_apps(command, &http, &session),
        Commands::Company { command } => run_company(command, &http, &session),
    };

    if let Some(message) = expiry_message(was_logged_in, session.take_redirect()) {
        eprintln!("{}", message);
    }

    result
}

/// Only a session that existed before the command can have expired.
fn expiry_message(was_logged_in: bool, redirect: Option<&str>) -> Option<String> {
    let route = redirect?;
    was_logged_in.then(|| format!("Session expired. Please log in again (redirected to {}).", route))
}

fn run_jobs(command: JobCommands, http: &HttpClient, session: &Session) -> Result<()> {
    match command {
        JobCommands::List {
            search,
            category,
            company,
            filter,
        } => {
            let mut page = JobsPage::new(JobGateway::new(http));
            let found = if let Some(keyword) = search {
                page.search(&keyword)
            } else if let Some(category) = category {
                page.by_category(&category)
            } else if let Some(company_id) = company {
                page.by_company(company_id)
            } else {
                page.reset()
            };
            settle(found.then_some(()), page.error())?;

            if filter.is_some() {
                page.apply_filter(JobFilter { category: filter });
            }
            let jobs: Vec<&Job> = page.view().filtered().collect();
            print_jobs(&jobs);
        }

        JobCommands::Show { id } => {
            let mut page = details_page(http);
            settle(page.load(id).then_some(()), page.error())?;
            let owner = page.is_owner(session);
            if let Some(job) = page.job() {
                print_job(job);
                if owner {
                    println!("\n(Posted by your company - use `jobs edit` or `jobs delete`)");
                }
            }
        }

        JobCommands::Post {
            title,
            description,
            category,
            location,
            salary,
        } => {
            let draft = JobDraft {
                title,
                description,
                category,
                location,
                salary,
                company_id: session.company_id(),
            };
            let mut page = JobsPage::new(JobGateway::new(http));
            let job = settle(page.create(&draft), page.error())?;
            println!("Posted job #{}: {}", job.id, job.title);
        }

        JobCommands::Edit {
            id,
            title,
            description,
            category,
            location,
            salary,
        } => {
            let mut page = owned_job(http, session, id)?;
            let Some(mut job) = page.job().cloned() else {
                bail!("Job #{} not found", id);
            };
            if let Some(title) = title {
                job.title = title;
            }
            job.description = description.or(job.description);
            job.category = category.or(job.category);
            job.location = location.or(job.location);
            job.salary = salary.or(job.salary);

            let job = settle(page.update(job), page.error())?;
            println!("Updated job #{}: {}", job.id, job.title);
        }

        JobCommands::Delete { id, yes } => {
            let company_id = owned_job(http, session, id)?
                .job()
                .and_then(|job| job.company_id)
                .ok_or_else(|| anyhow!("Job #{} has no company", id))?;

            let mut page = JobsPage::new(JobGateway::new(http));
            settle(page.by_company(company_id).then_some(()), page.error())?;
            if page.delete(id, |prompt| yes || confirm(prompt)) {
                println!("Deleted job #{}. Your remaining postings:\n", id);
                let jobs: Vec<&Job> = page.view().filtered().collect();
                print_jobs(&jobs);
            } else if let Some(notice) = page.error() {
                bail!("{}", notice.message);
            } else {
                println!("Cancelled.");
            }
        }

        JobCommands::Apply {
            id,
            name,
            email,
            cover_letter,
            phone,
            resume_url,
        } => {
            let mut page = details_page(http);
            settle(page.load(id).then_some(()), page.error())?;
            let form = page.form_mut();
            form.applicant_name = name;
            form.applicant_email = email;
            form.cover_letter = cover_letter;
            form.applicant_phone = phone;
            form.resume_url = resume_url;
            println!(
                "Applying to job #{} as {} <{}>...",
                id,
                page.form().applicant_name,
                page.form().applicant_email
            );

            let application = settle(page.apply(), page.error())?;
            println!(
                "Application #{} submitted for '{}' ({}).",
                application.id,
                application.job_title.as_deref().unwrap_or("?"),
                application.status
            );
        }

        JobCommands::Categories => {
            for category in JOB_CATEGORIES {
                println!("{}", category);
            }
        }
    }

    Ok(())
}

fn run_apps(command: AppCommands, http: &HttpClient, session: &Session) -> Result<()> {
    let mut page = ApplicationsPage::new(ApplicationGateway::new(http));

    match command {
        AppCommands::List {
            job,
            company,
            applicant,
            status,
        } => {
            let (kind, input) = match (job, company, applicant) {
                (Some(job), _, _) => (LookupKind::Job, job),
                (_, Some(company), _) => (LookupKind::Company, company),
                (_, _, Some(email)) => (LookupKind::Applicant, email),
                _ => bail!("Please enter a search parameter"),
            };
            settle(page.find_by(kind, &input).then_some(()), page.error())?;
            page.apply_filter(status);
            let applications: Vec<&Application> = page.view().filtered().collect();
            print_applications(&applications);
        }

        AppCommands::SetStatus { id, status } => {
            let application = settle(page.update_status(id, status), page.error())?;
            println!(
                "Application #{} from {} is now {}.",
                application.id, application.applicant_name, application.status
            );
        }

        AppCommands::Browse { company } => {
            let company_id = company
                .or_else(|| session.company_id())
                .ok_or_else(|| anyhow!("Log in as a company or pass --company to review applications"))?;
            tui::run_browse(&mut page, company_id)?;
        }
    }

    Ok(())
}

fn run_company(command: CompanyCommands, http: &HttpClient, session: &Session) -> Result<()> {
    let mut page = CompaniesPage::new(CompanyGateway::new(http), session);

    match command {
        CompanyCommands::List => {
            settle(page.load().then_some(()), page.error())?;
            let current = session.company_id();
            if page.view().filtered_len() == 0 {
                println!("No companies found.");
            } else {
                println!("{:<2}{:<6} {:<28} {:<20} {:<16}", "", "ID", "NAME", "LOCATION", "INDUSTRY");
                println!("{}", "-".repeat(74));
                for company in page.view().filtered() {
                    let marker = if Some(company.id) == current { "*" } else { "" };
                    println!(
                        "{:<2}{:<6} {:<28} {:<20} {:<16}",
                        marker,
                        company.id,
                        truncate(&company.name, 26),
                        truncate(company.location.as_deref().unwrap_or("-"), 18),
                        truncate(company.industry.as_deref().unwrap_or("-"), 14)
                    );
                }
            }
        }

        CompanyCommands::Show { id } => {
            let company = settle(page.show(id), page.error())?;
            print_company(&company);
            let mut jobs = JobsPage::new(JobGateway::new(http));
            if jobs.by_company(id) && jobs.view().filtered_len() > 0 {
                println!("\nJobs ({}):", jobs.view().filtered_len());
                for job in jobs.view().filtered() {
                    println!("  #{} - {}", job.id, job.title);
                }
            }
        }

        CompanyCommands::Register {
            name,
            email,
            password,
            description,
            location,
            website,
            industry,
            size,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt_line("Password: ")?,
            };
            let draft = CompanyDraft {
                name,
                email,
                password,
                description,
                location,
                website,
                industry,
                size,
            };
            let company = settle(page.register(&draft), page.error())?;
            println!("Registered and logged in as {} (#{}).", company.name, company.id);
        }

        CompanyCommands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_line("Password: ")?,
            };
            let company = settle(page.login(&email, &password), page.error())?;
            println!("Logged in as {} (#{}).", company.name, company.id);
        }

        CompanyCommands::Logout => {
            let was = page.current();
            page.logout();
            match was {
                Some(company) => println!("Logged out of {}.", company.name),
                None => println!("Not logged in."),
            }
            if let Some(notice) = page.error() {
                eprintln!("Warning: {}", notice.message);
            }
        }

        CompanyCommands::Whoami => match page.current() {
            Some(company) => print_company(&company),
            None => println!("Not logged in."),
        },

        CompanyCommands::Update {
            name,
            description,
            location,
            website,
            industry,
            size,
            phone,
        } => {
            let Some(mut company) = page.current() else {
                bail!("You need to log in to update your profile");
            };
            if let Some(name) = name {
                company.name = name;
            }
            company.description = description.or(company.description);
            company.location = location.or(company.location);
            company.website = website.or(company.website);
            company.industry = industry.or(company.industry);
            company.size = size.or(company.size);
            company.phone = phone.or(company.phone);

            let updated = settle(page.update_profile(&company), page.error())?;
            if let Some(notice) = page.error() {
                eprintln!("Warning: {}", notice.message);
            }
            println!("Profile updated for {} (#{}).", updated.name, updated.id);
        }
    }

    Ok(())
}

fn details_page(http: &HttpClient) -> JobDetailsPage<'_> {
    JobDetailsPage::new(JobGateway::new(http), ApplicationGateway::new(http))
}

// the session company must be the one that posted the job
fn owned_job<'a>(http: &'a HttpClient, session: &Session, id: i64) -> Result<JobDetailsPage<'a>> {
    let mut page = details_page(http);
    settle(page.load(id).then_some(()), page.error())?;
    if !session.is_authenticated() {
        bail!("You need to log in as the company that posted job #{}", id);
    }
    if !page.is_owner(session) {
        bail!("Job #{} was posted by another company", id);
    }
    Ok(page)
}

fn settle<T>(value: Option<T>, notice: Option<&Notice>) -> Result<T> {
    value.ok_or_else(|| match notice {
        Some(notice) => anyhow!("{}", notice.message),
        None => anyhow!("Request failed"),
    })
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn print_jobs(jobs: &[&Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }
    println!(
        "{:<6} {:<30} {:<12} {:<20} {:<16} {:>10}",
        "ID", "TITLE", "CATEGORY", "COMPANY", "LOCATION", "SALARY"
    );
    println!("{}", "-".repeat(99));
    for job in jobs {
        println!(
            "{:<6} {:<30} {:<12} {:<20} {:<16} {:>10}",
            job.id,
            truncate(&job.title, 28),
            truncate(job.category.as_deref().unwrap_or("-"), 10),
            truncate(job.company_name.as_deref().unwrap_or("-"), 18),
            truncate(job.location.as_deref().unwrap_or("-"), 14),
            truncate(job.salary.as_deref().unwrap_or("-"), 10)
        );
    }
}

fn print_job(job: &Job) {
    println!("Job #{}", job.id);
    println!("Title: {}", job.title);
    if let Some(company) = &job.company_name {
        println!("Company: {}", company);
    } else if let Some(company_id) = job.company_id {
        println!("Company: #{}", company_id);
    }
    if let Some(category) = &job.category {
        println!("Category: {}", category);
    }
    if let Some(location) = &job.location {
        println!("Location: {}", location);
    }
    if let Some(salary) = &job.salary {
        println!("Salary: {}", salary);
    }
    if let Some(created) = job.created_at {
        println!("Posted: {}", created.format("%Y-%m-%d"));
    }
    if let Some(count) = job.application_count {
        println!("Applications: {}", count);
    }
    if let Some(description) = &job.description {
        println!("\n--- Description ---\n{}", description);
    }
    if let Some(about) = &job.company_description {
        println!("\n--- About the company ---\n{}", about);
    }
}

fn print_applications(applications: &[&Application]) {
    if applications.is_empty() {
        println!("No applications found.");
        return;
    }
    println!(
        "{:<6} {:<10} {:<22} {:<26} {:<24} {:<10}",
        "ID", "STATUS", "APPLICANT", "EMAIL", "JOB", "APPLIED"
    );
    println!("{}", "-".repeat(103));
    for application in applications {
        let applied = application
            .applied_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<10} {:<22} {:<26} {:<24} {:<10}",
            application.id,
            application.status,
            truncate(&application.applicant_name, 20),
            truncate(&application.applicant_email, 24),
            truncate(application.job_title.as_deref().unwrap_or("-"), 22),
            applied
        );
    }
}

fn print_company(company: &Company) {
    println!("Company #{}", company.id);
    println!("Name: {}", company.name);
    let fields = [
        ("Email", &company.email),
        ("Location", &company.location),
        ("Industry", &company.industry),
        ("Size", &company.size),
        ("Website", &company.website),
        ("Phone", &company.phone),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
    if let Some(description) = &company.description {
        println!("\n{}", description);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_reported_only_for_existing_session() {
        assert_eq!(expiry_message(false, Some("/companies")), None);
        assert_eq!(expiry_message(true, None), None);
        assert_eq!(
            expiry_message(true, Some("/companies")).as_deref(),
            Some("Session expired. Please log in again (redirected to /companies).")
        );
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["jobboard", "jobs", "list"]).unwrap();
        assert_eq!(cli.timeout, config::DEFAULT_TIMEOUT_SECS);
        assert!(matches!(cli.command, Commands::Jobs { command: JobCommands::List { .. } }));
    }

    #[test]
    fn test_apps_list_requires_a_lookup() {
        assert!(Cli::try_parse_from(["jobboard", "apps", "list"]).is_err());
        assert!(Cli::try_parse_from(["jobboard", "apps", "list", "--job", "5", "--status", "pending"]).is_ok());
    }
}
