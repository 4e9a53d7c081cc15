use crate::collection::{Action, Collection, Filter, Notice};
use crate::error::ApiError;
use crate::gateway::ApplicationGateway;
use crate::models::{Application, ApplicationStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFilter(pub Option<ApplicationStatus>);

impl Filter<Application> for StatusFilter {
    fn matches(&self, application: &Application) -> bool {
        self.0.is_none_or(|status| application.status == status)
    }
}

impl StatusFilter {
    /// All → PENDING → REVIEWED → ACCEPTED → REJECTED → All.
    pub fn next(self) -> Self {
        let next = match self.0 {
            None => Some(ApplicationStatus::Pending),
            Some(ApplicationStatus::Pending) => Some(ApplicationStatus::Reviewed),
            Some(ApplicationStatus::Reviewed) => Some(ApplicationStatus::Accepted),
            Some(ApplicationStatus::Accepted) => Some(ApplicationStatus::Rejected),
            Some(ApplicationStatus::Rejected) => None,
        };
        StatusFilter(next)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Job(i64),
    Company(i64),
    Applicant(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Job,
    Company,
    Applicant,
}

impl Lookup {
    pub fn parse(kind: LookupKind, input: &str) -> Result<Self, ApiError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ApiError::Validation("Please enter a search parameter".to_string()));
        }
        let numeric = |label: &str| {
            input
                .parse::<i64>()
                .map_err(|_| ApiError::Validation(format!("{} ID must be a number", label)))
        };
        match kind {
            LookupKind::Job => Ok(Lookup::Job(numeric("Job")?)),
            LookupKind::Company => Ok(Lookup::Company(numeric("Company")?)),
            LookupKind::Applicant => Ok(Lookup::Applicant(input.to_string())),
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            Lookup::Job(_) => "Failed to fetch applications by job",
            Lookup::Company(_) => "Failed to fetch applications by company",
            Lookup::Applicant(_) => "Failed to fetch applications by applicant",
        }
    }
}

pub struct ApplicationsPage<'a> {
    applications: ApplicationGateway<'a>,
    view: Collection<Application, StatusFilter>,
    lookup: Option<Lookup>,
}

impl<'a> ApplicationsPage<'a> {
    pub fn new(applications: ApplicationGateway<'a>) -> Self {
        Self {
            applications,
            view: Collection::new(),
            lookup: None,
        }
    }

    pub fn view(&self) -> &Collection<Application, StatusFilter> {
        &self.view
    }

    pub fn lookup(&self) -> Option<&Lookup> {
        self.lookup.as_ref()
    }

    pub fn error(&self) -> Option<&Notice> {
        self.view.error()
    }

    pub fn dismiss_error(&mut self) {
        self.view.status_mut().dismiss_error();
    }

    pub fn find_by(&mut self, kind: LookupKind, input: &str) -> bool {
        let lookup = match Lookup::parse(kind, input) {
            Ok(lookup) => lookup,
            Err(err) => {
                self.view.status_mut().set_error(Notice::from_error(&err, ""));
                return false;
            }
        };
        // a failed lookup leaves the previous one (and its items) in place
        let Some(items) = self.fetch(Action::Search, &lookup) else {
            return false;
        };
        self.lookup = Some(lookup);
        self.view.reset_filter();
        self.view.replace(items);
        true
    }

    pub fn load(&mut self) -> bool {
        let Some(lookup) = self.lookup.clone() else {
            self.view
                .status_mut()
                .set_error(Notice::validation("Please enter a search parameter"));
            return false;
        };
        match self.fetch(Action::Load, &lookup) {
            Some(items) => {
                self.view.replace(items);
                true
            }
            None => false,
        }
    }

    pub fn load_for_company(&mut self, company_id: i64) -> bool {
        self.lookup = Some(Lookup::Company(company_id));
        self.load()
    }

    pub fn apply_filter(&mut self, status: Option<ApplicationStatus>) {
        self.view.apply_filter(StatusFilter(status));
    }

    pub fn cycle_filter(&mut self) {
        let next = self.view.active_filter().next();
        self.view.apply_filter(next);
    }

    pub fn update_status(&mut self, id: i64, status: ApplicationStatus) -> Option<Application> {
        let applications = self.applications;
        let updated = self.view.run(
            Action::UpdateStatus,
            "Failed to update application status",
            || applications.update_status(id, status),
        )?;
        self.view.replace_one(updated.clone());
        Some(updated)
    }

    pub fn reset(&mut self) {
        self.view.reset_filter();
        self.dismiss_error();
    }

    fn fetch(&mut self, action: Action, lookup: &Lookup) -> Option<Vec<Application>> {
        let applications = self.applications;
        self.view.run(action, lookup.failure_message(), || match lookup {
            Lookup::Job(job_id) => applications.by_job(*job_id),
            Lookup::Company(company_id) => applications.by_company(*company_id),
            Lookup::Applicant(email) => applications.by_applicant(email),
        })
    }
}
