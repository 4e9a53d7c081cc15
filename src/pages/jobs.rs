use crate::collection::{Action, Collection, Filter, Notice};
use crate::gateway::JobGateway;
use crate::models::{Job, JobDraft};

pub const DELETE_JOB_PROMPT: &str = "Are you sure you want to delete this job?";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub category: Option<String>,
}

impl Filter<Job> for JobFilter {
    fn matches(&self, job: &Job) -> bool {
        match &self.category {
            None => true,
            Some(category) => job
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category)),
        }
    }
}

pub struct JobsPage<'a> {
    jobs: JobGateway<'a>,
    view: Collection<Job, JobFilter>,
}

impl<'a> JobsPage<'a> {
    pub fn new(jobs: JobGateway<'a>) -> Self {
        Self {
            jobs,
            view: Collection::new(),
        }
    }

    pub fn view(&self) -> &Collection<Job, JobFilter> {
        &self.view
    }

    pub fn error(&self) -> Option<&Notice> {
        self.view.error()
    }

    pub fn dismiss_error(&mut self) {
        self.view.status_mut().dismiss_error();
    }

    pub fn load(&mut self) -> bool {
        let jobs = self.jobs;
        match self.view.run(Action::Load, "Failed to fetch jobs", || jobs.list()) {
            Some(items) => {
                self.view.replace(items);
                true
            }
            None => false,
        }
    }

    pub fn search(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            self.reject("Please enter a search keyword");
            return false;
        }
        let jobs = self.jobs;
        let found = self
            .view
            .run(Action::Search, "Search failed. Please try again.", || jobs.search(keyword));
        self.show_results(found)
    }

    pub fn by_category(&mut self, category: &str) -> bool {
        let category = category.trim();
        if category.is_empty() {
            self.reject("Please choose a category");
            return false;
        }
        let jobs = self.jobs;
        let found = self
            .view
            .run(Action::Search, "Filter failed. Please try again.", || jobs.by_category(category));
        self.show_results(found)
    }

    pub fn by_company(&mut self, company_id: i64) -> bool {
        let jobs = self.jobs;
        let found = self
            .view
            .run(Action::Search, "Failed to fetch company jobs", || jobs.by_company(company_id));
        self.show_results(found)
    }

    pub fn apply_filter(&mut self, filter: JobFilter) {
        self.view.apply_filter(filter);
    }

    pub fn create(&mut self, draft: &JobDraft) -> Option<Job> {
        if draft.company_id.is_none() {
            self.reject("You need to be registered as a company to post jobs.");
            return None;
        }
        if let Some(field) = draft.missing_field() {
            self.reject(format!("Please fill in the job {}", field));
            return None;
        }
        let jobs = self.jobs;
        let created = self.view.run(
            Action::Create,
            "Failed to create job. Please check your input.",
            || jobs.create(draft),
        )?;
        self.view.insert(created.clone());
        Some(created)
    }

    /// Sends the delete only after `confirm` agrees.
    pub fn delete(&mut self, id: i64, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(DELETE_JOB_PROMPT) {
            return false;
        }
        let jobs = self.jobs;
        let deleted = self
            .view
            .run(Action::Delete, "Failed to delete job. Please try again.", || jobs.delete(id));
        if deleted.is_some() {
            self.view.remove(id);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) -> bool {
        self.view.reset_filter();
        self.dismiss_error();
        self.load()
    }

    fn show_results(&mut self, found: Option<Vec<Job>>) -> bool {
        match found {
            Some(items) => {
                self.view.reset_filter();
                self.view.replace(items);
                true
            }
            None => false,
        }
    }

    fn reject(&mut self, message: impl Into<String>) {
        self.view.status_mut().set_error(Notice::validation(message));
    }
}
