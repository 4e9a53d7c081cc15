use serde::Serialize;

use crate::error::Result;
use crate::http::HttpClient;
use crate::models::{
    Application, ApplicationDraft, ApplicationStatus, Company, CompanyDraft, Job, JobDraft,
};

#[derive(Clone, Copy)]
pub struct JobGateway<'a> {
    http: &'a HttpClient,
}

impl<'a> JobGateway<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub fn list(&self) -> Result<Vec<Job>> {
        self.http.get(&["jobs"])
    }

    pub fn get(&self, id: i64) -> Result<Job> {
        self.http.get(&["jobs", id.to_string().as_str()])
    }

    pub fn create(&self, draft: &JobDraft) -> Result<Job> {
        self.http.post(&["jobs"], draft)
    }

    pub fn update(&self, id: i64, job: &Job) -> Result<Job> {
        self.http.put(&["jobs", id.to_string().as_str()], job)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.http.delete(&["jobs", id.to_string().as_str()])
    }

    pub fn search(&self, keyword: &str) -> Result<Vec<Job>> {
        self.http.get_query(&["jobs", "search"], &[("keyword", keyword)])
    }

    pub fn by_category(&self, category: &str) -> Result<Vec<Job>> {
        self.http.get(&["jobs", "category", category])
    }

    pub fn by_company(&self, company_id: i64) -> Result<Vec<Job>> {
        self.http.get(&["jobs", "company", company_id.to_string().as_str()])
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewApplication<'d> {
    #[serde(flatten)]
    draft: &'d ApplicationDraft,
    status: ApplicationStatus,
}

#[derive(Clone, Copy)]
pub struct ApplicationGateway<'a> {
    http: &'a HttpClient,
}

impl<'a> ApplicationGateway<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub fn apply(&self, draft: &ApplicationDraft) -> Result<Application> {
        let body = NewApplication {
            draft,
            status: ApplicationStatus::Pending,
        };
        self.http.post(&["apply"], &body)
    }

    pub fn by_job(&self, job_id: i64) -> Result<Vec<Application>> {
        self.http.get(&["apply", "job", job_id.to_string().as_str()])
    }

    pub fn by_company(&self, company_id: i64) -> Result<Vec<Application>> {
        self.http.get(&["apply", "company", company_id.to_string().as_str()])
    }

    pub fn by_applicant(&self, email: &str) -> Result<Vec<Application>> {
        self.http.get(&["apply", "applicant", email])
    }

    pub fn update_status(&self, id: i64, status: ApplicationStatus) -> Result<Application> {
        self.http
            .put_query(&["apply", id.to_string().as_str(), "status"], &[("status", status.as_str())])
    }
}

#[derive(Clone, Copy)]
pub struct CompanyGateway<'a> {
    http: &'a HttpClient,
}

impl<'a> CompanyGateway<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    pub fn list(&self) -> Result<Vec<Company>> {
        self.http.get(&["companies"])
    }

    pub fn get(&self, id: i64) -> Result<Company> {
        self.http.get(&["companies", id.to_string().as_str()])
    }

    pub fn register(&self, draft: &CompanyDraft) -> Result<Company> {
        self.http.post(&["companies", "register"], draft)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Company> {
        self.http
            .post_query(&["companies", "login"], &[("email", email), ("password", password)])
    }

    pub fn update(&self, id: i64, company: &Company) -> Result<Company> {
        self.http.put(&["companies", id.to_string().as_str()], company)
    }
}
