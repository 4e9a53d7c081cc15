use crate::collection::{Action, Notice, PageStatus};
use crate::gateway::{ApplicationGateway, JobGateway};
use crate::models::{Application, ApplicationDraft, Job};
use crate::session::Session;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationForm {
    pub applicant_name: String,
    pub applicant_email: String,
    pub cover_letter: String,
    pub applicant_phone: Option<String>,
    pub resume_url: Option<String>,
}

impl ApplicationForm {
    fn problem(&self) -> Option<&'static str> {
        if self.applicant_name.trim().is_empty() {
            return Some("Please enter your name");
        }
        let email = self.applicant_email.trim();
        if email.is_empty() {
            return Some("Please enter your email");
        }
        if !email.contains('@') {
            return Some("Please enter a valid email address");
        }
        if self.cover_letter.trim().is_empty() {
            return Some("Please write a cover letter");
        }
        None
    }
}

pub struct JobDetailsPage<'a> {
    jobs: JobGateway<'a>,
    applications: ApplicationGateway<'a>,
    job: Option<Job>,
    form: ApplicationForm,
    status: PageStatus,
}

impl<'a> JobDetailsPage<'a> {
    pub fn new(jobs: JobGateway<'a>, applications: ApplicationGateway<'a>) -> Self {
        Self {
            jobs,
            applications,
            job: None,
            form: ApplicationForm::default(),
            status: PageStatus::default(),
        }
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn error(&self) -> Option<&Notice> {
        self.status.error()
    }

    pub fn dismiss_error(&mut self) {
        self.status.dismiss_error();
    }

    pub fn form(&self) -> &ApplicationForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ApplicationForm {
        &mut self.form
    }

    /// Only the company that posted the job may edit it or delete it from the listing.
    pub fn is_owner(&self, session: &Session) -> bool {
        match (&self.job, session.company_id()) {
            (Some(job), Some(company_id)) => job.company_id == Some(company_id),
            _ => false,
        }
    }

    pub fn load(&mut self, id: i64) -> bool {
        let jobs = self.jobs;
        match self.status.run(Action::Load, "Failed to fetch job details", || jobs.get(id)) {
            Some(job) => {
                self.job = Some(job);
                true
            }
            None => false,
        }
    }

    pub fn update(&mut self, edited: Job) -> Option<Job> {
        let Some(current) = &self.job else {
            self.status.set_error(Notice::validation("No job loaded"));
            return None;
        };
        if edited.id != current.id {
            self.status.set_error(Notice::validation("Edited job does not match the loaded job"));
            return None;
        }
        if edited.title.trim().is_empty() {
            self.status.set_error(Notice::validation("Please fill in the job title"));
            return None;
        }

        let jobs = self.jobs;
        let updated = self.status.run(
            Action::Update,
            "Failed to update job. Please try again.",
            || jobs.update(edited.id, &edited),
        )?;
        self.job = Some(updated.clone());
        Some(updated)
    }

    pub fn apply(&mut self) -> Option<Application> {
        let Some(job) = &self.job else {
            self.status.set_error(Notice::validation("No job loaded"));
            return None;
        };
        if let Some(problem) = self.form.problem() {
            self.status.set_error(Notice::validation(problem));
            return None;
        }

        let draft = ApplicationDraft {
            applicant_name: self.form.applicant_name.trim().to_string(),
            applicant_email: self.form.applicant_email.trim().to_string(),
            cover_letter: self.form.cover_letter.clone(),
            job_id: job.id,
            job_title: job.title.clone(),
            applicant_phone: self.form.applicant_phone.clone(),
            resume_url: self.form.resume_url.clone(),
        };
        let applications = self.applications;
        let submitted = self.status.run(
            Action::Apply,
            "Failed to submit application. Please check your details.",
            || applications.apply(&draft),
        )?;
        self.form = ApplicationForm::default();
        Some(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::*;
    use crate::http::HttpClient;
    use crate::session::SessionStorage;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (HttpClient, ScriptedTransport, Rc<Session>) {
        let transport = ScriptedTransport::new();
        let session = Rc::new(Session::open(SessionStorage::new(dir.path().join("session.json"))));
        let http = HttpClient::with_transport("http://localhost:8080/api", transport.clone(), session.clone()).unwrap();
        (http, transport, session)
    }

    fn filled_form() -> ApplicationForm {
        ApplicationForm {
            applicant_name: "Grace Hopper".into(),
            applicant_email: "grace@example.com".into(),
            cover_letter: "I debug things.".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_fills_job_fields_and_resets_form() {
        let dir = TempDir::new().unwrap();
        let (http, transport, _) = setup(&dir);
        transport.respond(200, &job_json(5, "Compiler Engineer", "IT", 2));
        transport.respond(200, &application_json(40, "Grace", "PENDING", 5));
        let mut page = JobDetailsPage::new(JobGateway::new(&http), ApplicationGateway::new(&http));

        assert!(page.load(5));
        *page.form_mut() = filled_form();
        let application = page.apply().unwrap();
        assert_eq!(application.id, 40);

        let body = transport.last_request().unwrap().body.unwrap();
        assert_eq!(body["jobId"], 5);
        assert_eq!(body["jobTitle"], "Compiler Engineer");
        assert_eq!(body["status"], "PENDING");
        assert_eq!(page.form(), &ApplicationForm::default());
    }

    #[test]
    fn test_apply_validates_before_sending() {
        let dir = TempDir::new().unwrap();
        let (http, transport, _) = setup(&dir);
        transport.respond(200, &job_json(5, "Compiler Engineer", "IT", 2));
        let mut page = JobDetailsPage::new(JobGateway::new(&http), ApplicationGateway::new(&http));
        page.load(5);

        let mut form = filled_form();
        form.applicant_email = "grace.example.com".into();
        *page.form_mut() = form.clone();
        assert!(page.apply().is_none());
        assert_eq!(page.error().unwrap().message, "Please enter a valid email address");
        assert_eq!(page.form(), &form);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_failed_apply_keeps_form() {
        let dir = TempDir::new().unwrap();
        let (http, transport, _) = setup(&dir);
        transport.respond(200, &job_json(5, "Compiler Engineer", "IT", 2));
        transport.respond(400, "");
        let mut page = JobDetailsPage::new(JobGateway::new(&http), ApplicationGateway::new(&http));
        page.load(5);
        *page.form_mut() = filled_form();

        assert!(page.apply().is_none());
        assert_eq!(
            page.error().unwrap().message,
            "Failed to submit application. Please check your details."
        );
        assert_eq!(page.form(), &filled_form());
    }

    #[test]
    fn test_ownership_follows_session() {
        let dir = TempDir::new().unwrap();
        let (http, transport, session) = setup(&dir);
        transport.respond(200, &job_json(5, "Compiler Engineer", "IT", 2));
        let mut page = JobDetailsPage::new(JobGateway::new(&http), ApplicationGateway::new(&http));
        page.load(5);
        assert!(!page.is_owner(&session));

        session
            .update_identity(serde_json::from_str(&company_json(2, "Acme")).unwrap())
            .unwrap();
        assert!(page.is_owner(&session));

        session
            .update_identity(serde_json::from_str(&company_json(3, "Globex")).unwrap())
            .unwrap();
        assert!(!page.is_owner(&session));
    }

    #[test]
    fn test_update_replaces_loaded_job() {
        let dir = TempDir::new().unwrap();
        let (http, transport, _) = setup(&dir);
        transport.respond(200, &job_json(5, "Compiler Engineer", "IT", 2));
        transport.respond(200, &job_json(5, "Staff Compiler Engineer", "IT", 2));
        let mut page = JobDetailsPage::new(JobGateway::new(&http), ApplicationGateway::new(&http));
        page.load(5);

        let mut edited = page.job().unwrap().clone();
        edited.title = "Staff Compiler Engineer".into();
        page.update(edited).unwrap();
        assert_eq!(page.job().unwrap().title, "Staff Compiler Engineer");
        assert_eq!(transport.last_request().unwrap().url.path(), "/api/jobs/5");
    }

    #[test]
    fn test_load_failure_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let (http, transport, _) = setup(&dir);
        transport.respond(404, "");
        let mut page = JobDetailsPage::new(JobGateway::new(&http), ApplicationGateway::new(&http));

        assert!(!page.load(99));
        assert!(page.job().is_none());
        assert_eq!(page.error().unwrap().message, "Failed to fetch job details");
    }
}
