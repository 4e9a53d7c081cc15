use tracing::warn;

use crate::collection::{Action, Collection, Notice};
use crate::error::ErrorCategory;
use crate::gateway::CompanyGateway;
use crate::models::{Company, CompanyDraft};
use crate::session::Session;

pub struct CompaniesPage<'a> {
    companies: CompanyGateway<'a>,
    session: &'a Session,
    view: Collection<Company>,
}

impl<'a> CompaniesPage<'a> {
    pub fn new(companies: CompanyGateway<'a>, session: &'a Session) -> Self {
        Self {
            companies,
            session,
            view: Collection::new(),
        }
    }

    pub fn view(&self) -> &Collection<Company> {
        &self.view
    }

    pub fn current(&self) -> Option<Company> {
        self.session.identity()
    }

    pub fn error(&self) -> Option<&Notice> {
        self.view.error()
    }

    pub fn dismiss_error(&mut self) {
        self.view.status_mut().dismiss_error();
    }

    pub fn load(&mut self) -> bool {
        let companies = self.companies;
        match self.view.run(Action::Load, "Failed to fetch companies", || companies.list()) {
            Some(items) => {
                self.view.replace(items);
                true
            }
            None => false,
        }
    }

    pub fn show(&mut self, id: i64) -> Option<Company> {
        let companies = self.companies;
        let company = self
            .view
            .run(Action::Search, "Failed to fetch company", || companies.get(id))?;
        self.view.replace_one(company.clone());
        Some(company)
    }

    pub fn register(&mut self, draft: &CompanyDraft) -> Option<Company> {
        let required = [
            ("name", &draft.name),
            ("email", &draft.email),
            ("password", &draft.password),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            self.reject(format!("Please enter the company {}", field));
            return None;
        }

        let (companies, session) = (self.companies, self.session);
        let company = self.view.status_mut().run_with(
            Action::Register,
            || session.register(&companies, draft),
            Notice::from_auth,
        )?;
        if !self.view.replace_one(company.clone()) {
            self.view.insert(company.clone());
        }
        Some(company)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Option<Company> {
        if email.trim().is_empty() || password.is_empty() {
            self.reject("Please enter your email and password");
            return None;
        }
        let (companies, session) = (self.companies, self.session);
        self.view.status_mut().run_with(
            Action::Login,
            || session.login(&companies, email.trim(), password),
            Notice::from_auth,
        )
    }

    pub fn logout(&mut self) {
        self.dismiss_error();
        if let Err(err) = self.session.logout() {
            self.view.status_mut().set_error(Notice {
                message: format!("Logged out, but the session file could not be cleared: {}", err),
                category: ErrorCategory::Other,
            });
        }
    }

    // backend, then session, then the listing copy
    pub fn update_profile(&mut self, edited: &Company) -> Option<Company> {
        let Some(company_id) = self.session.company_id() else {
            self.reject("You need to log in to update your profile");
            return None;
        };
        if edited.id != company_id {
            self.reject("You can only update your own profile");
            return None;
        }
        if edited.name.trim().is_empty() {
            self.reject("Please enter the company name");
            return None;
        }

        let companies = self.companies;
        let updated = self.view.run(
            Action::UpdateProfile,
            "Failed to update profile. Please try again.",
            || companies.update(company_id, edited),
        )?;
        if let Err(err) = self.session.update_identity(updated.clone()) {
            warn!(error = %err, "Profile saved but session could not be updated");
            self.reject(format!("Profile saved but the session could not be updated: {}", err));
        }
        let snapshot = updated.without_password();
        self.view.replace_one(snapshot.clone());
        Some(snapshot)
    }

    fn reject(&mut self, message: impl Into<String>) {
        self.view.status_mut().set_error(Notice::validation(message));
    }
}
