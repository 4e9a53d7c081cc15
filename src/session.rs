use std::cell::{Cell, RefCell};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::{ApiError, AuthError, StorageError};
use crate::gateway::CompanyGateway;
use crate::models::{Company, CompanyDraft};

pub const LANDING_ROUTE: &str = "/companies";

#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn write(&self, raw: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn remove(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    identity: RefCell<Option<Company>>,
    loading: Cell<bool>,
    redirect: RefCell<Option<&'static str>>,
    storage: SessionStorage,
}

impl Session {
    pub fn new(storage: SessionStorage) -> Self {
        Self {
            identity: RefCell::new(None),
            loading: Cell::new(true),
            redirect: RefCell::new(None),
            storage,
        }
    }

    pub fn open(storage: SessionStorage) -> Self {
        let session = Self::new(storage);
        session.restore();
        session
    }

    pub fn restore(&self) {
        if !self.loading.get() {
            return;
        }

        match self.storage.read() {
            Ok(Some(raw)) if raw.trim().is_empty() => {}
            Ok(Some(raw)) => match serde_json::from_str::<Company>(&raw) {
                Ok(company) => {
                    debug!(company_id = company.id, "Restored session");
                    *self.identity.borrow_mut() = Some(company);
                }
                Err(err) => {
                    warn!(error = %err, path = %self.storage.path().display(), "Discarding corrupt session entry");
                    if let Err(err) = self.storage.remove() {
                        warn!(error = %err, "Failed to remove corrupt session entry");
                    }
                }
            },
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Failed to read session entry"),
        }

        self.loading.set(false);
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.borrow().is_some()
    }

    pub fn identity(&self) -> Option<Company> {
        self.identity.borrow().clone()
    }

    pub fn company_id(&self) -> Option<i64> {
        self.identity.borrow().as_ref().map(|company| company.id)
    }

    pub fn login(
        &self,
        companies: &CompanyGateway<'_>,
        email: &str,
        password: &str,
    ) -> Result<Company, AuthError> {
        match companies.login(email, password) {
            Ok(company) => self.establish(company),
            Err(err) => Err(auth_failure(err, "Login failed")),
        }
    }

    pub fn register(
        &self,
        companies: &CompanyGateway<'_>,
        draft: &CompanyDraft,
    ) -> Result<Company, AuthError> {
        match companies.register(draft) {
            Ok(company) => self.establish(company),
            Err(err) => Err(auth_failure(err, "Registration failed")),
        }
    }

    fn establish(&self, company: Company) -> Result<Company, AuthError> {
        let company = company.without_password();
        self.update_identity(company.clone()).map_err(|err| AuthError {
            message: format!("Failed to save session: {}", err),
            source: None,
        })?;
        info!(company_id = company.id, "Logged in");
        Ok(company)
    }

    // an entry that cannot be removed is blanked instead
    pub fn logout(&self) -> Result<(), StorageError> {
        self.identity.borrow_mut().take();
        let Err(err) = self.storage.remove() else {
            return Ok(());
        };
        warn!(error = %err, "Failed to remove session entry; blanking it");
        self.storage.write("").inspect_err(|err| {
            error!(error = %err, path = %self.storage.path().display(), "Failed to clear session entry");
        })
    }

    /// Disk first, then memory. A snapshot without a token keeps the current one.
    pub fn update_identity(&self, company: Company) -> Result<(), StorageError> {
        let mut company = company.without_password();
        if company.token.is_none() {
            company.token = self
                .identity
                .borrow()
                .as_ref()
                .filter(|current| current.id == company.id)
                .and_then(|current| current.token.clone());
        }
        let raw = serde_json::to_string(&company)?;
        self.storage.write(&raw)?;
        *self.identity.borrow_mut() = Some(company);
        Ok(())
    }

    pub fn stored_entry(&self) -> Option<String> {
        match self.storage.read() {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "Failed to read session entry");
                None
            }
        }
    }

    pub fn expire(&self) {
        warn!("Session rejected by backend; clearing credentials");
        if let Err(err) = self.logout() {
            error!(error = %err, "Session expired but its entry could not be cleared");
        }
        *self.redirect.borrow_mut() = Some(LANDING_ROUTE);
    }

    pub fn take_redirect(&self) -> Option<&'static str> {
        self.redirect.borrow_mut().take()
    }
}

fn auth_failure(err: ApiError, fallback: &str) -> AuthError {
    let message = err
        .backend_message()
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string());
    AuthError {
        message,
        source: Some(err),
    }
}

#[cfg(test)]
impl Session {
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{company_json, ScriptedTransport};
    use crate::http::HttpClient;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn storage_in(dir: &TempDir) -> SessionStorage {
        SessionStorage::new(dir.path().join("session.json"))
    }

    #[test]
    fn test_restore_without_entry_is_logged_out() {
        let dir = TempDir::new().unwrap();
        let session = Session::new(storage_in(&dir));
        assert!(session.is_loading());

        session.restore();
        assert!(!session.is_loading());
        assert!(session.identity().is_none());
    }

    #[test]
    fn test_restore_discards_corrupt_entry() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write("{not json").unwrap();

        let session = Session::open(storage.clone());
        assert!(!session.is_loading());
        assert!(session.identity().is_none());
        assert_eq!(storage.read().unwrap(), None);
    }

    #[test]
    fn test_restore_reads_saved_company() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write(&company_json(3, "Acme")).unwrap();

        let session = Session::open(storage);
        assert_eq!(session.company_id(), Some(3));
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_loading_never_returns_to_true() {
        let dir = TempDir::new().unwrap();
        let session = Session::open(storage_in(&dir));
        session.restore();
        session.logout().unwrap();
        session.expire();
        assert!(!session.is_loading());
    }

    #[test]
    fn test_login_persists_identical_snapshot() {
        let dir = TempDir::new().unwrap();
        let session = Rc::new(Session::open(storage_in(&dir)));
        let transport = ScriptedTransport::new();
        transport.respond(
            200,
            r#"{"id":9,"name":"Globex","email":"jobs@globex.test","password":"hunter2","location":"Springfield"}"#,
        );
        let http = HttpClient::with_transport("http://localhost:8080/api", transport.clone(), session.clone()).unwrap();
        let companies = CompanyGateway::new(&http);

        let company = session.login(&companies, "jobs@globex.test", "hunter2").unwrap();
        assert_eq!(company.id, 9);
        assert_eq!(company.password, None);

        let in_memory = serde_json::to_string(&session.identity().unwrap()).unwrap();
        let persisted = session.stored_entry().unwrap();
        assert_eq!(in_memory.as_bytes(), persisted.as_bytes());

        let request = transport.last_request().unwrap();
        assert_eq!(request.url.path(), "/api/companies/login");
        assert!(request.query_pair("email").as_deref() == Some("jobs@globex.test"));
        assert!(request.query_pair("password").as_deref() == Some("hunter2"));
    }

    #[test]
    fn test_login_failure_uses_backend_message_or_default() {
        let dir = TempDir::new().unwrap();
        let session = Rc::new(Session::open(storage_in(&dir)));
        let transport = ScriptedTransport::new();
        transport.respond(400, r#"{"message":"Unknown email"}"#);
        transport.respond(500, "");
        let http = HttpClient::with_transport("http://localhost:8080/api", transport, session.clone()).unwrap();
        let companies = CompanyGateway::new(&http);

        let err = session.login(&companies, "a@b.test", "x").unwrap_err();
        assert_eq!(err.message, "Unknown email");

        let err = session.login(&companies, "a@b.test", "x").unwrap_err();
        assert_eq!(err.message, "Login failed");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_register_establishes_session() {
        let dir = TempDir::new().unwrap();
        let session = Rc::new(Session::open(storage_in(&dir)));
        let transport = ScriptedTransport::new();
        transport.respond(200, &company_json(12, "Initech"));
        let http = HttpClient::with_transport("http://localhost:8080/api", transport.clone(), session.clone()).unwrap();
        let companies = CompanyGateway::new(&http);

        let draft = CompanyDraft {
            name: "Initech".into(),
            email: "hr@initech.test".into(),
            password: "pw".into(),
            ..Default::default()
        };
        session.register(&companies, &draft).unwrap();
        assert_eq!(session.company_id(), Some(12));
        assert_eq!(transport.last_request().unwrap().url.path(), "/api/companies/register");
    }

    #[test]
    fn test_logout_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write(&company_json(1, "Acme")).unwrap();
        let session = Session::open(storage.clone());

        session.logout().unwrap();
        session.logout().unwrap();
        assert!(session.identity().is_none());
        assert_eq!(storage.read().unwrap(), None);
    }

    #[test]
    fn test_update_identity_replaces_both_copies() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write(&company_json(1, "Acme")).unwrap();
        let session = Session::open(storage.clone());

        let mut renamed = session.identity().unwrap();
        renamed.name = "Acme Corp".into();
        session.update_identity(renamed.clone()).unwrap();

        assert_eq!(session.identity(), Some(renamed.clone()));
        let persisted: Company = serde_json::from_str(&storage.read().unwrap().unwrap()).unwrap();
        assert_eq!(persisted, renamed);
    }

    #[test]
    fn test_expire_clears_and_requests_redirect_once() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write(&company_json(1, "Acme")).unwrap();
        let session = Session::open(storage);

        session.expire();
        assert!(session.identity().is_none());
        assert!(session.stored_entry().is_none());
        assert_eq!(session.take_redirect(), Some(LANDING_ROUTE));
        assert_eq!(session.take_redirect(), None);
    }

    #[test]
    fn test_update_identity_keeps_token_missing_from_response() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write(r#"{"id":1,"name":"Acme","token":"secret-tok"}"#).unwrap();
        let session = Session::open(storage.clone());

        let renamed: Company = serde_json::from_str(r#"{"id":1,"name":"Acme Corp"}"#).unwrap();
        session.update_identity(renamed).unwrap();
        assert_eq!(session.identity().unwrap().token.as_deref(), Some("secret-tok"));
        assert_eq!(session.identity().unwrap().name, "Acme Corp");

        let other: Company = serde_json::from_str(r#"{"id":2,"name":"Globex"}"#).unwrap();
        session.update_identity(other).unwrap();
        assert_eq!(session.identity().unwrap().token, None);
    }

    #[test]
    fn test_logout_drops_identity_when_entry_cannot_be_removed() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write(&company_json(1, "Acme")).unwrap();
        let session = Session::open(storage.clone());

        // a non-empty directory in place of the file defeats both remove and rename
        fs::remove_file(storage.path()).unwrap();
        fs::create_dir(storage.path()).unwrap();
        fs::write(storage.path().join("keep"), "x").unwrap();

        assert!(session.logout().is_err());
        assert!(!session.is_authenticated());
        assert!(session.stored_entry().is_none());
    }

    #[test]
    fn test_blank_entry_restores_logged_out() {
        let dir = TempDir::new().unwrap();
        let storage = storage_in(&dir);
        storage.write("").unwrap();

        let session = Session::open(storage);
        assert!(!session.is_loading());
        assert!(!session.is_authenticated());
    }
}
