use std::rc::Rc;
use std::time::Duration;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::error::{ApiError, Result};
use crate::session::Session;

// --- Transport trait ---

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

#[cfg(test)]
impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query_pair(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// No response was received at all.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct TransportError(pub String);

pub trait Transport {
    fn execute(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportError>;
}

// --- reqwest transport ---

#[derive(Debug)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .map_err(|err| TransportError(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| TransportError(err.to_string()))?;
        Ok(RawResponse { status, body })
    }
}

// --- Client ---

pub struct HttpClient {
    base_url: Url,
    transport: Box<dyn Transport>,
    session: Rc<Session>,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration, session: Rc<Session>) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::with_transport(base_url, transport, session)?)
    }

    pub fn with_transport(
        base_url: &str,
        transport: impl Transport + 'static,
        session: Rc<Session>,
    ) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            transport: Box::new(transport),
            session,
        })
    }

    pub fn get<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T> {
        self.send(Method::GET, path, None, &[])
    }

    pub fn get_query<T: DeserializeOwned>(&self, path: &[&str], query: &[(&str, &str)]) -> Result<T> {
        self.send(Method::GET, path, None, query)
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(&self, path: &[&str], body: &B) -> Result<T> {
        self.send(Method::POST, path, Some(encode(body)?), &[])
    }

    pub fn post_query<T: DeserializeOwned>(&self, path: &[&str], query: &[(&str, &str)]) -> Result<T> {
        self.send(Method::POST, path, None, query)
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(&self, path: &[&str], body: &B) -> Result<T> {
        self.send(Method::PUT, path, Some(encode(body)?), &[])
    }

    pub fn put_query<T: DeserializeOwned>(&self, path: &[&str], query: &[(&str, &str)]) -> Result<T> {
        self.send(Method::PUT, path, None, query)
    }

    pub fn delete(&self, path: &[&str]) -> Result<()> {
        self.send(Method::DELETE, path, None, &[])
    }

    /// Each entry of `path` is one URL segment, percent-encoded on its own.
    pub fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        body: Option<Value>,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url_for(path, query)?;

        let mut headers = vec![("Content-Type", "application/json".to_string())];
        if let Some(token) = self.credential() {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }

        let request = ApiRequest {
            method,
            url,
            headers,
            body,
        };
        debug!(method = %request.method, url = %request.url, "Sending request");

        match self.transport.execute(&request) {
            Ok(response) => self.interpret(&request, response),
            Err(err) => {
                error!(url = %request.url, error = %err, "Network error - no response received");
                Err(ApiError::Network(err.0))
            }
        }
    }

    fn url_for(&self, path: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn credential(&self) -> Option<String> {
        // a leftover file never outlives the in-memory logout
        if !self.session.is_authenticated() {
            return None;
        }
        self.session
            .stored_entry()
            .as_deref()
            .and_then(resolve_credential)
    }

    fn interpret<T: DeserializeOwned>(&self, request: &ApiRequest, response: RawResponse) -> Result<T> {
        let status = response.status;
        match status {
            200..=299 => {
                let body = if response.body.trim().is_empty() {
                    "null"
                } else {
                    response.body.as_str()
                };
                serde_json::from_str(body).map_err(ApiError::Decode)
            }
            401 => {
                self.session.expire();
                Err(ApiError::Unauthorized)
            }
            403 => {
                error!(url = %request.url, "Forbidden access");
                Err(ApiError::Forbidden {
                    message: backend_message(&response.body),
                })
            }
            404 => {
                error!(url = %request.url, "Resource not found");
                Err(ApiError::NotFound {
                    message: backend_message(&response.body),
                })
            }
            500..=599 => {
                error!(url = %request.url, status, "Server error");
                Err(ApiError::Server {
                    status,
                    message: backend_message(&response.body),
                })
            }
            _ => {
                error!(url = %request.url, status, body = %response.body, "API error");
                Err(ApiError::Http {
                    status,
                    message: backend_message(&response.body),
                })
            }
        }
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(ApiError::Encode)
}

fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

/// A JSON object yields its `token`, else its `id`. Non-JSON is used verbatim.
pub fn resolve_credential(stored: &str) -> Option<String> {
    let stored = stored.trim();
    if stored.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(stored) {
        Ok(Value::Object(map)) => {
            if let Some(token) = map.get("token").and_then(Value::as_str) {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
            debug!("Session has no token; falling back to company id");
            match map.get("id") {
                Some(Value::Number(id)) => Some(id.to_string()),
                Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                _ => None,
            }
        }
        Ok(Value::String(token)) if !token.is_empty() => Some(token),
        _ => Some(stored.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Clone, Default)]
    pub struct ScriptedTransport {
        responses: Rc<RefCell<VecDeque<std::result::Result<RawResponse, TransportError>>>>,
        requests: Rc<RefCell<Vec<ApiRequest>>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, status: u16, body: &str) {
            self.responses.borrow_mut().push_back(Ok(RawResponse {
                status,
                body: body.to_string(),
            }));
        }

        pub fn fail_network(&self) {
            self.responses
                .borrow_mut()
                .push_back(Err(TransportError("connection refused".to_string())));
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.borrow().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }

        pub fn last_request(&self) -> Option<ApiRequest> {
            self.requests.borrow().last().cloned()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &ApiRequest) -> std::result::Result<RawResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("no scripted response".to_string())))
        }
    }

    pub fn company_json(id: i64, name: &str) -> String {
        format!(
            r#"{{"id":{},"name":"{}","email":"hr@{}.test","description":null,"location":null,"website":null,"industry":null,"size":null,"phone":null}}"#,
            id,
            name,
            name.to_lowercase()
        )
    }

    pub fn job_json(id: i64, title: &str, category: &str, company_id: i64) -> String {
        format!(
            r#"{{"id":{},"title":"{}","description":"Work","category":"{}","location":"Remote","salary":"100000","companyId":{},"createdAt":"2024-01-15T09:30:00"}}"#,
            id, title, category, company_id
        )
    }

    pub fn application_json(id: i64, name: &str, status: &str, job_id: i64) -> String {
        format!(
            r#"{{"id":{},"applicantName":"{}","applicantEmail":"{}@example.com","jobId":{},"jobTitle":"Engineer","coverLetter":"Hello","status":"{}","appliedDate":"2024-01-15T10:00:00"}}"#,
            id,
            name,
            name.to_lowercase(),
            job_id,
            status
        )
    }
}
