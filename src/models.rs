use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const JOB_CATEGORIES: &[&str] = &[
    "IT",
    "Finance",
    "Marketing",
    "HR",
    "Sales",
    "Engineering",
    "Design",
    "Healthcare",
];

pub trait Identified {
    fn id(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Bearer credential, when the backend issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Company {
    pub fn without_password(mut self) -> Self {
        self.password = None;
        self
    }
}

impl Identified for Company {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>, // denormalized by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_description: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_count: Option<u32>,
}

impl Identified for Job {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub salary: String,
    pub company_id: Option<i64>,
}

impl JobDraft {
    /// Name of the first required field left blank.
    pub fn missing_field(&self) -> Option<&'static str> {
        let fields = [
            ("title", &self.title),
            ("description", &self.description),
            ("category", &self.category),
            ("location", &self.location),
            ("salary", &self.salary),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Some(*name);
        }
        if self.company_id.is_none() {
            return Some("company id");
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Reviewed => "REVIEWED",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown application status '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub applicant_name: String,
    pub applicant_email: String,
    #[serde(default)]
    pub applicant_phone: Option<String>,
    #[serde(default)]
    pub job_id: Option<i64>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub applied_date: Option<NaiveDateTime>,
}

impl Identified for Application {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub applicant_name: String,
    pub applicant_email: String,
    pub cover_letter: String,
    pub job_id: i64,
    pub job_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}
