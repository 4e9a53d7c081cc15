pub mod applications;
pub mod companies;
pub mod details;
pub mod jobs;

pub use applications::{ApplicationsPage, LookupKind};
pub use companies::CompaniesPage;
pub use details::JobDetailsPage;
pub use jobs::{JobFilter, JobsPage};
