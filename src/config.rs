use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const LOG_ENV: &str = "JOBBOARD_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
    pub timeout: Duration,
}

impl Config {
    pub fn resolve(api_url: Option<String>, session_file: Option<PathBuf>, timeout_secs: u64) -> Self {
        let api_url = api_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            api_url,
            session_file: session_file.unwrap_or_else(default_session_file),
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }
}

fn default_session_file() -> PathBuf {
    // XDG data directory, else the working directory
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobboard") {
        proj_dirs.data_dir().join("session.json")
    } else {
        PathBuf::from("jobboard-session.json")
    }
}

pub fn log_filter() -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::resolve(None, None, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.session_file.ends_with("session.json") || config.session_file.ends_with("jobboard-session.json"));
    }

    #[test]
    fn test_explicit_values_win() {
        let config = Config::resolve(
            Some(" https://jobs.example.com/api/ ".to_string()),
            Some(PathBuf::from("/tmp/s.json")),
            0,
        );
        assert_eq!(config.api_url, "https://jobs.example.com/api/");
        assert_eq!(config.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_blank_api_url_falls_back() {
        let config = Config::resolve(Some("   ".to_string()), None, 5);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }
}
