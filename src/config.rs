// Client configuration: base URL, timeouts, retry pacing, credentials.
//
// Values come from environment variables with sensible defaults, the same
// knobs the facility client has always exposed.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Pause before the executor's single forced-refresh retry.
    pub retry_delay: Duration,
    /// Needed for login-based session acquisition; a caller that supplies
    /// its own session token can run without credentials.
    pub credentials: Option<Credentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.twojtenis.pl".to_string(),
            request_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(1),
            credentials: None,
        }
    }
}

impl Config {
    /// Build from `COURTBOOK_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        let credentials = match (
            env::var("COURTBOOK_EMAIL").ok(),
            env::var("COURTBOOK_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };
        Self {
            base_url: env::var("COURTBOOK_BASE_URL").unwrap_or(defaults.base_url),
            request_timeout: env_secs("COURTBOOK_REQUEST_TIMEOUT")
                .unwrap_or(defaults.request_timeout),
            retry_delay: env_secs("COURTBOOK_RETRY_DELAY").unwrap_or(defaults.retry_delay),
            credentials,
        }
    }

    pub fn with_credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            email: email.into(),
            password: password.into(),
        });
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key).ok()?.parse().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.credentials.is_none());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = Config {
            base_url: "https://example.pl/".into(),
            ..Config::default()
        };
        assert_eq!(
            config.endpoint("/pl/login.html"),
            "https://example.pl/pl/login.html"
        );
    }

    #[test]
    fn credentials_builder() {
        let config = Config::default().with_credentials("a@b.pl", "secret");
        let creds = config.credentials.unwrap();
        assert_eq!(creds.email, "a@b.pl");
        assert_eq!(creds.password, "secret");
    }
}
