use std::env;

/// Where the tally database lives.
///
/// `TALLY_DATABASE_URL` when set, otherwise `postgresql://localhost:5432/tally`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/tally";
    pub const ENV_VAR: &str = "TALLY_DATABASE_URL";

    pub fn from_env() -> Self {
        Self::new(env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned()))
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// `(server root, database path, query suffix)` of the URL.
    fn split(&self) -> (&str, &str, &str) {
        let url = self.database_url.as_str();
        let (base, query) = match url.find('?') {
            Some(i) => url.split_at(i),
            None => (url, ""),
        };
        match base.rfind('/') {
            Some(i) if base[..i].ends_with('/') => (base, "", query),
            Some(i) => (&base[..i], &base[i + 1..], query),
            None => (base, "", query),
        }
    }

    /// Database name from the URL path, if any.
    pub fn database_name(&self) -> Option<&str> {
        let (_, name, _) = self.split();
        (!name.is_empty()).then_some(name)
    }

    /// The same server's `postgres` database, keeping any query parameters
    /// (e.g. `sslmode`).
    pub fn maintenance_url(&self) -> String {
        let (root, _, query) = self.split();
        format!("{root}/postgres{query}")
    }

    /// The URL with any password replaced by `***`, for logs and errors.
    pub fn redacted(&self) -> String {
        let url = &self.database_url;
        let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
            return url.clone();
        };
        let Some(at) = url[scheme_end..].find('@').map(|i| i + scheme_end) else {
            return url.clone();
        };
        match url[scheme_end..at].find(':') {
            Some(colon) => format!("{}:***{}", &url[..scheme_end + colon], &url[at..]),
            None => url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
