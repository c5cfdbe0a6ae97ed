use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

pub struct Config {
    pub backend_url: Url,
    /// Bearer JWT issued by the identity provider. `None` means signed out.
    pub session_token: Option<String>,
    /// Page size for the open-listings query.
    /// Set via BURZA_LISTINGS_TAKE env var. Default: 50.
    pub listings_take: u32,
    pub log_format: LogFormat,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build the config from any key lookup; `load` passes the process env.
pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let raw_url = get("BURZA_BACKEND_URL").unwrap_or_else(|| "http://localhost:4000".into());
    let backend_url = Url::parse(&raw_url)
        .map_err(|e| anyhow::anyhow!("BURZA_BACKEND_URL '{}' is not a valid URL: {}", raw_url, e))?;

    Ok(Config {
        backend_url,
        session_token: get("BURZA_SESSION_TOKEN")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        listings_take: get("BURZA_LISTINGS_TAKE")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(50),
        log_format: match get("BURZA_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.backend_url.as_str(), "http://localhost:4000/");
        assert!(cfg.session_token.is_none());
        assert_eq!(cfg.listings_take, 50);
        assert_eq!(cfg.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let cfg = from_lookup(lookup(&[
            ("BURZA_BACKEND_URL", "https://api.burza.example"),
            ("BURZA_SESSION_TOKEN", " a.b.c "),
            ("BURZA_LISTINGS_TAKE", "10"),
            ("BURZA_LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(cfg.backend_url.host_str(), Some("api.burza.example"));
        assert_eq!(cfg.session_token.as_deref(), Some("a.b.c"));
        assert_eq!(cfg.listings_take, 10);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_take_falls_back() {
        let cfg = from_lookup(lookup(&[("BURZA_LISTINGS_TAKE", "0")])).unwrap();
        assert_eq!(cfg.listings_take, 50);
    }

    #[test]
    fn test_invalid_url_is_error() {
        assert!(from_lookup(lookup(&[("BURZA_BACKEND_URL", "not a url")])).is_err());
    }
}
