use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Process configuration, read once from `LIONS_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub avatar_dir: PathBuf,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = match get("LIONS_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("LIONS_PORT is not a port number: {raw}"))?,
            None => 8080,
        };
        let cookie_secure = matches!(
            get("LIONS_COOKIE_SECURE").as_deref().map(str::trim),
            Some("1" | "true" | "yes")
        );

        Ok(Self {
            host: get("LIONS_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("LIONS_DB_PATH").unwrap_or_else(|| "forum.db".into()).into(),
            avatar_dir: get("LIONS_AVATAR_DIR")
                .unwrap_or_else(|| "web/uploads/avatars".into())
                .into(),
            cookie_secure,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_path, PathBuf::from("forum.db"));
        assert_eq!(cfg.avatar_dir, PathBuf::from("web/uploads/avatars"));
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            ("LIONS_HOST", "127.0.0.1"),
            ("LIONS_PORT", "9000"),
            ("LIONS_COOKIE_SECURE", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.addr().unwrap().to_string(), "127.0.0.1:9000");
        assert!(cfg.cookie_secure);
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config(&[("LIONS_PORT", "eighty")]).is_err());
    }
}
