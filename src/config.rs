//! Server configuration.
//!
//! Settings are resolved from three layers with fixed precedence: CLI flags
//! override environment variables, which override hardcoded defaults. The
//! environment is injected as a lookup function so resolution stays testable
//! without touching process globals.

use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::Level;

pub const ENV_BASE_URL: &str = "NTDOC_MCP_BASE_URL";
pub const ENV_HOST: &str = "NTDOC_MCP_HOST";
pub const ENV_PORT: &str = "NTDOC_MCP_PORT";
pub const ENV_SERVER_NAME: &str = "NTDOC_MCP_SERVER_NAME";
pub const ENV_DEBUG: &str = "NTDOC_MCP_DEBUG";
pub const ENV_LOG_LEVEL: &str = "NTDOC_MCP_LOG_LEVEL";
pub const ENV_ISSUER_URL: &str = "NTDOC_MCP_ISSUER_URL";
pub const ENV_RESOURCE_SERVER_URL: &str = "NTDOC_MCP_RESOURCE_SERVER_URL";
pub const ENV_REQUIRED_SCOPES: &str = "NTDOC_MCP_REQUIRED_SCOPES";

const DEFAULT_BASE_URL: &str = "http://localhost:8070";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SERVER_NAME: &str = "ntdoc-mcp-server";
const DEFAULT_ISSUER_URL: &str = "http://auth.local:8080/realms/ntdoc";
const DEFAULT_REQUIRED_SCOPE: &str = "mcp-user";

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the NTDoc REST backend that tool calls are forwarded to.
    pub backend_base_url: String,
    /// Address the MCP server binds to.
    pub host: String,
    /// Port the MCP server binds to.
    pub port: u16,
    /// Server name reported to MCP clients during initialization.
    pub server_name: String,
    /// Force debug-level logging regardless of `log_level`.
    pub debug: bool,
    /// Default log level when `RUST_LOG` is not set.
    pub log_level: Level,
    /// OAuth issuer advertised in the protected-resource metadata.
    pub issuer_url: String,
    /// Canonical URL of this resource server (RFC 8707 resource indicator).
    pub resource_server_url: String,
    /// Scopes a credential must carry to call any tool.
    pub required_scopes: Vec<String>,
}

/// Values supplied on the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_base_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub server_name: Option<String>,
    pub debug: bool,
    pub log_level: Option<String>,
    pub issuer_url: Option<String>,
    pub resource_server_url: Option<String>,
    pub required_scopes: Vec<String>,
}

impl Settings {
    /// Resolve settings from CLI overrides, an environment lookup, and
    /// defaults, taking the first present value per field.
    pub fn resolve(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let backend_base_url = first_present(overrides.backend_base_url, env(ENV_BASE_URL), || {
            DEFAULT_BASE_URL.to_string()
        })
        .trim_end_matches('/')
        .to_string();

        let host = first_present(overrides.host, env(ENV_HOST), || DEFAULT_HOST.to_string());

        let port = match (overrides.port, env(ENV_PORT)) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .parse()
                .with_context(|| format!("invalid {ENV_PORT} value '{raw}'"))?,
            (None, None) => DEFAULT_PORT,
        };

        let server_name = first_present(overrides.server_name, env(ENV_SERVER_NAME), || {
            DEFAULT_SERVER_NAME.to_string()
        });

        // A CLI flag can only assert true; fall through to the environment
        // when it is absent.
        let debug = overrides.debug || env(ENV_DEBUG).is_some_and(|raw| is_truthy(&raw));

        let log_level = match (overrides.log_level, env(ENV_LOG_LEVEL)) {
            (Some(raw), _) | (None, Some(raw)) => Level::from_str(&raw)
                .with_context(|| format!("invalid log level '{raw}'"))?,
            (None, None) => Level::INFO,
        };

        let issuer_url = first_present(overrides.issuer_url, env(ENV_ISSUER_URL), || {
            DEFAULT_ISSUER_URL.to_string()
        });

        let resource_server_url = first_present(
            overrides.resource_server_url,
            env(ENV_RESOURCE_SERVER_URL),
            || format!("http://{host}:{port}/mcp"),
        );

        let required_scopes = if !overrides.required_scopes.is_empty() {
            overrides.required_scopes
        } else if let Some(raw) = env(ENV_REQUIRED_SCOPES) {
            raw.split_whitespace().map(str::to_string).collect()
        } else {
            vec![DEFAULT_REQUIRED_SCOPE.to_string()]
        };

        Ok(Self {
            backend_base_url,
            host,
            port,
            server_name,
            debug,
            log_level,
            issuer_url,
            resource_server_url,
            required_scopes,
        })
    }

    /// Address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn first_present<T>(cli: Option<T>, env: Option<T>, default: impl FnOnce() -> T) -> T {
    cli.or(env).unwrap_or_else(default)
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_given() {
        let settings = Settings::resolve(Overrides::default(), no_env).unwrap();
        assert_eq!(settings.backend_base_url, "http://localhost:8070");
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.server_name, "ntdoc-mcp-server");
        assert!(!settings.debug);
        assert_eq!(settings.log_level, Level::INFO);
        assert_eq!(settings.issuer_url, "http://auth.local:8080/realms/ntdoc");
        assert_eq!(settings.resource_server_url, "http://127.0.0.1:8000/mcp");
        assert_eq!(settings.required_scopes, vec!["mcp-user".to_string()]);
    }

    #[test]
    fn environment_beats_defaults() {
        let env = env_of(&[
            (ENV_BASE_URL, "https://api.ntdoc.site/"),
            (ENV_HOST, "0.0.0.0"),
            (ENV_PORT, "9000"),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_REQUIRED_SCOPES, "mcp-user mcp-admin"),
        ]);
        let settings = Settings::resolve(Overrides::default(), env).unwrap();
        // Trailing slash is trimmed so path templates concatenate cleanly.
        assert_eq!(settings.backend_base_url, "https://api.ntdoc.site");
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.log_level, Level::WARN);
        assert_eq!(
            settings.required_scopes,
            vec!["mcp-user".to_string(), "mcp-admin".to_string()]
        );
        assert_eq!(settings.resource_server_url, "http://0.0.0.0:9000/mcp");
    }

    #[test]
    fn cli_beats_environment() {
        let env = env_of(&[
            (ENV_BASE_URL, "http://from-env:1"),
            (ENV_PORT, "9000"),
            (ENV_REQUIRED_SCOPES, "env-scope"),
        ]);
        let overrides = Overrides {
            backend_base_url: Some("http://from-cli:2".to_string()),
            port: Some(8002),
            required_scopes: vec!["cli-scope".to_string()],
            ..Default::default()
        };
        let settings = Settings::resolve(overrides, env).unwrap();
        assert_eq!(settings.backend_base_url, "http://from-cli:2");
        assert_eq!(settings.port, 8002);
        assert_eq!(settings.required_scopes, vec!["cli-scope".to_string()]);
    }

    #[test]
    fn debug_flag_and_env_truthiness() {
        let overrides = Overrides {
            debug: true,
            ..Default::default()
        };
        assert!(Settings::resolve(overrides, no_env).unwrap().debug);

        for raw in ["1", "true", "TRUE", "yes"] {
            let env = env_of(&[(ENV_DEBUG, raw)]);
            assert!(
                Settings::resolve(Overrides::default(), env).unwrap().debug,
                "expected '{raw}' to enable debug"
            );
        }
        for raw in ["0", "false", "off", ""] {
            let env = env_of(&[(ENV_DEBUG, raw)]);
            assert!(
                !Settings::resolve(Overrides::default(), env).unwrap().debug,
                "expected '{raw}' to leave debug off"
            );
        }
    }

    #[test]
    fn invalid_port_is_an_error() {
        let env = env_of(&[(ENV_PORT, "not-a-port")]);
        assert!(Settings::resolve(Overrides::default(), env).is_err());
    }

    #[test]
    fn invalid_log_level_is_an_error() {
        let overrides = Overrides {
            log_level: Some("chatty".to_string()),
            ..Default::default()
        };
        assert!(Settings::resolve(overrides, no_env).is_err());
    }

    #[test]
    fn explicit_resource_server_url_is_kept() {
        let overrides = Overrides {
            resource_server_url: Some("https://mcp.ntdoc.site/mcp".to_string()),
            ..Default::default()
        };
        let settings = Settings::resolve(overrides, no_env).unwrap();
        assert_eq!(settings.resource_server_url, "https://mcp.ntdoc.site/mcp");
    }
}
