//! Gateway configuration — loading and validating `mcp-gateway.yaml`.
//!
//! The config file names the listen address, logging options, upstream
//! timeouts, a default upstream list, and optional per-user upstream lists.
//! String values may reference environment variables as `${VAR}` or
//! `${VAR:-default}`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gateway::errors::GatewayError;
use crate::mcp_client::ClientTimeouts;

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "mcp-gateway.yaml";

/// Environment variable holding an explicit config path.
pub const CONFIG_PATH_ENV: &str = "MCP_GATEWAY_CONFIG";

// ─── Types ───────────────────────────────────────────────────────────────────

/// One upstream tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Unique name, used as the tool namespace prefix.
    pub name: String,
    /// HTTP endpoint accepting JSON-RPC POSTs.
    pub url: String,
    /// Per-tool enable flags keyed by raw tool name. Tools not listed are enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<HashMap<String, bool>>,
}

impl UpstreamConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            tools: None,
        }
    }

    /// Only an explicit `false` disables a tool.
    pub fn is_tool_enabled(&self, raw_name: &str) -> bool {
        self.tools
            .as_ref()
            .and_then(|flags| flags.get(raw_name))
            .copied()
            .unwrap_or(true)
    }

    pub fn set_tool_enabled(&mut self, raw_name: &str, enabled: bool) {
        self.tools
            .get_or_insert_with(HashMap::new)
            .insert(raw_name.to_string(), enabled);
    }
}

/// Upstream deadlines, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    #[serde(default = "default_initialize_secs")]
    pub initialize_secs: u64,
    #[serde(default = "default_call_secs")]
    pub call_secs: u64,
}

fn default_connect_secs() -> u64 {
    5
}
fn default_initialize_secs() -> u64 {
    30
}
fn default_call_secs() -> u64 {
    60
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            initialize_secs: default_initialize_secs(),
            call_secs: default_call_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn client_timeouts(&self) -> ClientTimeouts {
        ClientTimeouts {
            initialize: Duration::from_secs(self.initialize_secs),
            call: Duration::from_secs(self.call_secs),
        }
    }
}

/// Top-level structure of `mcp-gateway.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// When set, logs go to `<log_dir>/gateway.log` instead of stderr.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Upstreams for callers without a per-user list.
    #[serde(default)]
    pub upstreams: Vec<UpstreamConfig>,
    /// Per-user upstream lists, keyed by user id.
    #[serde(default)]
    pub users: HashMap<String, Vec<UpstreamConfig>>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_dir: None,
            log_json: false,
            timeouts: TimeoutConfig::default(),
            upstreams: Vec::new(),
            users: HashMap::new(),
        }
    }
}

impl GatewayConfig {
    /// The upstream list for a caller: their own list if configured,
    /// otherwise the default list.
    pub fn upstreams_for(&self, user_id: Option<&str>) -> &[UpstreamConfig] {
        user_id
            .and_then(|id| self.users.get(id))
            .map(Vec::as_slice)
            .unwrap_or(self.upstreams.as_slice())
    }

    /// Check names, URLs, and timeouts.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let t = &self.timeouts;
        if t.connect_secs == 0 || t.initialize_secs == 0 || t.call_secs == 0 {
            return Err(GatewayError::ConfigError {
                reason: "timeouts must be greater than zero".into(),
            });
        }

        validate_upstreams("upstreams", &self.upstreams)?;
        for (user, list) in &self.users {
            validate_upstreams(&format!("users.{user}"), list)?;
        }
        Ok(())
    }
}

fn validate_upstreams(section: &str, list: &[UpstreamConfig]) -> Result<(), GatewayError> {
    let mut seen = HashSet::new();
    for upstream in list {
        if upstream.name.trim().is_empty() {
            return Err(GatewayError::ConfigError {
                reason: format!("{section}: upstream name must not be empty"),
            });
        }
        if !seen.insert(upstream.name.as_str()) {
            return Err(GatewayError::ConfigError {
                reason: format!("{section}: duplicate upstream name '{}'", upstream.name),
            });
        }
        let url = reqwest::Url::parse(&upstream.url).map_err(|e| GatewayError::ConfigError {
            reason: format!("{section}: invalid url for '{}': {e}", upstream.name),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GatewayError::ConfigError {
                reason: format!(
                    "{section}: url for '{}' must use http or https, got '{}'",
                    upstream.name,
                    url.scheme()
                ),
            });
        }
    }
    Ok(())
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Search order:
/// 1. `MCP_GATEWAY_CONFIG` env var (must point at an existing file)
/// 2. `mcp-gateway.yaml` in `start` or any of its ancestors
///
/// Returns `Ok(None)` when nothing is found.
pub fn find_config_path(start: &Path) -> Result<Option<PathBuf>, GatewayError> {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
        let candidate = PathBuf::from(expand_tilde(&explicit));
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
        return Err(GatewayError::ConfigError {
            reason: format!(
                "{CONFIG_PATH_ENV} points at {}, which does not exist",
                candidate.display()
            ),
        });
    }

    Ok(search_upward(start))
}

fn search_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Load, interpolate, parse, and validate a config file.
pub fn load_gateway_config(path: &Path) -> Result<GatewayConfig, GatewayError> {
    let raw = std::fs::read_to_string(path).map_err(|e| GatewayError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    parse_gateway_config(&raw).map_err(|e| match e {
        GatewayError::ConfigError { reason } => GatewayError::ConfigError {
            reason: format!("{}: {reason}", path.display()),
        },
        other => other,
    })
}

/// Parse config text. An empty document yields the defaults.
pub fn parse_gateway_config(raw: &str) -> Result<GatewayConfig, GatewayError> {
    let interpolated = interpolate_env_vars(raw);

    let mut config = if interpolated.trim().is_empty() {
        GatewayConfig::default()
    } else {
        serde_yaml::from_str::<GatewayConfig>(&interpolated).map_err(|e| {
            GatewayError::ConfigError {
                reason: format!("failed to parse YAML: {e}"),
            }
        })?
    };

    if let Some(dir) = &config.log_dir {
        config.log_dir = Some(PathBuf::from(expand_tilde(&dir.to_string_lossy())));
    }

    config.validate()?;
    Ok(config)
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` patterns with environment values.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve `VAR` or `VAR:-default`. Unset variables without a default
/// resolve to the empty string.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
bind: "0.0.0.0:8080"
log_json: true
timeouts:
  initialize_secs: 10
upstreams:
  - name: search
    url: http://localhost:8001/mcp
    tools:
      delete_index: false
users:
  user_123:
    - name: github
      url: https://example.com/mcp
"#;

    #[test]
    fn test_parse_full_config() {
        let config = parse_gateway_config(SAMPLE).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert!(config.log_json);
        assert_eq!(config.timeouts.initialize_secs, 10);
        assert_eq!(config.timeouts.call_secs, 60);
        assert_eq!(config.upstreams.len(), 1);
        assert!(!config.upstreams[0].is_tool_enabled("delete_index"));
        assert!(config.upstreams[0].is_tool_enabled("query"));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_gateway_config("").unwrap();
        assert_eq!(config, GatewayConfig::default());
        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(
            config.timeouts.client_timeouts(),
            ClientTimeouts::default()
        );
    }

    #[test]
    fn test_upstreams_for_prefers_user_list() {
        let config = parse_gateway_config(SAMPLE).unwrap();
        assert_eq!(config.upstreams_for(Some("user_123"))[0].name, "github");
        assert_eq!(config.upstreams_for(Some("someone_else"))[0].name, "search");
        assert_eq!(config.upstreams_for(None)[0].name, "search");
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let raw = r#"
upstreams:
  - { name: a, url: "http://localhost:1/mcp" }
  - { name: a, url: "http://localhost:2/mcp" }
"#;
        let err = parse_gateway_config(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate upstream name 'a'"));
    }

    #[test]
    fn test_rejects_bad_scheme_and_empty_name() {
        let raw = "upstreams:\n  - { name: a, url: \"ftp://localhost/mcp\" }\n";
        assert!(parse_gateway_config(raw)
            .unwrap_err()
            .to_string()
            .contains("http or https"));

        let raw = "upstreams:\n  - { name: \" \", url: \"http://localhost/mcp\" }\n";
        assert!(parse_gateway_config(raw)
            .unwrap_err()
            .to_string()
            .contains("must not be empty"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let raw = "timeouts:\n  call_secs: 0\n";
        assert!(parse_gateway_config(raw).is_err());
    }

    #[test]
    fn test_interpolate_env_vars_with_default() {
        let input = "url: ${MCP_GATEWAY_TEST_UNSET_VAR:-http://localhost:9/mcp}";
        assert_eq!(interpolate_env_vars(input), "url: http://localhost:9/mcp");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("MCP_GATEWAY_TEST_HOST", "upstream.internal");
        let input = "url: http://${MCP_GATEWAY_TEST_HOST}/mcp";
        assert_eq!(interpolate_env_vars(input), "url: http://upstream.internal/mcp");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "bind: 127.0.0.1:3000";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/logs");
        assert!(!result.starts_with('~'), "tilde should be expanded");
        assert!(result.ends_with("/logs"));
    }

    #[test]
    fn test_set_tool_enabled_creates_flags() {
        let mut upstream = UpstreamConfig::new("a", "http://localhost/mcp");
        upstream.set_tool_enabled("x", false);
        assert!(!upstream.is_tool_enabled("x"));
        upstream.set_tool_enabled("x", true);
        assert!(upstream.is_tool_enabled("x"));
    }

    #[test]
    fn test_search_upward_and_load() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(CONFIG_FILE_NAME), SAMPLE).unwrap();

        let found = search_upward(&nested).unwrap();
        assert_eq!(found, root.path().join(CONFIG_FILE_NAME));

        let config = load_gateway_config(&found).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "upstreams: [not, a, mapping").unwrap();

        let err = load_gateway_config(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}
