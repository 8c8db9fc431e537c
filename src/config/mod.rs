use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix shared by every service-specific environment variable
pub const ENV_PREFIX: &str = "AMLD_";

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub exec: ExecConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub handler_dir: PathBuf,
    pub public_dir: PathBuf,
    pub max_request_size_bytes: usize,
    pub enable_compression: bool,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityConfig {
    /// Claim whose value is exported to executables as JWT_ID
    pub id_key: String,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_timeout: Duration,
    pub jwt_token_lookup: String,
    pub jwt_realm: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecConfig {
    /// PATH handed to every executable, captured once at startup
    pub path: String,
    pub timeout: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match var("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let mut config = match environment {
            Environment::Production => Self::production(),
            Environment::Development => Self::development(),
        };
        config.exec.path = var("PATH").unwrap_or_default();
        config.with_overrides(|name| var(&format!("{ENV_PREFIX}{name}")))
    }

    fn with_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = var("BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = var("HANDLER_DIR") {
            self.server.handler_dir = PathBuf::from(v);
        }
        if let Some(v) = var("PUBLIC_DIR") {
            self.server.public_dir = PathBuf::from(v);
        }
        if let Some(v) = var("MAX_REQUEST_SIZE_BYTES") {
            self.server.max_request_size_bytes = v.parse().unwrap_or(self.server.max_request_size_bytes);
        }
        if let Some(v) = var("ENABLE_COMPRESSION") {
            self.server.enable_compression = v.parse().unwrap_or(self.server.enable_compression);
        }
        if let Some(v) = var("ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }

        // Security overrides
        if let Some(v) = var("ID_KEY") {
            self.security.id_key = v;
        }
        if let Some(v) = var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Some(v) = var("JWT_TIMEOUT") {
            match parse_duration(&v) {
                Some(timeout) => self.security.jwt_timeout = timeout,
                None => tracing::warn!("ignoring unparseable {}JWT_TIMEOUT value {:?}", ENV_PREFIX, v),
            }
        }
        if let Some(v) = var("JWT_TOKEN_LOOKUP") {
            self.security.jwt_token_lookup = v;
        }
        if let Some(v) = var("JWT_REALM") {
            self.security.jwt_realm = v;
        }

        // Execution overrides
        if let Some(v) = var("EXEC_TIMEOUT") {
            match parse_duration(&v) {
                Some(timeout) if !timeout.is_zero() => self.exec.timeout = Some(timeout),
                Some(_) => self.exec.timeout = None,
                None => tracing::warn!("ignoring unparseable {}EXEC_TIMEOUT value {:?}", ENV_PREFIX, v),
            }
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                enable_cors: true,
                ..ServerConfig::default()
            },
            security: SecurityConfig::default(),
            exec: ExecConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                enable_cors: false,
                ..ServerConfig::default()
            },
            security: SecurityConfig::default(),
            exec: ExecConfig::default(),
        }
    }

    /// Socket address to bind; a bare `:port` listens on all interfaces.
    pub fn listen_address(&self) -> String {
        let addr = self.server.bind_address.trim();
        if addr.starts_with(':') {
            format!("0.0.0.0{}", addr)
        } else {
            addr.to_string()
        }
    }

    /// Reserved login executable under the handler directory.
    pub fn login_program(&self) -> PathBuf {
        self.server.handler_dir.join(crate::registry::LOGIN_ROUTE).join(crate::registry::HANDLER_PROGRAM)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: ":9313".to_string(),
            handler_dir: PathBuf::from("./handlers/"),
            public_dir: PathBuf::from("./public/"),
            max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            enable_compression: true,
            enable_cors: false,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            id_key: "uid".to_string(),
            jwt_secret: String::new(),
            jwt_timeout: Duration::from_secs(4 * 60 * 60),
            jwt_token_lookup: "header: Authorization".to_string(),
            jwt_realm: "api-moduled".to_string(),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            timeout: None,
        }
    }
}

/// Parse `90`, `90s`, `30m`, `4h` or compound forms such as `1h30m`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut total = 0u64;
    let mut digits = String::new();
    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u64 = digits.parse().ok()?;
        digits.clear();
        let unit = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(unit)?)?;
    }
    if !digits.is_empty() {
        return None;
    }
    Some(Duration::from_secs(total))
}
