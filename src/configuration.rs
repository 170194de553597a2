use crate::auth::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::error::ConfigError;

const MIN_SECRET_LENGTH: usize = 32;
// One year
const MAX_TOKEN_EXPIRY: i64 = 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub security: SecuritySettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// The server itself, for creating databases
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing settings
///
/// The two secrets are independent so a leaked access secret cannot be used
/// to mint refresh tokens, and the other way round.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    #[serde(default)]
    pub access_secret: String,
    #[serde(default)]
    pub refresh_secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("access_secret", &"[redacted]")
            .field("refresh_secret", &"[redacted]")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct SecuritySettings {
    /// bcrypt cost factor
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Users allowed to revoke sessions of other users
    #[serde(default)]
    pub admin_usernames: Vec<String>,
    /// Mark the refresh cookie `Secure` (HTTPS only)
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
            admin_usernames: Vec::new(),
            secure_cookies: default_secure_cookies(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_token_expiry() -> i64 {
    15 * 60
}

fn default_refresh_token_expiry() -> i64 {
    7 * 24 * 60 * 60
}

fn default_issuer() -> String {
    "tokenauth".to_string()
}

fn default_bcrypt_cost() -> u32 {
    10
}

fn default_secure_cookies() -> bool {
    true
}

impl JwtSettings {
    /// Checks run once at startup. Any failure here is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_secret("jwt.access_secret", &self.access_secret)?;
        check_secret("jwt.refresh_secret", &self.refresh_secret)?;

        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue(
                "jwt.access_secret and jwt.refresh_secret must differ".to_string(),
            ));
        }
        check_expiry("jwt.access_token_expiry", self.access_token_expiry)?;
        check_expiry("jwt.refresh_token_expiry", self.refresh_token_expiry)?;
        Ok(())
    }
}

fn check_expiry(name: &str, seconds: i64) -> Result<(), ConfigError> {
    if !(1..=MAX_TOKEN_EXPIRY).contains(&seconds) {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be between 1 and {} seconds",
            name, MAX_TOKEN_EXPIRY
        )));
    }
    Ok(())
}

fn check_secret(name: &str, secret: &str) -> Result<(), ConfigError> {
    if secret.trim().is_empty() {
        return Err(ConfigError::MissingRequired(name.to_string()));
    }
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InvalidValue(format!(
            "{} must be at least {} bytes",
            name, MIN_SECRET_LENGTH
        )));
    }
    Ok(())
}

impl SecuritySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "security.bcrypt_cost must be between {} and {}",
                MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }
        Ok(())
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.admin_usernames.iter().any(|admin| admin == username)
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        self.security.validate()
    }
}

/// Load settings from an optional `configuration` file, then `APP_*`
/// environment variables (`APP_JWT__ACCESS_SECRET`, `APP_APPLICATION__PORT`, ...).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    settings.validate()?;
    Ok(settings)
}
