use crate::error::Error;
use base64::Engine;
use bytes::Bytes;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use std::path::PathBuf;

/// Process-wide settings consumed by [`authenticate`] and
/// [`change_password`].
///
/// [`authenticate`]: crate::authenticate
/// [`change_password`]: crate::change_password
#[derive(Clone, Debug)]
pub struct Config {
    /// Service principal requested when obtaining a user's initial
    /// credentials. `None` asks for the default ticket-granting
    /// service.
    pub service: Option<String>,
    /// Server principal whose keytab entry is used to verify the
    /// KDC's identity.
    pub server: Option<String>,
    /// Path to the keytab used for verification.
    pub keytab_path: Option<PathBuf>,
    /// Keytab contents held in memory; takes precedence over
    /// `keytab_path` when both are set. Materialized to a transient
    /// file for the duration of each authentication attempt.
    pub keytab_bytes: Option<Bytes>,
    /// Initialize library contexts so they ignore environment
    /// overrides such as the config-file path variable. On by
    /// default.
    pub use_secure_context: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            service: None,
            server: None,
            keytab_path: None,
            keytab_bytes: None,
            use_secure_context: true,
        }
    }
}

impl Config {
    /// Decode a Base64 keytab into `keytab_bytes`. Whitespace is
    /// ignored, so line-wrapped output of encoding tools works as-is.
    pub fn set_keytab_base64(&mut self, encoded: &str) -> Result<(), Error> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| Error::InvalidArgument(format!("keytab is not valid Base64: {}", e)))?;
        self.keytab_bytes = Some(Bytes::from(decoded));
        Ok(())
    }
}

lazy_static! {
    static ref CONFIG: Mutex<Config> = Mutex::new(Config::default());
}

/// Replace the process-wide configuration wholesale. Only subsequent
/// operations observe the new value; in-flight ones are unaffected.
pub fn configure(config: Config) {
    *CONFIG.lock() = config;
}

/// A snapshot of the current configuration.
pub fn config() -> Config {
    CONFIG.lock().clone()
}

/// Adjust the configuration in place.
///
/// ```
/// krb5_auth::setup(|config| {
///     config.server = Some("host/web.example.org@EXAMPLE.ORG".into());
///     config.keytab_path = Some("/etc/krb5.keytab".into());
/// });
/// ```
pub fn setup<F: FnOnce(&mut Config)>(f: F) {
    f(&mut CONFIG.lock())
}
