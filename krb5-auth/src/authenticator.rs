use crate::{
    config::{self, Config},
    error::Error,
    keytab::Keytab,
    principal::Principal,
};
use bytes::Bytes;
use log::debug;
use std::{io::Write, path::PathBuf};

/// Authenticate a user by obtaining initial credentials with their
/// password and verifying those credentials against the configured
/// keytab, proving the KDC's identity.
///
/// Success is the absence of an error; every failure propagates as
/// the error the underlying step raised.
pub fn authenticate(username: &str, password: &str) -> Result<(), Error> {
    let cfg = config::config();
    let user = Principal::from_name(username)?;
    debug!("authenticating {}", user.canonical_name());
    let creds = user.initial_credentials(password, cfg.service.as_deref())?;
    with_keytab(&cfg, |keytab| {
        keytab.assert_has_content()?;
        let server = match cfg.server.as_deref() {
            Some(name) => Some(Principal::from_name(name)?),
            None => None,
        };
        creds.verify_strict(server.as_ref(), Some(keytab))
    })
}

/// Change a user's password by authenticating with the current one.
pub fn change_password(
    username: &str,
    old_password: &str,
    new_password: &str,
) -> Result<(), Error> {
    Principal::from_name(username)?.change_password(old_password, new_password)
}

enum KeytabSource {
    Bytes(Bytes),
    Path(PathBuf),
    Default,
}

fn keytab_source(cfg: &Config) -> KeytabSource {
    if let Some(bytes) = &cfg.keytab_bytes {
        KeytabSource::Bytes(bytes.clone())
    } else if let Some(path) = &cfg.keytab_path {
        KeytabSource::Path(path.clone())
    } else {
        KeytabSource::Default
    }
}

/// Resolve the configured keytab and hand it to `f`. Configured bytes
/// are materialized to a transient `FILE:` keytab that is removed
/// when this scope ends, whether `f` succeeded or not.
fn with_keytab<T>(cfg: &Config, f: impl FnOnce(&Keytab) -> Result<T, Error>) -> Result<T, Error> {
    match keytab_source(cfg) {
        KeytabSource::Bytes(bytes) => {
            let io_err =
                |e: std::io::Error| Error::InvalidArgument(format!("cannot materialize keytab: {}", e));
            let mut file = tempfile::Builder::new()
                .prefix("krb5_kt")
                .tempfile()
                .map_err(io_err)?;
            file.write_all(&bytes).map_err(io_err)?;
            file.flush().map_err(io_err)?;
            let keytab = Keytab::resolve(&format!("FILE:{}", file.path().display()))?;
            f(&keytab)
        }
        KeytabSource::Path(path) => {
            let keytab = Keytab::resolve(&format!("FILE:{}", path.display()))?;
            f(&keytab)
        }
        KeytabSource::Default => f(&Keytab::default_keytab()?),
    }
}
