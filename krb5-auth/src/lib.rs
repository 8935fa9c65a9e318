//! Authenticate Kerberos users with their password.
//!
//! This crate wraps a native Kerberos 5 client library (MIT or
//! Heimdal, loaded dynamically by [`krb5_auth_sys`]) to obtain
//! initial ticket-granting credentials for a principal, verify them
//! against a locally-stored key (proving the KDC's identity, which
//! defeats a spoofed KDC), and change a principal's password.
//!
//! All calls are synchronous and may block for a network round trip
//! to a KDC. Library contexts are cached per thread and never shared
//! across threads; run concurrent authentications on separate
//! threads and each gets its own context.
//!
//! ```no_run
//! krb5_auth::setup(|config| {
//!     config.server = Some("host/web.example.org@EXAMPLE.ORG".into());
//!     config.keytab_path = Some("/etc/krb5.keytab".into());
//! });
//! krb5_auth::authenticate("user@EXAMPLE.ORG", "hunter2")?;
//! # Ok::<(), krb5_auth::Error>(())
//! ```

mod authenticator;
mod config;
mod context;
mod creds;
mod error;
mod keytab;
mod principal;
pub mod strategy;
mod util;

pub use crate::{
    authenticator::{authenticate, change_password},
    config::{config, configure, setup, Config},
    context::Context,
    creds::Creds,
    error::{Error, LibCallError, SetPassError},
    keytab::Keytab,
    principal::Principal,
};
