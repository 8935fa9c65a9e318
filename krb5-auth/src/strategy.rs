//! Adapter for identity frameworks that authenticate a stored
//! resource (a user record, typically) against Kerberos.
//!
//! The framework supplies a lookup and a resource carrying an
//! optional Kerberos principal; this module turns the authentication
//! attempt into one of the tagged outcomes the framework understands.
//! Only failures meaning "bad credentials" become the tagged
//! `Invalid` outcome; every other native error (an unreachable KDC,
//! say) propagates as an error.

use crate::{authenticator, error::Error};
use std::fmt;

/// A resource (user record) that may carry a Kerberos principal.
pub trait KerberosResource {
    /// The principal to authenticate as, e.g. derived from an email
    /// address, stored in a database column, or looked up in a
    /// directory.
    fn kerberos_principal(&self) -> Option<String>;
}

/// Tagged reasons an attempt was turned away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The lookup produced no resource.
    NotFoundInDatabase,
    /// The resource exists but has no Kerberos principal; another
    /// strategy (a local database password, say) may still apply.
    NoKerberosPrincipalForResource,
    /// Credential verification failed: wrong password, unknown
    /// principal, or a keytab mismatch.
    Invalid,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            Failure::NotFoundInDatabase => "not_found_in_database",
            Failure::NoKerberosPrincipalForResource => "no_kerberos_principal_for_resource",
            Failure::Invalid => "invalid",
        };
        write!(f, "{}", tag)
    }
}

#[derive(Debug)]
pub enum Outcome<R> {
    Success(R),
    Failure(Failure),
}

/// Run the full strategy: look the resource up, find its principal,
/// authenticate with the process configuration.
pub fn authenticate_resource<R, L>(
    lookup: L,
    identifier: &str,
    password: &str,
) -> Result<Outcome<R>, Error>
where
    R: KerberosResource,
    L: FnOnce(&str) -> Option<R>,
{
    let resource = match lookup(identifier) {
        Some(resource) => resource,
        None => return Ok(Outcome::Failure(Failure::NotFoundInDatabase)),
    };
    let principal = match resource.kerberos_principal() {
        Some(principal) => principal,
        None => return Ok(Outcome::Failure(Failure::NoKerberosPrincipalForResource)),
    };
    match authenticator::authenticate(&principal, password) {
        Ok(()) => Ok(Outcome::Success(resource)),
        Err(e) if e.indicates_bad_credentials() => Ok(Outcome::Failure(Failure::Invalid)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User {
        principal: Option<String>,
    }

    impl KerberosResource for User {
        fn kerberos_principal(&self) -> Option<String> {
            self.principal.clone()
        }
    }

    // Database-side failures never reach the native library, so these
    // hold without it.
    #[test]
    fn unknown_identifier_is_tagged() {
        let outcome =
            authenticate_resource(|_: &str| None::<User>, "who@example.org", "pw").unwrap();
        match outcome {
            Outcome::Failure(Failure::NotFoundInDatabase) => (),
            other => panic!("unexpected outcome {:?}", discriminant_name(&other)),
        }
    }

    #[test]
    fn missing_principal_is_tagged() {
        let outcome = authenticate_resource(
            |_: &str| Some(User { principal: None }),
            "who@example.org",
            "pw",
        )
        .unwrap();
        match outcome {
            Outcome::Failure(Failure::NoKerberosPrincipalForResource) => (),
            other => panic!("unexpected outcome {:?}", discriminant_name(&other)),
        }
    }

    #[test]
    fn failure_tags_render_for_the_framework() {
        assert_eq!(Failure::NotFoundInDatabase.to_string(), "not_found_in_database");
        assert_eq!(
            Failure::NoKerberosPrincipalForResource.to_string(),
            "no_kerberos_principal_for_resource"
        );
        assert_eq!(Failure::Invalid.to_string(), "invalid");
    }

    fn discriminant_name(outcome: &Outcome<User>) -> &'static str {
        match outcome {
            Outcome::Success(_) => "Success",
            Outcome::Failure(Failure::NotFoundInDatabase) => "NotFoundInDatabase",
            Outcome::Failure(Failure::NoKerberosPrincipalForResource) => {
                "NoKerberosPrincipalForResource"
            }
            Outcome::Failure(Failure::Invalid) => "Invalid",
        }
    }
}
