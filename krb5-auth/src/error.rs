use crate::{context::Context, util::copy_c_string};
use krb5_auth_sys::{self as sys, krb5_error_code};
use std::{error, fmt, ptr};

/// A native library call returned a non-zero status.
///
/// The message is fetched from the library with a second call scoped
/// to the same context, copied once, and the native buffer released
/// before this value is constructed.
#[derive(Clone, Debug)]
pub struct LibCallError {
    pub code: krb5_error_code,
    pub message: String,
}

impl LibCallError {
    pub(crate) fn fetch(ctx: Option<&Context>, code: krb5_error_code) -> LibCallError {
        let k = sys::krb5();
        // A null context is tolerated by the library and yields a
        // generic message; needed when the context itself failed to
        // initialize.
        let ctx_ptr = ctx.map(|c| c.as_ptr()).unwrap_or(ptr::null_mut());
        let raw = unsafe { (k.get_error_message)(ctx_ptr, code) };
        let message = if raw.is_null() {
            format!("unknown error {}", code)
        } else {
            let copy = unsafe { copy_c_string(raw) };
            unsafe { (k.free_error_message)(ctx_ptr, raw) };
            copy
        };
        LibCallError { code, message }
    }
}

impl fmt::Display for LibCallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (krb5 error {})", self.message, self.code)
    }
}

impl error::Error for LibCallError {}

/// The password-change service delivered a rejection.
///
/// Distinct from [`LibCallError`]: the request itself succeeded, but
/// the response carries a non-zero protocol result code and a result
/// string that may span several lines (policy text, for instance).
#[derive(Clone, Debug)]
pub struct SetPassError {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for SetPassError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "password change rejected ({}): {}", self.code, self.message)
    }
}

impl error::Error for SetPassError {}

#[derive(Clone, Debug)]
pub enum Error {
    /// Malformed caller input, caught before any native call.
    InvalidArgument(String),
    LibCall(LibCallError),
    SetPass(SetPassError),
}

impl Error {
    /// The native status code, when this error carries one.
    pub fn code(&self) -> Option<krb5_error_code> {
        match self {
            Error::LibCall(e) => Some(e.code),
            Error::InvalidArgument(_) | Error::SetPass(_) => None,
        }
    }

    /// True exactly when the failure means the supplied password or
    /// principal was wrong, or the keytab disagreed with what the KDC
    /// presented. Infrastructure failures (unreachable KDC, bad
    /// keytab type, ...) return false.
    pub fn indicates_bad_credentials(&self) -> bool {
        match self {
            Error::LibCall(e) => matches!(
                e.code,
                sys::KRB5KDC_ERR_C_PRINCIPAL_UNKNOWN
                    | sys::KRB5KDC_ERR_PREAUTH_FAILED
                    | sys::KRB5KRB_AP_ERR_BAD_INTEGRITY
                    | sys::KRB5KRB_AP_ERR_MODIFIED
            ),
            Error::InvalidArgument(_) | Error::SetPass(_) => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            Error::LibCall(e) => fmt::Display::fmt(e, f),
            Error::SetPass(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::InvalidArgument(_) => None,
            Error::LibCall(e) => Some(e),
            Error::SetPass(e) => Some(e),
        }
    }
}

impl From<LibCallError> for Error {
    fn from(e: LibCallError) -> Error {
        Error::LibCall(e)
    }
}

impl From<SetPassError> for Error {
    fn from(e: SetPassError) -> Error {
        Error::SetPass(e)
    }
}

/// Wrap a status-returning native call: zero passes through, anything
/// else fetches the message and becomes a [`LibCallError`].
pub(crate) fn check(ctx: Option<&Context>, code: krb5_error_code) -> Result<(), Error> {
    if code == 0 {
        Ok(())
    } else {
        Err(Error::LibCall(LibCallError::fetch(ctx, code)))
    }
}
