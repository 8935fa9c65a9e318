use crate::{
    context::Context,
    creds::Creds,
    error::{check, Error},
    util::copy_c_string,
};
use krb5_auth_sys as sys;
use libc::c_char;
use std::{
    ffi::CString,
    fmt,
    hash::{Hash, Hasher},
    ptr,
    rc::Rc,
};

/// A Kerberos principal identifying a user, service or machine.
///
/// Two principals are equal exactly when their canonical names are
/// equal, regardless of which context parsed them.
pub struct Principal {
    ctx: Rc<Context>,
    handle: sys::krb5_principal,
    name: String,
}

impl Principal {
    /// Parse a textual `name@REALM` representation.
    ///
    /// An empty name is rejected here: the native parser reports it
    /// with a confusing internal code instead of anything a caller
    /// could recognize.
    pub fn from_name(name: &str) -> Result<Principal, Error> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("principal name cannot be empty".into()));
        }
        let c_name = CString::new(name)
            .map_err(|_| Error::InvalidArgument("principal name cannot contain NUL".into()))?;
        let ctx = Context::current_configured()?;
        let k = sys::krb5();
        let mut handle: sys::krb5_principal = ptr::null_mut();
        check(Some(&ctx), unsafe {
            (k.parse_name)(ctx.as_ptr(), c_name.as_ptr(), &mut handle)
        })?;
        let mut principal = Principal {
            ctx,
            handle,
            name: String::new(),
        };
        principal.name = principal.unparse()?;
        Ok(principal)
    }

    fn unparse(&self) -> Result<String, Error> {
        let k = sys::krb5();
        let mut raw: *mut c_char = ptr::null_mut();
        check(Some(&self.ctx), unsafe {
            (k.unparse_name)(self.ctx.as_ptr(), self.handle, &mut raw)
        })?;
        let copy = unsafe { copy_c_string(raw) };
        unsafe { (k.free_unparsed_name)(self.ctx.as_ptr(), raw) };
        Ok(copy)
    }

    /// The canonical `name@REALM` form produced by the library.
    pub fn canonical_name(&self) -> &str {
        &self.name
    }

    pub(crate) fn context(&self) -> &Rc<Context> {
        &self.ctx
    }

    pub(crate) fn as_ptr(&self) -> sys::krb5_principal {
        self.handle
    }

    /// Obtain initial ticket-granting credentials for this principal
    /// using a password, optionally for a specific service.
    pub fn initial_credentials(
        &self,
        password: &str,
        service: Option<&str>,
    ) -> Result<Creds, Error> {
        Creds::initial(self, password, service)
    }

    /// Change this principal's password by authenticating with the
    /// current one against the password-change service.
    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), Error> {
        let creds = self.initial_credentials(old_password, Some("kadmin/changepw"))?;
        creds.set_password(new_password, Some(self))
    }
}

impl Drop for Principal {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { (sys::krb5().free_principal)(self.ctx.as_ptr(), self.handle) }
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Principal").field(&self.name).finish()
    }
}

impl PartialEq for Principal {
    fn eq(&self, other: &Principal) -> bool {
        self.name == other.name
    }
}

impl Eq for Principal {}

impl Hash for Principal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}
