use crate::{
    context::Context,
    error::{check, Error, SetPassError},
    keytab::Keytab,
    principal::Principal,
    util::Data,
};
use krb5_auth_sys as sys;
use libc::c_int;
use std::{ffi::CString, ptr, rc::Rc};

/// Initial ticket-granting credentials obtained for one principal.
///
/// The native `krb5_creds` structure is opaque here: a fixed-size
/// buffer passed by address, never inspected. Release is two-phase:
/// the library frees the contents it hung off the structure, then the
/// buffer itself goes away with the `Box`.
pub struct Creds {
    ctx: Rc<Context>,
    buf: Box<[u8; sys::KRB5_CREDS_SIZEOF]>,
}

impl Creds {
    /// Request initial credentials for `principal` from a KDC using a
    /// password, optionally for `service` instead of the default
    /// ticket-granting service.
    pub fn initial(
        principal: &Principal,
        password: &str,
        service: Option<&str>,
    ) -> Result<Creds, Error> {
        let password = CString::new(password)
            .map_err(|_| Error::InvalidArgument("password cannot contain NUL".into()))?;
        let service = match service {
            Some(s) => Some(CString::new(s).map_err(|_| {
                Error::InvalidArgument("service name cannot contain NUL".into())
            })?),
            None => None,
        };
        let ctx = principal.context().clone();
        let mut buf = Box::new([0u8; sys::KRB5_CREDS_SIZEOF]);
        let k = sys::krb5();
        let code = unsafe {
            (k.get_init_creds_password)(
                ctx.as_ptr(),
                buf.as_mut_ptr() as sys::krb5_creds,
                principal.as_ptr(),
                password.as_ptr(),
                ptr::null(),     // prompter
                ptr::null_mut(), // prompter data
                0,               // start time
                service.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
                ptr::null_mut(), // options
            )
        };
        check(Some(&ctx), code)?;
        Ok(Creds { ctx, buf })
    }

    fn raw(&self) -> sys::krb5_creds {
        self.buf.as_ptr() as *mut u8 as sys::krb5_creds
    }

    /// Verify that these credentials came from a KDC that knows a key
    /// in `keytab` for `server` (or the library's defaults for either
    /// when `None`). With `nofail` set, missing verification data is
    /// an error rather than a silent pass; this is the check that
    /// defeats a spoofed or misconfigured KDC.
    pub fn verify(
        &self,
        nofail: bool,
        server: Option<&Principal>,
        keytab: Option<&Keytab>,
    ) -> Result<(), Error> {
        let k = sys::krb5();
        let mut opt = sys::krb5_verify_init_creds_opt {
            flags: 0,
            ap_req_nofail: 0,
        };
        unsafe {
            (k.verify_init_creds_opt_init)(&mut opt);
            (k.verify_init_creds_opt_set_ap_req_nofail)(&mut opt, nofail as c_int);
        }
        let code = unsafe {
            (k.verify_init_creds)(
                self.ctx.as_ptr(),
                self.raw(),
                server.map_or(ptr::null_mut(), |p| p.as_ptr()),
                keytab.map_or(ptr::null_mut(), |kt| kt.as_ptr()),
                ptr::null_mut(), // no output ccache
                &mut opt,
            )
        };
        check(Some(&self.ctx), code)
    }

    /// [`Creds::verify`] with `nofail` set.
    pub fn verify_strict(
        &self,
        server: Option<&Principal>,
        keytab: Option<&Keytab>,
    ) -> Result<(), Error> {
        self.verify(true, server, keytab)
    }

    /// Ask the password-change service to set a new password for
    /// `target` (or the principal these credentials belong to). The
    /// credentials must have been obtained for `kadmin/changepw`.
    ///
    /// A delivered rejection surfaces as [`SetPassError`] carrying the
    /// protocol result code and the full result text.
    pub fn set_password(
        &self,
        new_password: &str,
        target: Option<&Principal>,
    ) -> Result<(), Error> {
        let new_password = CString::new(new_password)
            .map_err(|_| Error::InvalidArgument("password cannot contain NUL".into()))?;
        let k = sys::krb5();
        let mut result_code: c_int = 0;
        let mut code_string = Data::empty(&self.ctx);
        let mut result_string = Data::empty(&self.ctx);
        let code = unsafe {
            (k.set_password)(
                self.ctx.as_ptr(),
                self.raw(),
                new_password.as_ptr(),
                target.map_or(ptr::null_mut(), |p| p.as_ptr()),
                &mut result_code,
                code_string.as_mut_ptr(),
                result_string.as_mut_ptr(),
            )
        };
        check(Some(&self.ctx), code)?;
        if result_code != 0 {
            let code_text = code_string.to_string_lossy();
            let result_text = result_string.to_string_lossy();
            let message = match (code_text.is_empty(), result_text.is_empty()) {
                (false, false) => format!("{}: {}", code_text, result_text),
                (false, true) => code_text,
                _ => result_text,
            };
            return Err(Error::SetPass(SetPassError {
                code: result_code,
                message,
            }));
        }
        Ok(())
    }
}

impl Drop for Creds {
    fn drop(&mut self) {
        // Contents first; the buffer itself is released by the Box.
        unsafe {
            (sys::krb5().free_cred_contents)(
                self.ctx.as_ptr(),
                self.buf.as_mut_ptr() as sys::krb5_creds,
            )
        }
    }
}
