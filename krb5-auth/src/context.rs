use crate::{
    error::{check, Error},
    util::copy_c_string,
};
use krb5_auth_sys as sys;
use libc::{c_char, c_void};
use log::debug;
use std::{cell::RefCell, ptr, rc::Rc};

thread_local! {
    // One slot per init mode. Contexts are never handed to another
    // thread (Rc keeps them !Send), so each thread builds its own.
    static CONTEXTS: RefCell<[Option<Rc<Context>>; 2]> = RefCell::new([None, None]);
}

/// A Kerberos library context, holding all per-thread library state.
///
/// Everything else in this crate (principals, keytabs, credentials)
/// is created through a context and holds an `Rc` to it, so a context
/// always outlives its dependents.
pub struct Context {
    handle: sys::krb5_context,
    secure: bool,
}

impl Context {
    /// Initialize a fresh context. With `secure` the library is told
    /// to ignore environment overrides such as its config-file path
    /// variable; vendors that never implemented the secure variant
    /// degrade silently to regular initialization (their default
    /// behavior already ignores the environment).
    pub fn new(secure: bool) -> Result<Context, Error> {
        let k = sys::krb5();
        let mut handle: sys::krb5_context = ptr::null_mut();
        let code = match (secure, k.init_secure_context) {
            (true, Some(init_secure)) => unsafe { init_secure(&mut handle) },
            (true, None) => {
                debug!("secure context init unavailable, using regular init");
                unsafe { (k.init_context)(&mut handle) }
            }
            (false, _) => unsafe { (k.init_context)(&mut handle) },
        };
        check(None, code)?;
        Ok(Context { handle, secure })
    }

    /// The calling thread's cached context for the given mode,
    /// initializing it on first use. Two calls on the same thread with
    /// the same mode return the same instance.
    pub fn current(secure: bool) -> Result<Rc<Context>, Error> {
        CONTEXTS.with(|slots| {
            let mut slots = slots.borrow_mut();
            let slot = &mut slots[secure as usize];
            if let Some(ctx) = slot {
                return Ok(ctx.clone());
            }
            let ctx = Rc::new(Context::new(secure)?);
            *slot = Some(ctx.clone());
            Ok(ctx)
        })
    }

    /// The thread's context in the mode selected by the process
    /// configuration.
    pub(crate) fn current_configured() -> Result<Rc<Context>, Error> {
        Context::current(crate::config::config().use_secure_context)
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub(crate) fn as_ptr(&self) -> sys::krb5_context {
        self.handle
    }

    /// The default realm configured for this context. The native
    /// buffer is copied and released before returning.
    pub fn default_realm(&self) -> Result<String, Error> {
        let k = sys::krb5();
        let mut raw: *mut c_char = ptr::null_mut();
        check(Some(self), unsafe {
            (k.get_default_realm)(self.handle, &mut raw)
        })?;
        let realm = unsafe { copy_c_string(raw) };
        unsafe {
            match k.free_default_realm {
                Some(free_realm) => free_realm(self.handle, raw),
                // Heimdal never exported the dedicated release entry;
                // the realm string is malloc'd by the library.
                None => libc::free(raw as *mut c_void),
            }
        }
        Ok(realm)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { (sys::krb5().free_context)(self.handle) }
        }
    }
}
