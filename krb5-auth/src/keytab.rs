use crate::{
    context::Context,
    error::{check, Error},
    util::copy_c_string,
};
use krb5_auth_sys as sys;
use libc::{c_char, c_uint};
use std::{ffi::CString, fs, path::PathBuf, ptr, rc::Rc};

fn split_name(name: &str) -> (&str, &str) {
    match name.find(':') {
        Some(i) => (&name[..i], &name[i + 1..]),
        // The library defaults a bare residual to a FILE keytab.
        None => ("FILE", name),
    }
}

fn is_file_kind(kind: &str) -> bool {
    kind.eq_ignore_ascii_case("FILE")
}

/// A reference to a local store of long-term keys.
///
/// Resolving a keytab only parses its `TYPE:residual` name and picks
/// a backend; the store does not have to exist until it is read.
pub struct Keytab {
    ctx: Rc<Context>,
    handle: sys::krb5_keytab,
}

impl Keytab {
    /// Resolve a `TYPE:residual` name, commonly `FILE:/path`.
    pub fn resolve(name: &str) -> Result<Keytab, Error> {
        let c_name = CString::new(name)
            .map_err(|_| Error::InvalidArgument("keytab name cannot contain NUL".into()))?;
        let ctx = Context::current_configured()?;
        let k = sys::krb5();
        let mut handle: sys::krb5_keytab = ptr::null_mut();
        check(Some(&ctx), unsafe {
            (k.kt_resolve)(ctx.as_ptr(), c_name.as_ptr(), &mut handle)
        })?;
        Ok(Keytab { ctx, handle })
    }

    /// The platform's default key store.
    pub fn default_keytab() -> Result<Keytab, Error> {
        let ctx = Context::current_configured()?;
        let k = sys::krb5();
        let mut handle: sys::krb5_keytab = ptr::null_mut();
        check(Some(&ctx), unsafe {
            (k.kt_default)(ctx.as_ptr(), &mut handle)
        })?;
        Ok(Keytab { ctx, handle })
    }

    pub(crate) fn as_ptr(&self) -> sys::krb5_keytab {
        self.handle
    }

    /// The full resolved name, `TYPE:residual`.
    pub fn name(&self) -> Result<String, Error> {
        let k = sys::krb5();
        let mut buf = [0 as c_char; sys::MAX_KEYTAB_NAME_LEN];
        check(Some(&self.ctx), unsafe {
            (k.kt_get_name)(
                self.ctx.as_ptr(),
                self.handle,
                buf.as_mut_ptr(),
                buf.len() as c_uint,
            )
        })?;
        Ok(unsafe { copy_c_string(buf.as_ptr()) })
    }

    /// The key store type, e.g. `FILE`.
    pub fn kind(&self) -> Result<String, Error> {
        Ok(split_name(&self.name()?).0.to_string())
    }

    /// Everything after the first `:` of the resolved name.
    pub fn residual(&self) -> Result<String, Error> {
        Ok(split_name(&self.name()?).1.to_string())
    }

    /// The on-disk path, defined only for `FILE` keytabs.
    pub fn path(&self) -> Result<Option<PathBuf>, Error> {
        let name = self.name()?;
        let (kind, residual) = split_name(&name);
        Ok(if is_file_kind(kind) {
            Some(PathBuf::from(residual))
        } else {
            None
        })
    }

    /// Errors unless the store exists and holds at least one entry.
    ///
    /// Libraries without the native content check get a filesystem
    /// readability heuristic for `FILE` keytabs and the benefit of the
    /// doubt for every other type.
    pub fn assert_has_content(&self) -> Result<(), Error> {
        let k = sys::krb5();
        if let Some(have_content) = k.kt_have_content {
            return check(Some(&self.ctx), unsafe {
                have_content(self.ctx.as_ptr(), self.handle)
            });
        }
        if let Some(path) = self.path()? {
            let meta = fs::metadata(&path).map_err(|e| {
                Error::InvalidArgument(format!("keytab {} is not readable: {}", path.display(), e))
            })?;
            if meta.len() == 0 {
                return Err(Error::InvalidArgument(format!(
                    "keytab {} is empty",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Non-raising wrapper around [`Keytab::assert_has_content`].
    pub fn has_content(&self) -> bool {
        self.assert_has_content().is_ok()
    }
}

impl Drop for Keytab {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            let _ = unsafe { (sys::krb5().kt_close)(self.ctx.as_ptr(), self.handle) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_takes_the_first_separator_only() {
        assert_eq!(split_name("FILE:/etc/krb5.keytab"), ("FILE", "/etc/krb5.keytab"));
        assert_eq!(split_name("MEMORY:anon"), ("MEMORY", "anon"));
        // Residuals may themselves contain separators.
        assert_eq!(
            split_name("FILE:C:/kerberos/krb5.keytab"),
            ("FILE", "C:/kerberos/krb5.keytab")
        );
    }

    #[test]
    fn bare_residual_defaults_to_file() {
        assert_eq!(split_name("/etc/krb5.keytab"), ("FILE", "/etc/krb5.keytab"));
    }

    #[test]
    fn split_handles_non_ascii_and_long_paths() {
        assert_eq!(
            split_name("FILE:/итд/krb5.keytab"),
            ("FILE", "/итд/krb5.keytab")
        );
        let long = format!("/{}/krb5.keytab", "x".repeat(300));
        let name = format!("FILE:{}", long);
        assert_eq!(split_name(&name), ("FILE", long.as_str()));
    }

    #[test]
    fn file_kind_matches_case_insensitively() {
        assert!(is_file_kind("FILE"));
        assert!(is_file_kind("file"));
        assert!(!is_file_kind("MEMORY"));
    }
}
