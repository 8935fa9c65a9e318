//! A low level binding to the Kerberos 5 client library, loaded
//! dynamically at runtime.
//!
//! Unlike a link-time binding this crate resolves every entry point
//! with `dlsym` when the process first touches the library. That is
//! deliberate: the two supported vendor implementations (MIT and
//! Heimdal) export different symbol sets, so optional entries are
//! probed individually and recorded as [`Capabilities`] instead of
//! failing the whole load.
#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use lazy_static::lazy_static;
use libc::{c_char, c_int, c_uint, c_void};
use libloading::Library;
use log::debug;
use std::{env, error, fmt, ptr};

pub type krb5_error_code = c_int;
pub type krb5_flags = c_int;
pub type krb5_deltat = c_int;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct _krb5_context {
    _unused: [u8; 0],
}
pub type krb5_context = *mut _krb5_context;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct _krb5_principal_data {
    _unused: [u8; 0],
}
pub type krb5_principal = *mut _krb5_principal_data;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct _krb5_kt {
    _unused: [u8; 0],
}
pub type krb5_keytab = *mut _krb5_kt;

/// Points into the caller-allocated opaque credential buffer of
/// [`KRB5_CREDS_SIZEOF`] bytes. The structure layout is never
/// inspected on this side of the boundary.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct _krb5_creds {
    _unused: [u8; 0],
}
pub type krb5_creds = *mut _krb5_creds;

/// Counted octet string owned by the library (MIT layout).
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct krb5_data {
    pub magic: krb5_error_code,
    pub length: c_uint,
    pub data: *mut c_char,
}

impl krb5_data {
    pub fn empty() -> krb5_data {
        krb5_data {
            magic: 0,
            length: 0,
            data: ptr::null_mut(),
        }
    }
}

/// Options for `krb5_verify_init_creds`. Always initialized through
/// the library's own `krb5_verify_init_creds_opt_init` before use.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct krb5_verify_init_creds_opt {
    pub flags: krb5_flags,
    pub ap_req_nofail: c_int,
}

/// Size in bytes of the opaque `krb5_creds` structure a caller must
/// allocate for `krb5_get_init_creds_password`. MIT's x86_64
/// `sizeof(krb5_creds)` is 480; the constant leaves headroom because
/// the library only ever writes within its own idea of the size.
/// Confirm against the platform header when porting to a new target.
#[cfg(target_pointer_width = "64")]
pub const KRB5_CREDS_SIZEOF: usize = 512;
#[cfg(target_pointer_width = "32")]
pub const KRB5_CREDS_SIZEOF: usize = 256;

/// Longest keytab name `krb5_kt_get_name` may produce, per MIT krb5.h.
pub const MAX_KEYTAB_NAME_LEN: usize = 1100;

// com_err codes from the krb5 error table (base -1765328384). Only the
// codes callers need to recognize programmatically are named here; the
// library supplies the message text for everything else.
pub const KRB5KDC_ERR_C_PRINCIPAL_UNKNOWN: krb5_error_code = -1765328378;
pub const KRB5KDC_ERR_PREAUTH_FAILED: krb5_error_code = -1765328360;
pub const KRB5KRB_AP_ERR_BAD_INTEGRITY: krb5_error_code = -1765328353;
pub const KRB5KRB_AP_ERR_MODIFIED: krb5_error_code = -1765328343;

/// Environment variable naming the exact shared library file to load,
/// overriding the built-in candidate search.
pub const KRB5_LIBRARY_ENV: &str = "KRB5_AUTH_LIBRARY";

// Versioned names to try in order: .3 is MIT, .26 is Heimdal, then the
// unversioned development name.
#[cfg(all(unix, not(target_os = "macos")))]
pub const LIBRARY_CANDIDATES: [&str; 3] = ["libkrb5.so.3", "libkrb5.so.26", "libkrb5.so"];
#[cfg(target_os = "macos")]
pub const LIBRARY_CANDIDATES: [&str; 3] =
    ["libkrb5.3.dylib", "libkrb5.26.dylib", "libkrb5.dylib"];
#[cfg(windows)]
pub const LIBRARY_CANDIDATES: [&str; 2] = ["krb5_64.dll", "krb5.dll"];

bitflags::bitflags! {
    /// Optional entry points that were actually present at load time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const INIT_SECURE_CONTEXT = 1 << 0;
        const KT_HAVE_CONTENT = 1 << 1;
        const FREE_DEFAULT_REALM = 1 << 2;
    }
}

/// Failure to bind the library at initialization. Required symbols are
/// fatal; optional ones become capability gaps instead.
#[derive(Debug)]
pub enum LoadError {
    Library {
        tried: Vec<String>,
        source: libloading::Error,
    },
    Symbol {
        name: &'static str,
        source: libloading::Error,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoadError::Library { tried, source } => {
                write!(f, "no loadable Kerberos 5 library among {:?}: {}", tried, source)
            }
            LoadError::Symbol { name, source } => {
                write!(f, "required symbol {} is missing: {}", name, source)
            }
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Library { source, .. } => Some(source),
            LoadError::Symbol { source, .. } => Some(source),
        }
    }
}

unsafe fn sym<T: Copy>(lib: &Library, name: &'static str) -> Result<T, LoadError> {
    lib.get::<T>(name.as_bytes())
        .map(|s| *s)
        .map_err(|source| LoadError::Symbol { name, source })
}

/// The bound symbol table. One instance lives for the whole process
/// (see [`krb5`]); the `Library` field keeps the mapping alive for as
/// long as any of the function pointers can be called.
pub struct Krb5 {
    pub init_context: unsafe extern "C" fn(*mut krb5_context) -> krb5_error_code,
    /// Absent from Heimdal builds that predate secure-context support;
    /// callers degrade to `init_context` when `None`.
    pub init_secure_context:
        Option<unsafe extern "C" fn(*mut krb5_context) -> krb5_error_code>,
    pub free_context: unsafe extern "C" fn(krb5_context),
    pub get_default_realm:
        unsafe extern "C" fn(krb5_context, *mut *mut c_char) -> krb5_error_code,
    /// Absent from Heimdal; the realm string is malloc'd by the
    /// library, so callers fall back to `libc::free`.
    pub free_default_realm: Option<unsafe extern "C" fn(krb5_context, *mut c_char)>,
    pub get_error_message:
        unsafe extern "C" fn(krb5_context, krb5_error_code) -> *const c_char,
    pub free_error_message: unsafe extern "C" fn(krb5_context, *const c_char),
    pub parse_name:
        unsafe extern "C" fn(krb5_context, *const c_char, *mut krb5_principal) -> krb5_error_code,
    pub free_principal: unsafe extern "C" fn(krb5_context, krb5_principal),
    pub unparse_name:
        unsafe extern "C" fn(krb5_context, krb5_principal, *mut *mut c_char) -> krb5_error_code,
    pub free_unparsed_name: unsafe extern "C" fn(krb5_context, *mut c_char),
    pub kt_resolve:
        unsafe extern "C" fn(krb5_context, *const c_char, *mut krb5_keytab) -> krb5_error_code,
    pub kt_default: unsafe extern "C" fn(krb5_context, *mut krb5_keytab) -> krb5_error_code,
    pub kt_close: unsafe extern "C" fn(krb5_context, krb5_keytab) -> krb5_error_code,
    pub kt_get_name:
        unsafe extern "C" fn(krb5_context, krb5_keytab, *mut c_char, c_uint) -> krb5_error_code,
    /// MIT >= 1.11 only; callers fall back to a filesystem check.
    pub kt_have_content:
        Option<unsafe extern "C" fn(krb5_context, krb5_keytab) -> krb5_error_code>,
    /// The prompter argument is always passed null; password changes
    /// and initial credentials never prompt interactively here.
    pub get_init_creds_password: unsafe extern "C" fn(
        krb5_context,
        krb5_creds,
        krb5_principal,
        *const c_char,
        *const c_void,
        *mut c_void,
        krb5_deltat,
        *const c_char,
        *mut c_void,
    ) -> krb5_error_code,
    pub verify_init_creds: unsafe extern "C" fn(
        krb5_context,
        krb5_creds,
        krb5_principal,
        krb5_keytab,
        *mut c_void,
        *mut krb5_verify_init_creds_opt,
    ) -> krb5_error_code,
    pub verify_init_creds_opt_init: unsafe extern "C" fn(*mut krb5_verify_init_creds_opt),
    pub verify_init_creds_opt_set_ap_req_nofail:
        unsafe extern "C" fn(*mut krb5_verify_init_creds_opt, c_int),
    pub free_cred_contents: unsafe extern "C" fn(krb5_context, krb5_creds),
    pub set_password: unsafe extern "C" fn(
        krb5_context,
        krb5_creds,
        *const c_char,
        krb5_principal,
        *mut c_int,
        *mut krb5_data,
        *mut krb5_data,
    ) -> krb5_error_code,
    pub free_data_contents: unsafe extern "C" fn(krb5_context, *mut krb5_data),
    _lib: Library,
}

impl Krb5 {
    /// Load the library and bind every entry point. Honors
    /// [`KRB5_LIBRARY_ENV`] as an exact-name override, otherwise walks
    /// [`LIBRARY_CANDIDATES`] in order.
    pub fn load() -> Result<Krb5, LoadError> {
        let lib = match env::var_os(KRB5_LIBRARY_ENV) {
            Some(name) => unsafe { Library::new(&name) }.map_err(|source| {
                LoadError::Library {
                    tried: vec![name.to_string_lossy().into_owned()],
                    source,
                }
            })?,
            None => Krb5::open_candidates()?,
        };
        unsafe { Krb5::bind(lib) }
    }

    fn open_candidates() -> Result<Library, LoadError> {
        let mut source = match unsafe { Library::new(LIBRARY_CANDIDATES[0]) } {
            Ok(lib) => {
                debug!("loaded {}", LIBRARY_CANDIDATES[0]);
                return Ok(lib);
            }
            Err(e) => e,
        };
        for name in &LIBRARY_CANDIDATES[1..] {
            match unsafe { Library::new(name) } {
                Ok(lib) => {
                    debug!("loaded {}", name);
                    return Ok(lib);
                }
                Err(e) => source = e,
            }
        }
        Err(LoadError::Library {
            tried: LIBRARY_CANDIDATES.iter().map(|s| s.to_string()).collect(),
            source,
        })
    }

    unsafe fn bind(lib: Library) -> Result<Krb5, LoadError> {
        let table = Krb5 {
            init_context: sym(&lib, "krb5_init_context")?,
            init_secure_context: sym(&lib, "krb5_init_secure_context").ok(),
            free_context: sym(&lib, "krb5_free_context")?,
            get_default_realm: sym(&lib, "krb5_get_default_realm")?,
            free_default_realm: sym(&lib, "krb5_free_default_realm").ok(),
            get_error_message: sym(&lib, "krb5_get_error_message")?,
            free_error_message: sym(&lib, "krb5_free_error_message")?,
            parse_name: sym(&lib, "krb5_parse_name")?,
            free_principal: sym(&lib, "krb5_free_principal")?,
            unparse_name: sym(&lib, "krb5_unparse_name")?,
            free_unparsed_name: sym(&lib, "krb5_free_unparsed_name")?,
            kt_resolve: sym(&lib, "krb5_kt_resolve")?,
            kt_default: sym(&lib, "krb5_kt_default")?,
            kt_close: sym(&lib, "krb5_kt_close")?,
            kt_get_name: sym(&lib, "krb5_kt_get_name")?,
            kt_have_content: sym(&lib, "krb5_kt_have_content").ok(),
            get_init_creds_password: sym(&lib, "krb5_get_init_creds_password")?,
            verify_init_creds: sym(&lib, "krb5_verify_init_creds")?,
            verify_init_creds_opt_init: sym(&lib, "krb5_verify_init_creds_opt_init")?,
            verify_init_creds_opt_set_ap_req_nofail: sym(
                &lib,
                "krb5_verify_init_creds_opt_set_ap_req_nofail",
            )?,
            free_cred_contents: sym(&lib, "krb5_free_cred_contents")?,
            set_password: sym(&lib, "krb5_set_password")?,
            free_data_contents: sym(&lib, "krb5_free_data_contents")?,
            _lib: lib,
        };
        debug!("bound libkrb5, capabilities {:?}", table.capabilities());
        Ok(table)
    }

    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        if self.init_secure_context.is_some() {
            caps |= Capabilities::INIT_SECURE_CONTEXT;
        }
        if self.kt_have_content.is_some() {
            caps |= Capabilities::KT_HAVE_CONTENT;
        }
        if self.free_default_realm.is_some() {
            caps |= Capabilities::FREE_DEFAULT_REALM;
        }
        caps
    }
}

lazy_static! {
    static ref LIBKRB5: Krb5 = match Krb5::load() {
        Ok(lib) => lib,
        Err(e) => panic!("cannot initialize the Kerberos 5 library: {}", e),
    };
}

/// The process-wide symbol table, loaded on first use. A missing
/// library or missing required symbol is fatal here; nothing else in
/// the binding can work without it.
pub fn krb5() -> &'static Krb5 {
    &LIBKRB5
}
