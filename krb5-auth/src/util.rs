use crate::context::Context;
use krb5_auth_sys as sys;
use libc::c_char;
use std::{ffi::CStr, ops::Deref, slice};

/// Copy a library-owned C string into an owned `String`. The caller
/// remains responsible for releasing the native memory afterwards.
pub(crate) unsafe fn copy_c_string(ptr: *const c_char) -> String {
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

/// A `krb5_data` whose contents the library allocated. Callers copy
/// what they need out of the byte view; the contents are released
/// through `krb5_free_data_contents` exactly once, on drop.
pub(crate) struct Data<'a> {
    ctx: &'a Context,
    raw: sys::krb5_data,
}

impl<'a> Data<'a> {
    pub(crate) fn empty(ctx: &'a Context) -> Data<'a> {
        Data {
            ctx,
            raw: sys::krb5_data::empty(),
        }
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut sys::krb5_data {
        &mut self.raw
    }

    pub(crate) fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self).into_owned()
    }
}

impl<'a> Deref for Data<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        if self.raw.data.is_null() || self.raw.length == 0 {
            &[]
        } else {
            unsafe {
                slice::from_raw_parts(self.raw.data as *const u8, self.raw.length as usize)
            }
        }
    }
}

impl<'a> Drop for Data<'a> {
    fn drop(&mut self) {
        if !self.raw.data.is_null() {
            unsafe { (sys::krb5().free_data_contents)(self.ctx.as_ptr(), &mut self.raw) }
        }
    }
}
