use anyhow::Result;
use libc::{getpwuid, uid_t};
use std::ffi::CStr;

/// The user a command acts on when none is given: the invoking user under sudo,
/// otherwise the effective user.
pub fn default_username() -> Result<String> {
    match std::env::var("SUDO_USER") {
        Ok(user) if !user.trim().is_empty() => Ok(user),
        _ => current_username(),
    }
}

pub fn current_username() -> Result<String> {
    unsafe {
        let uid = libc::geteuid();
        let pwd = getpwuid(uid as uid_t);
        if pwd.is_null() {
            return Err(anyhow::anyhow!("failed to resolve user name for uid {}", uid));
        }
        let name = CStr::from_ptr((*pwd).pw_name);
        Ok(name.to_string_lossy().into_owned())
    }
}
