//! Process identity lookup through procfs
//!
//! Name comes from `/proc/<pid>/comm`, owner from the real uid in
//! `/proc/<pid>/status` mapped through the passwd database.

use fsaudit_core::{IdentityLookup, LookupError, ProcessIdentity};
use std::io;

/// procfs-backed [`IdentityLookup`]
///
/// On platforms without procfs every lookup reports
/// [`LookupError::Unsupported`], which the attribution cache turns into
/// `unknown`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsLookup;

impl IdentityLookup for ProcfsLookup {
    fn lookup(&self, pid: u32) -> Result<ProcessIdentity, LookupError> {
        lookup_pid(pid)
    }
}

#[cfg(target_os = "linux")]
fn lookup_pid(pid: u32) -> Result<ProcessIdentity, LookupError> {
    let name = read_comm(pid).map_err(|e| to_lookup_error(pid, e))?;
    let owner = read_owner(pid).unwrap_or_else(|| fsaudit_core::UNKNOWN.to_string());
    Ok(ProcessIdentity::new(name, owner))
}

#[cfg(not(target_os = "linux"))]
fn lookup_pid(_pid: u32) -> Result<ProcessIdentity, LookupError> {
    Err(LookupError::Unsupported)
}

/// Command name of a running process
pub fn read_comm(pid: u32) -> io::Result<String> {
    let comm = std::fs::read_to_string(format!("/proc/{pid}/comm"))?;
    Ok(comm.trim_end_matches('\n').to_string())
}

#[cfg(target_os = "linux")]
fn read_owner(pid: u32) -> Option<String> {
    use nix::unistd::{Uid, User};

    let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
    let uid = parse_real_uid(&status)?;

    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => Some(user.name),
        // No passwd entry (containers, deleted users): keep the number
        _ => Some(uid.to_string()),
    }
}

/// Real uid from the `Uid:` line of `/proc/<pid>/status`
pub fn parse_real_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Uid:"))
        .and_then(|fields| fields.split_whitespace().next())
        .and_then(|uid| uid.parse().ok())
}

#[cfg(target_os = "linux")]
fn to_lookup_error(pid: u32, e: io::Error) -> LookupError {
    if e.kind() == io::ErrorKind::NotFound {
        LookupError::NotFound(pid)
    } else {
        LookupError::Io { pid, source: e }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_real_uid() {
        let status = "Name:\tbash\nUmask:\t0022\nState:\tS (sleeping)\nUid:\t1000\t1001\t1002\t1003\nGid:\t100\t100\t100\t100\n";
        assert_eq!(parse_real_uid(status), Some(1000));
        assert_eq!(parse_real_uid("Name:\tbash\n"), None);
        assert_eq!(parse_real_uid("Uid:\tabc\n"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_lookup_self() {
        let pid = std::process::id();
        let identity = ProcfsLookup.lookup(pid).unwrap();

        assert_eq!(identity.name, read_comm(pid).unwrap());
        assert!(!identity.name.is_empty());
        assert_ne!(identity.owner, fsaudit_core::UNKNOWN);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_lookup_unattributed_pid_fails() {
        assert!(matches!(ProcfsLookup.lookup(0), Err(LookupError::NotFound(0))));
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_lookup_unsupported() {
        assert!(matches!(ProcfsLookup.lookup(1), Err(LookupError::Unsupported)));
    }
}
