//! Effective uid/gid switching for set-user-ID and set-group-ID installs.
//!
//! The binary starts with the owner's effective uid (and, for set-gid
//! installs, the group's effective gid), lowers both to the caller's real
//! ids straight away, and only raises them again around the `open(2)` of a
//! path the policy has allowed.

use nix::unistd::{Gid, Uid, getegid, geteuid, getgid, getuid, setegid, seteuid};
use tracing::{debug, instrument};

/// Errors raised while changing the effective ids.
#[derive(Debug, thiserror::Error)]
pub enum PrivilegeError {
    #[error("cannot switch effective uid to {uid}: {source}")]
    SwitchUser {
        uid: u32,
        #[source]
        source: nix::Error,
    },

    #[error("cannot switch effective gid to {gid}: {source}")]
    SwitchGroup {
        gid: u32,
        #[source]
        source: nix::Error,
    },
}

/// Control over the process's effective privilege.
///
/// The dump service is generic over this so tests can record when elevation
/// happens.
pub trait PrivilegeControl {
    /// Drop back to the caller's own rights.
    fn lower(&self) -> Result<(), PrivilegeError>;

    /// Take on the rights needed to read under the trusted root.
    fn raise(&self) -> Result<(), PrivilegeError>;
}

impl<P: PrivilegeControl + ?Sized> PrivilegeControl for &P {
    fn lower(&self) -> Result<(), PrivilegeError> {
        (**self).lower()
    }

    fn raise(&self) -> Result<(), PrivilegeError> {
        (**self).raise()
    }
}

/// Saved-set-ID based privilege control.
#[derive(Debug, Clone, Copy)]
pub struct SetuidPrivilege {
    real_uid: Uid,
    elevated_uid: Uid,
    real_gid: Gid,
    elevated_gid: Gid,
}

impl SetuidPrivilege {
    /// Records the current real and effective ids, then lowers the
    /// effective uid and gid to the real ones.
    ///
    /// Call this before anything looks at caller input.
    pub fn capture() -> Result<Self, PrivilegeError> {
        let privilege = Self {
            real_uid: getuid(),
            elevated_uid: geteuid(),
            real_gid: getgid(),
            elevated_gid: getegid(),
        };
        privilege.lower()?;
        Ok(privilege)
    }

    /// Whether the process was started set-uid.
    pub fn is_setuid(&self) -> bool {
        self.real_uid != self.elevated_uid
    }

    /// Whether the process was started set-gid.
    pub fn is_setgid(&self) -> bool {
        self.real_gid != self.elevated_gid
    }

    /// Whether there is anything to raise at all.
    pub fn is_elevated(&self) -> bool {
        self.is_setuid() || self.is_setgid()
    }

    fn switch_user(&self, uid: Uid) -> Result<(), PrivilegeError> {
        if !self.is_setuid() || geteuid() == uid {
            return Ok(());
        }
        seteuid(uid).map_err(|source| PrivilegeError::SwitchUser {
            uid: uid.as_raw(),
            source,
        })?;
        debug!("Effective uid is now {}", uid);
        Ok(())
    }

    fn switch_group(&self, gid: Gid) -> Result<(), PrivilegeError> {
        if !self.is_setgid() || getegid() == gid {
            return Ok(());
        }
        setegid(gid).map_err(|source| PrivilegeError::SwitchGroup {
            gid: gid.as_raw(),
            source,
        })?;
        debug!("Effective gid is now {}", gid);
        Ok(())
    }
}

impl PrivilegeControl for SetuidPrivilege {
    // Group first: the real and saved gids stay reachable either way, but
    // this keeps the uid change last on the way down and first on the way up.
    #[instrument(level = "debug", skip(self))]
    fn lower(&self) -> Result<(), PrivilegeError> {
        self.switch_group(self.real_gid)?;
        self.switch_user(self.real_uid)
    }

    #[instrument(level = "debug", skip(self))]
    fn raise(&self) -> Result<(), PrivilegeError> {
        self.switch_user(self.elevated_uid)?;
        self.switch_group(self.elevated_gid)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::{PrivilegeControl, PrivilegeError};

    /// Records every privilege change instead of performing it.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPrivilege {
        events: RefCell<Vec<&'static str>>,
    }

    impl RecordingPrivilege {
        pub(crate) fn events(&self) -> Vec<&'static str> {
            self.events.borrow().clone()
        }
    }

    impl PrivilegeControl for RecordingPrivilege {
        fn lower(&self) -> Result<(), PrivilegeError> {
            self.events.borrow_mut().push("lower");
            Ok(())
        }

        fn raise(&self) -> Result<(), PrivilegeError> {
            self.events.borrow_mut().push("raise");
            Ok(())
        }
    }
}
