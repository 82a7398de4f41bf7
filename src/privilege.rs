//! Privilege gate for settings that write system-owned preference domains.

/// Reports whether the current process holds elevated privilege.
pub trait PrivilegeGate {
    fn has_elevated_privilege(&self) -> bool;
}

/// Checks the effective UID of this process on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EffectiveUidGate;

impl PrivilegeGate for EffectiveUidGate {
    fn has_elevated_privilege(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }
}

/// Answers with a fixed value. Used by tests and by callers that already know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPrivilege(pub bool);

impl PrivilegeGate for FixedPrivilege {
    fn has_elevated_privilege(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_uid_gate_matches_nix() {
        let expected = nix::unistd::geteuid().as_raw() == 0;
        assert_eq!(EffectiveUidGate.has_elevated_privilege(), expected);
    }

    #[test]
    fn test_fixed_privilege() {
        assert!(FixedPrivilege(true).has_elevated_privilege());
        assert!(!FixedPrivilege(false).has_elevated_privilege());
    }
}
