//! Permission evaluation.
//!
//! A request against a descriptor can fail in two independent ways: a set
//! disable bit covering the requested access kind (protection fault), and,
//! for user-mode accesses only, an owner id that does not match the current
//! process (ownership fault). A single access can violate both at once; the
//! outward classification reports the ownership fault first.

use bitflags::bitflags;

use crate::descriptor::Descriptor;

bitflags! {
    /// Requested access kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessKind: u8 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

/// Outcome of evaluating one access against one descriptor.
///
/// Both fault classes may be present at once; [`AccessFault::verdict`]
/// collapses them to the single outward category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFault {
    /// Access kinds forbidden by the page's disable bits.
    pub violations: AccessKind,
    /// Owner id of the page, when it does not match the current process.
    pub owner_mismatch: Option<u8>,
}

impl AccessFault {
    /// True if the access is permitted.
    pub fn is_clear(&self) -> bool {
        self.violations.is_empty() && self.owner_mismatch.is_none()
    }

    /// Collapse to the outward classification. Ownership takes precedence
    /// when both fault classes are present.
    pub fn verdict(&self) -> AccessVerdict {
        if self.owner_mismatch.is_some() {
            AccessVerdict::OwnershipFault
        } else if !self.violations.is_empty() {
            AccessVerdict::ProtectionFault
        } else {
            AccessVerdict::Granted
        }
    }
}

/// Outward fault classification from the pre-check entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessVerdict {
    /// Access permitted.
    Granted,
    /// Forbidden by the page's read/write/execute disable bits.
    ProtectionFault,
    /// User-mode access by a process that does not own the page.
    OwnershipFault,
}

impl std::fmt::Display for AccessVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessVerdict::Granted => write!(f, "granted"),
            AccessVerdict::ProtectionFault => write!(f, "protection fault"),
            AccessVerdict::OwnershipFault => write!(f, "ownership fault"),
        }
    }
}

/// Evaluate `kind` against `desc`.
///
/// System-mode accesses bypass the ownership check entirely; the disable
/// bits apply in every mode.
pub fn evaluate(desc: &Descriptor, kind: AccessKind, system: bool, current_pid: u8) -> AccessFault {
    let mut violations = AccessKind::empty();
    if desc.read_disabled && kind.contains(AccessKind::READ) {
        violations |= AccessKind::READ;
    }
    if desc.write_disabled && kind.contains(AccessKind::WRITE) {
        violations |= AccessKind::WRITE;
    }
    if desc.exec_disabled && kind.contains(AccessKind::EXEC) {
        violations |= AccessKind::EXEC;
    }
    let owner_mismatch = if !system && desc.owner_id != current_pid {
        Some(desc.owner_id)
    } else {
        None
    };
    AccessFault {
        violations,
        owner_mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(read: bool, write: bool, exec: bool, owner: u8) -> Descriptor {
        Descriptor {
            read_disabled: read,
            write_disabled: write,
            exec_disabled: exec,
            owner_id: owner,
            ..Descriptor::default()
        }
    }

    #[test]
    fn disable_bits_fault_their_kind() {
        let desc = page(true, false, false, 0);
        let fault = evaluate(&desc, AccessKind::READ, true, 0);
        assert_eq!(fault.violations, AccessKind::READ);
        assert_eq!(fault.verdict(), AccessVerdict::ProtectionFault);

        // The same page allows the kinds that are not disabled.
        let fault = evaluate(&desc, AccessKind::WRITE | AccessKind::EXEC, true, 0);
        assert!(fault.is_clear());
        assert_eq!(fault.verdict(), AccessVerdict::Granted);
    }

    #[test]
    fn each_kind_faults_independently() {
        for (kind, desc) in [
            (AccessKind::READ, page(true, false, false, 0)),
            (AccessKind::WRITE, page(false, true, false, 0)),
            (AccessKind::EXEC, page(false, false, true, 0)),
        ] {
            let fault = evaluate(&desc, kind, true, 0);
            assert_eq!(fault.violations, kind);
        }
    }

    #[test]
    fn owner_mismatch_faults_user_mode_only() {
        let desc = page(false, false, false, 7);
        let fault = evaluate(&desc, AccessKind::READ, false, 3);
        assert_eq!(fault.owner_mismatch, Some(7));
        assert_eq!(fault.verdict(), AccessVerdict::OwnershipFault);

        // System mode never checks ownership.
        let fault = evaluate(&desc, AccessKind::READ, true, 3);
        assert!(fault.is_clear());
    }

    #[test]
    fn matching_owner_is_clear() {
        let desc = page(false, false, false, 7);
        assert!(evaluate(&desc, AccessKind::WRITE, false, 7).is_clear());
    }

    #[test]
    fn ownership_takes_precedence_over_protection() {
        let desc = page(true, true, true, 9);
        let fault = evaluate(&desc, AccessKind::READ, false, 1);
        assert!(!fault.violations.is_empty());
        assert_eq!(fault.owner_mismatch, Some(9));
        assert_eq!(fault.verdict(), AccessVerdict::OwnershipFault);
    }
}
