//! The host's op-tracking subsystem
//!
//! `OpsSubsystem` is the call surface the model forwards to, in the host's
//! raw numeric modes. `MemoryOpsSubsystem` implements it in memory for the
//! simulated host and for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use crate::models::{RawOpEntry, Subject};
use crate::ops::mode::ModeValues;
use crate::ops::table::OpTable;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubsystemError {
    #[error("operation {0} is not supported by this host")]
    UnsupportedOperation(u32),
    #[error("mode value {0} is not accepted by this host")]
    UnsupportedMode(i32),
    #[error("subsystem failure: {0}")]
    Other(String),
}

/// Raw operations of the host's op-tracking service
pub trait OpsSubsystem: Send + Sync {
    /// Effective raw mode of `op` for the subject
    fn check_op(&self, op: u32, uid: u32, package: &str) -> Result<i32, SubsystemError>;

    fn set_mode(&self, op: u32, uid: u32, package: &str, mode: i32) -> Result<(), SubsystemError>;

    /// Return every op of the subject to its default mode
    fn reset_all_modes(&self, uid: u32, package: &str) -> Result<(), SubsystemError>;

    /// Ops the host tracks for the subject, in code order
    fn ops_for_package(&self, uid: u32, package: &str) -> Result<Vec<RawOpEntry>, SubsystemError>;
}

/// Package manager side of permission checks
pub trait PermissionChecker {
    fn holds_permission(&self, package: &str, permission: &str) -> bool;
}

/// Fixed package -> granted permissions map
#[derive(Debug, Clone, Default)]
pub struct StaticPermissions {
    granted: HashMap<String, BTreeSet<String>>,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, package: &str, permission: &str) -> &mut Self {
        self.granted
            .entry(package.to_string())
            .or_default()
            .insert(permission.to_string());
        self
    }
}

impl PermissionChecker for StaticPermissions {
    fn holds_permission(&self, package: &str, permission: &str) -> bool {
        self.granted
            .get(package)
            .map(|perms| perms.contains(permission))
            .unwrap_or(false)
    }
}

/// In-memory op-tracking service mirroring the host's semantics: modes are
/// stored on switch group representatives and unset ops report their
/// group's default.
#[derive(Debug)]
pub struct MemoryOpsSubsystem {
    switch_of: BTreeMap<u32, u32>,
    defaults: BTreeMap<u32, i32>,
    accepted_modes: BTreeSet<i32>,
    entries: RwLock<HashMap<Subject, BTreeMap<u32, RawOpEntry>>>,
}

impl MemoryOpsSubsystem {
    pub fn new(table: &OpTable, modes: &ModeValues) -> Self {
        let switch_of = table.descriptors().map(|op| (op.code, op.switch_group)).collect();
        let defaults = table
            .descriptors()
            .map(|op| {
                let raw = modes.raw(op.default_mode).unwrap_or(modes.allowed);
                (op.code, raw)
            })
            .collect();
        let accepted_modes = crate::ops::Mode::ALL
            .into_iter()
            .filter_map(|mode| modes.raw(mode))
            .collect();

        Self {
            switch_of,
            defaults,
            accepted_modes,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record an access so the op shows up in the subject's listing
    pub fn note_op(&self, op: u32, uid: u32, package: &str, time_ms: i64) -> Result<(), SubsystemError> {
        let default = self.default_of(op)?;
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        let entry = entries
            .entry(Subject::new(uid, package))
            .or_default()
            .entry(op)
            .or_insert(RawOpEntry {
                op,
                mode: default,
                last_access_ms: 0,
            });
        entry.last_access_ms = time_ms;
        Ok(())
    }

    fn switch_of(&self, op: u32) -> Result<u32, SubsystemError> {
        self.switch_of
            .get(&op)
            .copied()
            .ok_or(SubsystemError::UnsupportedOperation(op))
    }

    fn default_of(&self, op: u32) -> Result<i32, SubsystemError> {
        self.defaults
            .get(&op)
            .copied()
            .ok_or(SubsystemError::UnsupportedOperation(op))
    }
}

impl OpsSubsystem for MemoryOpsSubsystem {
    fn check_op(&self, op: u32, uid: u32, package: &str) -> Result<i32, SubsystemError> {
        let switch = self.switch_of(op)?;
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        let stored = entries
            .get(&Subject::new(uid, package))
            .and_then(|ops| ops.get(&switch))
            .map(|entry| entry.mode);
        match stored {
            Some(mode) => Ok(mode),
            None => self.default_of(switch),
        }
    }

    fn set_mode(&self, op: u32, uid: u32, package: &str, mode: i32) -> Result<(), SubsystemError> {
        let switch = self.switch_of(op)?;
        if !self.accepted_modes.contains(&mode) {
            return Err(SubsystemError::UnsupportedMode(mode));
        }
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        let ops = entries.entry(Subject::new(uid, package)).or_default();
        for code in [op, switch] {
            ops.entry(code)
                .or_insert(RawOpEntry {
                    op: code,
                    mode,
                    last_access_ms: 0,
                })
                .mode = mode;
        }
        Ok(())
    }

    fn reset_all_modes(&self, uid: u32, package: &str) -> Result<(), SubsystemError> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        if let Some(ops) = entries.get_mut(&Subject::new(uid, package)) {
            for entry in ops.values_mut() {
                if let Some(default) = self.defaults.get(&entry.op) {
                    entry.mode = *default;
                }
            }
        }
        Ok(())
    }

    fn ops_for_package(&self, uid: u32, package: &str) -> Result<Vec<RawOpEntry>, SubsystemError> {
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        Ok(entries
            .get(&Subject::new(uid, package))
            .map(|ops| ops.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subsystem() -> MemoryOpsSubsystem {
        MemoryOpsSubsystem::new(&OpTable::builtin(19), &ModeValues::aosp(19))
    }

    #[test]
    fn test_unset_op_reports_switch_default() {
        let ops = subsystem();
        // WRITE_ICC_SMS shares WRITE_SMS's group, which defaults to ignored
        assert_eq!(ops.check_op(22, 10001, "com.example.sms").unwrap(), 1);
        assert_eq!(ops.check_op(0, 10001, "com.example.sms").unwrap(), 0);
    }

    #[test]
    fn test_mode_is_stored_on_switch_group() {
        let ops = subsystem();
        ops.set_mode(1, 10001, "com.example.maps", 1).unwrap();
        assert_eq!(ops.check_op(0, 10001, "com.example.maps").unwrap(), 1);
        assert_eq!(ops.check_op(2, 10001, "com.example.maps").unwrap(), 1);
        assert_eq!(ops.check_op(0, 10002, "com.example.other").unwrap(), 0);
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let ops = subsystem();
        assert_eq!(ops.check_op(900, 1, "p"), Err(SubsystemError::UnsupportedOperation(900)));
        assert_eq!(ops.set_mode(900, 1, "p", 0), Err(SubsystemError::UnsupportedOperation(900)));
        assert_eq!(ops.set_mode(0, 1, "p", 7), Err(SubsystemError::UnsupportedMode(7)));
    }

    #[test]
    fn test_note_op_lists_entry() {
        let ops = subsystem();
        ops.note_op(26, 10001, "com.example.cam", 1_700_000_000_000).unwrap();
        let listed = ops.ops_for_package(10001, "com.example.cam").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].op, 26);
        assert_eq!(listed[0].last_access_ms, 1_700_000_000_000);
    }
}
