//! Operation / switch / mode compatibility model
//!
//! A version-tolerant view over the host's op-tracking subsystem:
//! - `table`: op codes, switch groups, permissions and defaults per release
//! - `mode`: the closed mode enumeration and its raw values per release
//! - `subsystem`: the raw service the model forwards to
//! - `labels`: display strings, resolved by the UI side
//!
//! `OpsModel` keeps no state of its own; every mode read goes to the
//! subsystem, so it can be cloned freely and shared with UI threads.

pub mod labels;
pub mod mode;
pub mod subsystem;
pub mod table;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use labels::{OpLabels, StringTableLabels};
pub use mode::{Mode, ModeValues};
pub use subsystem::{MemoryOpsSubsystem, OpsSubsystem, PermissionChecker, StaticPermissions, SubsystemError};
pub use table::{OpDescriptor, OpTable, OpTableError};

use crate::models::{OpEntry, PackageOpsSnapshot, Subject};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpsError {
    #[error("operation {0} is not supported on this host")]
    UnsupportedOperation(u32),
    #[error("mode '{0}' is not available on this host")]
    ModeUnavailable(Mode),
    #[error(transparent)]
    Subsystem(SubsystemError),
}

impl From<SubsystemError> for OpsError {
    fn from(err: SubsystemError) -> Self {
        match err {
            SubsystemError::UnsupportedOperation(op) => OpsError::UnsupportedOperation(op),
            other => OpsError::Subsystem(other),
        }
    }
}

/// Diagnostic line for one op of a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpReport {
    pub op: u32,
    pub name: String,
    pub mode: Mode,
    pub switch_group: u32,
    pub switch_name: String,
    pub switch_mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_access: Option<DateTime<Utc>>,
}

/// Addable ops grouped by switch group, both levels ordered by code
pub type AddableSwitches = BTreeMap<u32, BTreeSet<u32>>;

#[derive(Clone)]
pub struct OpsModel {
    table: Arc<OpTable>,
    modes: ModeValues,
    subsystem: Arc<dyn OpsSubsystem>,
}

impl OpsModel {
    pub fn new(table: OpTable, modes: ModeValues, subsystem: Arc<dyn OpsSubsystem>) -> Self {
        Self {
            table: Arc::new(table),
            modes,
            subsystem,
        }
    }

    pub fn table(&self) -> &OpTable {
        &self.table
    }

    pub fn mode_values(&self) -> &ModeValues {
        &self.modes
    }

    /// Every op code valid on this host, ascending
    pub fn all_valid_ops(&self) -> Vec<u32> {
        self.table.codes().collect()
    }

    pub fn op_name(&self, op: u32) -> Option<&str> {
        self.table.get(op).map(|d| d.name.as_str())
    }

    /// Representative op of `op`'s switch group. Unknown ops are their own
    /// group, so the lookup is idempotent for every input.
    pub fn switch_group_of(&self, op: u32) -> u32 {
        self.table.get(op).map(|d| d.switch_group).unwrap_or(op)
    }

    pub fn permission_of(&self, switch_op: u32) -> Option<&str> {
        self.table.get(switch_op).and_then(|d| d.permission.as_deref())
    }

    /// Fixed default of the op on this host; unknown ops report `Errored`
    pub fn default_mode_of(&self, switch_op: u32) -> Mode {
        self.table
            .get(switch_op)
            .map(|d| d.default_mode)
            .unwrap_or(Mode::Errored)
    }

    /// Modes a user may pick for `switch_op`, in a fixed order. `Default`
    /// is only offered when it differs from the op's fixed default.
    pub fn available_modes(&self, switch_op: u32) -> Vec<Mode> {
        let fixed_default = self.default_mode_of(switch_op);
        Mode::ALL
            .into_iter()
            .filter(|mode| self.modes.is_available(*mode))
            .filter(|mode| *mode != Mode::Default || fixed_default != Mode::Default)
            .collect()
    }

    /// Current mode, with subsystem rejections reported as `Errored`
    pub fn check_mode(&self, op: u32, subject: &Subject) -> Mode {
        match self.try_check_mode(op, subject) {
            Ok(mode) => mode,
            Err(e) => {
                log::debug!(target: crate::constants::LOG_TARGET, "check_mode({}, {}): {}", op, subject, e);
                Mode::Errored
            }
        }
    }

    pub fn try_check_mode(&self, op: u32, subject: &Subject) -> Result<Mode, OpsError> {
        let raw = self.subsystem.check_op(op, subject.uid, &subject.package)?;
        Ok(self.translate(raw))
    }

    pub fn set_mode(&self, op: u32, subject: &Subject, mode: Mode) -> Result<(), OpsError> {
        let raw = self.modes.raw(mode).ok_or(OpsError::ModeUnavailable(mode))?;
        self.subsystem.set_mode(op, subject.uid, &subject.package, raw)?;
        Ok(())
    }

    /// Switch presentation of the current mode
    pub fn is_checked(&self, op: u32, subject: &Subject) -> bool {
        self.check_mode(self.switch_group_of(op), subject).is_checked()
    }

    /// Flip the two-state switch; "on" always writes `Allowed`
    pub fn set_checked(&self, op: u32, subject: &Subject, checked: bool) -> Result<(), OpsError> {
        self.set_mode(self.switch_group_of(op), subject, Mode::from_checked(checked))
    }

    pub fn reset_all_modes(&self, subject: &Subject) -> Result<(), OpsError> {
        self.subsystem.reset_all_modes(subject.uid, &subject.package)?;
        Ok(())
    }

    /// Fresh listing of the subject's tracked ops
    pub fn snapshot(&self, subject: &Subject) -> Result<PackageOpsSnapshot, OpsError> {
        let raw = self.subsystem.ops_for_package(subject.uid, &subject.package)?;
        let entries = raw
            .into_iter()
            .map(|entry| OpEntry {
                op: entry.op,
                mode: self.translate(entry.mode),
                last_access: access_time(entry.last_access_ms),
            })
            .collect();

        Ok(PackageOpsSnapshot {
            subject: subject.clone(),
            entries,
            taken_at: Utc::now(),
        })
    }

    /// Ops the subject does not track yet but may be given a switch for.
    ///
    /// Starts from every valid op, drops the ones already in the subject's
    /// snapshot, then drops those whose switch group needs a permission the
    /// package lacks. The rest is grouped by switch group.
    pub fn addable_op_switches(
        &self,
        subject: &Subject,
        permissions: &dyn PermissionChecker,
    ) -> Result<AddableSwitches, OpsError> {
        let mut addable: BTreeSet<u32> = self.table.codes().collect();

        let snapshot = self.snapshot(subject)?;
        for entry in &snapshot.entries {
            addable.remove(&entry.op);
        }

        addable.retain(|op| match self.permission_of(self.switch_group_of(*op)) {
            Some(permission) => permissions.holds_permission(&subject.package, permission),
            None => true,
        });

        let mut grouped = AddableSwitches::new();
        for op in addable {
            grouped.entry(self.switch_group_of(op)).or_default().insert(op);
        }
        Ok(grouped)
    }

    /// Make the given ops tracked for the subject by writing `Ignored`
    pub fn add_switch(&self, subject: &Subject, ops: &BTreeSet<u32>) -> Result<(), OpsError> {
        for op in ops {
            self.set_mode(*op, subject, Mode::Ignored)?;
        }
        Ok(())
    }

    /// Per-op dump of the subject: mode, switch group and the group's mode
    pub fn describe_package(&self, subject: &Subject) -> Result<Vec<OpReport>, OpsError> {
        let snapshot = self.snapshot(subject)?;
        Ok(snapshot
            .entries
            .into_iter()
            .map(|entry| {
                let switch_group = self.switch_group_of(entry.op);
                OpReport {
                    op: entry.op,
                    name: self.name_or_code(entry.op),
                    mode: entry.mode,
                    switch_group,
                    switch_name: self.name_or_code(switch_group),
                    switch_mode: self.check_mode(switch_group, subject),
                    last_access: entry.last_access,
                }
            })
            .collect())
    }

    fn name_or_code(&self, op: u32) -> String {
        self.op_name(op)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", op))
    }

    fn translate(&self, raw: i32) -> Mode {
        self.modes.from_raw(raw).unwrap_or(Mode::Default)
    }
}

impl std::fmt::Debug for OpsModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpsModel")
            .field("ops", &self.table.len())
            .field("modes", &self.modes)
            .finish_non_exhaustive()
    }
}

fn access_time(ms: i64) -> Option<DateTime<Utc>> {
    if ms <= 0 {
        None
    } else {
        DateTime::from_timestamp_millis(ms)
    }
}
