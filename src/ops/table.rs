//! Versioned op tables
//!
//! Op codes, switch groupings, permissions and defaults shift between host
//! releases. An `OpTable` captures one release and is validated on
//! construction so that switch group lookups are always idempotent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ops::mode::Mode;

/// Static description of one op on one host release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpDescriptor {
    pub code: u32,
    pub name: String,
    /// Representative op of the group this op is toggled with
    pub switch_group: u32,
    #[serde(default)]
    pub permission: Option<String>,
    #[serde(default = "default_allowed")]
    pub default_mode: Mode,
}

fn default_allowed() -> Mode {
    Mode::Allowed
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpTableError {
    #[error("op {0} is defined more than once")]
    DuplicateCode(u32),
    #[error("op {op} names switch group {switch_group}, which is not defined")]
    UnknownSwitchGroup { op: u32, switch_group: u32 },
    #[error("op {op} uses switch group {switch_group}, which is not its own representative")]
    NonIdempotentSwitch { op: u32, switch_group: u32 },
}

/// All ops known on one host release, keyed and iterated by code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpTable {
    ops: BTreeMap<u32, OpDescriptor>,
}

impl OpTable {
    pub fn new(ops: Vec<OpDescriptor>) -> Result<Self, OpTableError> {
        let mut map = BTreeMap::new();
        for op in ops {
            let code = op.code;
            if map.insert(code, op).is_some() {
                return Err(OpTableError::DuplicateCode(code));
            }
        }
        let table = Self { ops: map };
        table.validate()?;
        Ok(table)
    }

    /// Replace or add descriptors, revalidating the result
    pub fn merged(&self, overrides: Vec<OpDescriptor>) -> Result<Self, OpTableError> {
        let mut ops = self.ops.clone();
        for op in overrides {
            ops.insert(op.code, op);
        }
        let table = Self { ops };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<(), OpTableError> {
        for op in self.ops.values() {
            let group = self.ops.get(&op.switch_group).ok_or(OpTableError::UnknownSwitchGroup {
                op: op.code,
                switch_group: op.switch_group,
            })?;
            if group.switch_group != group.code {
                return Err(OpTableError::NonIdempotentSwitch {
                    op: op.code,
                    switch_group: op.switch_group,
                });
            }
        }
        Ok(())
    }

    /// Stock table for a platform API level
    pub fn builtin(api_level: u32) -> Self {
        let ops = AOSP_OPS
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.since <= api_level)
            .map(|(code, spec)| {
                let default_mode = match spec.default_since {
                    Some(level) if api_level >= level => Mode::Default,
                    _ => spec.default_mode,
                };
                let code = code as u32;
                let op = OpDescriptor {
                    code,
                    name: spec.name.to_string(),
                    switch_group: spec.switch_group,
                    permission: spec.permission.map(|p| format!("android.permission.{}", p)),
                    default_mode,
                };
                (code, op)
            })
            .collect();

        Self { ops }
    }

    pub fn get(&self, code: u32) -> Option<&OpDescriptor> {
        self.ops.get(&code)
    }

    pub fn by_name(&self, name: &str) -> Option<&OpDescriptor> {
        self.ops.values().find(|op| op.name == name)
    }

    /// Every op code, ascending
    pub fn codes(&self) -> impl Iterator<Item = u32> + '_ {
        self.ops.keys().copied()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &OpDescriptor> {
        self.ops.values()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

struct OpSpec {
    name: &'static str,
    switch_group: u32,
    permission: Option<&'static str>,
    default_mode: Mode,
    /// First API level whose fixed default is `Mode::Default`
    default_since: Option<u32>,
    since: u32,
}

const fn op(name: &'static str, switch_group: u32, permission: Option<&'static str>, since: u32) -> OpSpec {
    OpSpec {
        name,
        switch_group,
        permission,
        default_mode: Mode::Allowed,
        default_since: None,
        since,
    }
}

const fn op_mode(name: &'static str, switch_group: u32, permission: Option<&'static str>, default_mode: Mode, since: u32) -> OpSpec {
    OpSpec {
        name,
        switch_group,
        permission,
        default_mode,
        default_since: None,
        since,
    }
}

const fn op_default_from(
    name: &'static str,
    switch_group: u32,
    permission: Option<&'static str>,
    since: u32,
    default_since: u32,
) -> OpSpec {
    OpSpec {
        name,
        switch_group,
        permission,
        default_mode: Mode::Allowed,
        default_since: Some(default_since),
        since,
    }
}

// Indexed by op code.
static AOSP_OPS: &[OpSpec] = &[
    op("COARSE_LOCATION", 0, Some("ACCESS_COARSE_LOCATION"), 18),
    op("FINE_LOCATION", 0, Some("ACCESS_FINE_LOCATION"), 18),
    op("GPS", 0, None, 18),
    op("VIBRATE", 3, Some("VIBRATE"), 18),
    op("READ_CONTACTS", 4, Some("READ_CONTACTS"), 18),
    op("WRITE_CONTACTS", 5, Some("WRITE_CONTACTS"), 18),
    op("READ_CALL_LOG", 6, Some("READ_CALL_LOG"), 18),
    op("WRITE_CALL_LOG", 7, Some("WRITE_CALL_LOG"), 18),
    op("READ_CALENDAR", 8, Some("READ_CALENDAR"), 18),
    op("WRITE_CALENDAR", 9, Some("WRITE_CALENDAR"), 18),
    op("WIFI_SCAN", 0, Some("ACCESS_WIFI_STATE"), 18),
    op("POST_NOTIFICATION", 11, None, 18),
    op("NEIGHBORING_CELLS", 0, None, 18),
    op("CALL_PHONE", 13, Some("CALL_PHONE"), 18),
    op("READ_SMS", 14, Some("READ_SMS"), 18),
    op_mode("WRITE_SMS", 15, Some("WRITE_SMS"), Mode::Ignored, 18),
    op("RECEIVE_SMS", 16, Some("RECEIVE_SMS"), 18),
    op("RECEIVE_EMERGECY_SMS", 16, Some("RECEIVE_EMERGENCY_BROADCAST"), 18),
    op("RECEIVE_MMS", 18, Some("RECEIVE_MMS"), 18),
    op("RECEIVE_WAP_PUSH", 19, Some("RECEIVE_WAP_PUSH"), 18),
    op("SEND_SMS", 20, Some("SEND_SMS"), 18),
    op("READ_ICC_SMS", 14, Some("READ_SMS"), 18),
    op_mode("WRITE_ICC_SMS", 15, Some("WRITE_SMS"), Mode::Ignored, 18),
    op_default_from("WRITE_SETTINGS", 23, Some("WRITE_SETTINGS"), 18, 23),
    op_default_from("SYSTEM_ALERT_WINDOW", 24, Some("SYSTEM_ALERT_WINDOW"), 18, 23),
    op("ACCESS_NOTIFICATIONS", 25, Some("ACCESS_NOTIFICATIONS"), 18),
    op("CAMERA", 26, Some("CAMERA"), 18),
    op("RECORD_AUDIO", 27, Some("RECORD_AUDIO"), 18),
    op("PLAY_AUDIO", 28, None, 18),
    op("READ_CLIPBOARD", 29, None, 18),
    op("WRITE_CLIPBOARD", 30, None, 18),
    op("TAKE_MEDIA_BUTTONS", 31, None, 19),
    op("TAKE_AUDIO_FOCUS", 32, None, 19),
    op("AUDIO_MASTER_VOLUME", 33, None, 19),
    op("AUDIO_VOICE_VOLUME", 34, None, 19),
    op("AUDIO_RING_VOLUME", 35, None, 19),
    op("AUDIO_MEDIA_VOLUME", 36, None, 19),
    op("AUDIO_ALARM_VOLUME", 37, None, 19),
    op("AUDIO_NOTIFICATION_VOLUME", 38, None, 19),
    op("AUDIO_BLUETOOTH_VOLUME", 39, None, 19),
    op("WAKE_LOCK", 40, Some("WAKE_LOCK"), 19),
    op("MONITOR_LOCATION", 0, None, 19),
    op("MONITOR_HIGH_POWER_LOCATION", 0, None, 19),
    op_default_from("GET_USAGE_STATS", 43, Some("PACKAGE_USAGE_STATS"), 21, 21),
    op("MUTE_MICROPHONE", 44, None, 21),
    op("TOAST_WINDOW", 45, None, 21),
    op_mode("PROJECT_MEDIA", 46, None, Mode::Ignored, 21),
    op_mode("ACTIVATE_VPN", 47, None, Mode::Ignored, 21),
    op("WRITE_WALLPAPER", 48, None, 22),
    op("ASSIST_STRUCTURE", 49, None, 23),
    op("ASSIST_SCREENSHOT", 50, None, 23),
    op("READ_PHONE_STATE", 51, Some("READ_PHONE_STATE"), 23),
    op("ADD_VOICEMAIL", 52, Some("ADD_VOICEMAIL"), 23),
    op("USE_SIP", 53, Some("USE_SIP"), 23),
    op("PROCESS_OUTGOING_CALLS", 54, Some("PROCESS_OUTGOING_CALLS"), 23),
    op("USE_FINGERPRINT", 55, Some("USE_FINGERPRINT"), 23),
    op("BODY_SENSORS", 56, Some("BODY_SENSORS"), 23),
    op("READ_CELL_BROADCASTS", 57, None, 23),
    op_mode("MOCK_LOCATION", 58, None, Mode::Errored, 23),
    op("READ_EXTERNAL_STORAGE", 59, Some("READ_EXTERNAL_STORAGE"), 23),
    op("WRITE_EXTERNAL_STORAGE", 60, Some("WRITE_EXTERNAL_STORAGE"), 23),
    op("TURN_SCREEN_ON", 61, None, 23),
    op("GET_ACCOUNTS", 62, Some("GET_ACCOUNTS"), 23),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(code: u32, switch_group: u32) -> OpDescriptor {
        OpDescriptor {
            code,
            name: format!("OP_{}", code),
            switch_group,
            permission: None,
            default_mode: Mode::Allowed,
        }
    }

    #[test]
    fn test_builtin_tables_grow_with_api_level() {
        assert_eq!(OpTable::builtin(18).len(), 31);
        assert_eq!(OpTable::builtin(19).len(), 43);
        assert_eq!(OpTable::builtin(21).len(), 48);
        assert_eq!(OpTable::builtin(23).len(), 63);
    }

    #[test]
    fn test_builtin_tables_are_valid() {
        for api in [18, 19, 21, 22, 23] {
            let table = OpTable::builtin(api);
            let ops: Vec<_> = table.descriptors().cloned().collect();
            assert!(OpTable::new(ops).is_ok(), "api {} table must validate", api);
        }
    }

    #[test]
    fn test_runtime_defaults_switch_at_23() {
        let code = OpTable::builtin(19).by_name("SYSTEM_ALERT_WINDOW").unwrap().code;
        assert_eq!(OpTable::builtin(19).get(code).unwrap().default_mode, Mode::Allowed);
        assert_eq!(OpTable::builtin(23).get(code).unwrap().default_mode, Mode::Default);
    }

    #[test]
    fn test_usage_stats_defaults_from_21() {
        for api in [21, 22, 23] {
            let table = OpTable::builtin(api);
            let usage = table.by_name("GET_USAGE_STATS").unwrap();
            assert_eq!(usage.default_mode, Mode::Default, "api {}", api);
        }
        let table = OpTable::builtin(22);
        let overlay = table.by_name("SYSTEM_ALERT_WINDOW").unwrap();
        assert_eq!(overlay.default_mode, Mode::Allowed);
    }

    #[test]
    fn test_rejects_chained_switch_groups() {
        let err = OpTable::new(vec![desc(0, 1), desc(1, 2), desc(2, 2)]).unwrap_err();
        assert_eq!(err, OpTableError::NonIdempotentSwitch { op: 0, switch_group: 1 });
    }

    #[test]
    fn test_rejects_unknown_and_duplicate() {
        assert_eq!(
            OpTable::new(vec![desc(0, 9)]).unwrap_err(),
            OpTableError::UnknownSwitchGroup { op: 0, switch_group: 9 }
        );
        assert_eq!(
            OpTable::new(vec![desc(0, 0), desc(0, 0)]).unwrap_err(),
            OpTableError::DuplicateCode(0)
        );
    }

    #[test]
    fn test_merged_adds_vendor_op() {
        let table = OpTable::builtin(19);
        let merged = table
            .merged(vec![OpDescriptor {
                code: 60,
                name: "BOOT_COMPLETED".to_string(),
                switch_group: 60,
                permission: Some("android.permission.RECEIVE_BOOT_COMPLETED".to_string()),
                default_mode: Mode::Allowed,
            }])
            .unwrap();
        assert_eq!(merged.len(), table.len() + 1);
        assert_eq!(merged.by_name("BOOT_COMPLETED").unwrap().code, 60);
    }
}
