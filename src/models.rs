//! Data models module
//!
//! Defines core data structures shared across the engine:
//! - HostIdentity: what the running host looks like this load
//! - MethodSignature: a method name plus its parameter type names
//! - Subject / PackageOpsSnapshot: per-package op state read from the host
//! - PhaseReport: what a load phase resolved, bound and skipped

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::ops::Mode;
use crate::variant::VariantOutcome;

/// One of the two load-time windows the engine runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Host resources are about to be loaded
    Resources,
    /// Host code is about to be loaded
    Behavior,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Resources => write!(f, "resources"),
            Phase::Behavior => write!(f, "behavior"),
        }
    }
}

/// Introspectable signature of the running host, immutable for one load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    /// Package name of the process being loaded
    pub package: String,
    /// Fully qualified names of every class the host ships
    pub classes: BTreeSet<String>,
    /// Device manufacturer as reported by the build properties
    #[serde(default)]
    pub manufacturer: String,
    /// Platform API level of the host
    #[serde(default)]
    pub api_level: u32,
}

impl HostIdentity {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes.extend(classes.into_iter().map(Into::into));
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn with_api_level(mut self, api_level: u32) -> Self {
        self.api_level = api_level;
        self
    }

    /// Whether the host ships a class with exactly this name
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    /// Case-insensitive substring match on the manufacturer string
    pub fn manufacturer_contains(&self, needle: &str) -> bool {
        self.manufacturer
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

/// A method name and the type names of its parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<String>,
}

impl MethodSignature {
    pub fn new<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the `name(TypeA, TypeB)` notation used in host profiles
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let open = text.find('(')?;
        if !text.ends_with(')') {
            return None;
        }
        let name = text[..open].trim();
        if name.is_empty() {
            return None;
        }
        let params = text[open + 1..text.len() - 1]
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        Some(Self {
            name: name.to_string(),
            params,
        })
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(", "))
    }
}

/// The package (and its uid) whose op modes are being read or changed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub uid: u32,
    pub package: String,
}

impl Subject {
    pub fn new(uid: u32, package: impl Into<String>) -> Self {
        Self {
            uid,
            package: package.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.package, self.uid)
    }
}

/// One op entry as the host subsystem reports it, raw mode included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOpEntry {
    pub op: u32,
    pub mode: i32,
    /// Milliseconds since the epoch, 0 when never accessed
    #[serde(default)]
    pub last_access_ms: i64,
}

/// One op entry translated to the version-independent mode enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpEntry {
    pub op: u32,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_access: Option<DateTime<Utc>>,
}

/// Point-in-time listing of op entries for one subject, replaced wholesale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOpsSnapshot {
    pub subject: Subject,
    pub entries: Vec<OpEntry>,
    pub taken_at: DateTime<Utc>,
}

impl PackageOpsSnapshot {
    /// Whether the snapshot lists this op at all
    pub fn contains(&self, op: u32) -> bool {
        self.entries.iter().any(|entry| entry.op == op)
    }

    pub fn entry(&self, op: u32) -> Option<&OpEntry> {
        self.entries.iter().find(|entry| entry.op == op)
    }
}

/// Summary of a hook the engine installed during a phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundHookSummary {
    /// Class the method was requested on
    pub requested_class: String,
    /// Class that actually declares the patched method
    pub declaring_class: String,
    pub method: String,
    /// Number of superclass hops taken before the bind succeeded
    pub retries: usize,
}

/// Outcome of a single hack for one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HackStatus {
    Applied,
    /// Hack is enabled but contributes nothing to this phase
    NotApplicable,
    Failed { error: String },
}

/// Per-hack line of a phase report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackResult {
    pub name: String,
    #[serde(flatten)]
    pub status: HackStatus,
}

/// Complete record of one load phase, suitable for JSON serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub package: String,
    /// `None` when the host is not a variant target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantOutcome>,
    pub hacks: Vec<HackResult>,
    pub bound_hooks: Vec<BoundHookSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub resources_added: Vec<String>,
    pub duration_ms: u64,
}

impl PhaseReport {
    pub fn failed_hacks(&self) -> impl Iterator<Item = &HackResult> {
        self.hacks
            .iter()
            .filter(|result| matches!(result.status, HackStatus::Failed { .. }))
    }
}

/// Full output of a simulated load, both phases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOutput {
    pub reports: Vec<PhaseReport>,
}
