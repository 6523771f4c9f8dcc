//! Configuration management
//!
//! Two TOML documents drive a load:
//! - `Preferences`: which hacks are enabled and whether to log at debug
//!   level, read once per load
//! - `HostProfile`: a description of a host (class layout, op table
//!   overrides, per-package op state) used to build a simulated host

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::hook::SimulatedHost;
use crate::models::{HostIdentity, MethodSignature, Subject};
use crate::ops::{
    MemoryOpsSubsystem, Mode, ModeValues, OpDescriptor, OpTable, OpsModel, OpsSubsystem,
    StaticPermissions, StringTableLabels,
};

/// Read-only snapshot of the user's module preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Log bind retries, guard skips and variant failures
    #[serde(default)]
    pub debug: bool,
    /// Hack name -> enabled. Hacks not listed use their own default.
    #[serde(default)]
    pub hacks: BTreeMap<String, bool>,
}

impl Preferences {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse preferences file: {}", path.display()))
    }

    /// Load `path` if given, else the default location if it exists, else
    /// defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::default_config_path() {
            Ok(default) if default.exists() => Self::load_from_file(&default),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| anyhow!("No configuration directory on this system"))?;
        Ok(base.join("opshim").join("preferences.toml"))
    }

    pub fn hack_enabled(&self, name: &str, default: bool) -> bool {
        self.hacks.get(name).copied().unwrap_or(default)
    }

    pub fn with_hack(mut self, name: &str, enabled: bool) -> Self {
        self.hacks.insert(name.to_string(), enabled);
        self
    }
}

/// Simulated host description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostProfile {
    pub host: HostSettings,
    #[serde(default)]
    pub classes: Vec<ClassSettings>,
    /// Descriptors added to or replacing the built-in op table
    #[serde(default)]
    pub ops: Vec<OpDescriptor>,
    #[serde(default)]
    pub packages: Vec<PackageSettings>,
    #[serde(default)]
    pub strings: StringSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Package the simulated process loads as
    pub package: String,
    #[serde(default)]
    pub manufacturer: String,
    pub api_level: u32,
    /// Raw value of the vendor "ask" mode, if the host has one
    #[serde(default)]
    pub ask_mode: Option<i32>,
    /// Raw value of the vendor "hint" mode, if the host has one
    #[serde(default)]
    pub hint_mode: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSettings {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    /// Declared methods in `name(Type, Type)` notation
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSettings {
    pub uid: u32,
    pub package: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub ops: Vec<PackageOpSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageOpSettings {
    /// Op name as it appears in the op table
    pub op: String,
    /// Mode name (`allow`, `ignore`, `deny`, `default`, `ask`, `hint`)
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub last_access_ms: i64,
}

/// Display strings keyed by op name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StringSettings {
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub summaries: BTreeMap<String, String>,
}

impl HostProfile {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read host profile: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid host profile: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let profile: Self = toml::from_str(content).context("Failed to parse host profile")?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<()> {
        if self.host.package.trim().is_empty() {
            anyhow::bail!("host.package must not be empty");
        }
        for class in &self.classes {
            for method in &class.methods {
                if MethodSignature::parse(method).is_none() {
                    anyhow::bail!("invalid method '{}' on class {}", method, class.name);
                }
            }
        }
        self.op_table()?;
        Ok(())
    }

    pub fn mode_values(&self) -> ModeValues {
        let mut modes = ModeValues::aosp(self.host.api_level);
        if let Some(raw) = self.host.ask_mode {
            modes = modes.with_ask(raw);
        }
        if let Some(raw) = self.host.hint_mode {
            modes = modes.with_hint(raw);
        }
        modes
    }

    pub fn op_table(&self) -> Result<OpTable> {
        let table = OpTable::builtin(self.host.api_level);
        if self.ops.is_empty() {
            return Ok(table);
        }
        table
            .merged(self.ops.clone())
            .context("Invalid op table overrides")
    }

    /// Identity of the described host process
    pub fn identity(&self) -> HostIdentity {
        self.identity_for(&self.host.package)
    }

    /// Identity of the same device loading as another package
    pub fn identity_for(&self, package: &str) -> HostIdentity {
        HostIdentity::new(package)
            .with_classes(self.classes.iter().map(|c| c.name.clone()))
            .with_manufacturer(self.host.manufacturer.clone())
            .with_api_level(self.host.api_level)
    }

    pub fn build_host(&self) -> Result<SimulatedHost> {
        let mut host = SimulatedHost::new();
        for class in &self.classes {
            let methods = class
                .methods
                .iter()
                .map(|m| MethodSignature::parse(m).ok_or_else(|| anyhow!("invalid method '{}'", m)))
                .collect::<Result<Vec<_>>>()?;
            host.define_class(&class.name, class.superclass.as_deref(), methods);
        }
        Ok(host)
    }

    /// Op model backed by an in-memory subsystem seeded with the profile's
    /// package state
    pub fn build_ops(&self) -> Result<(OpsModel, Arc<MemoryOpsSubsystem>)> {
        let table = self.op_table()?;
        let modes = self.mode_values();
        let subsystem = Arc::new(MemoryOpsSubsystem::new(&table, &modes));

        for package in &self.packages {
            for entry in &package.ops {
                let op = table
                    .by_name(&entry.op)
                    .ok_or_else(|| anyhow!("unknown op '{}' for {}", entry.op, package.package))?
                    .code;
                subsystem.note_op(op, package.uid, &package.package, entry.last_access_ms)?;
                if let Some(name) = &entry.mode {
                    let mode = Mode::from_name(name)
                        .ok_or_else(|| anyhow!("unknown mode '{}' for {}", name, entry.op))?;
                    let raw = modes
                        .raw(mode)
                        .ok_or_else(|| anyhow!("mode '{}' is not available on API {}", name, self.host.api_level))?;
                    subsystem.set_mode(op, package.uid, &package.package, raw)?;
                }
            }
        }

        let model = OpsModel::new(table, modes, subsystem.clone());
        Ok((model, subsystem))
    }

    pub fn permissions(&self) -> StaticPermissions {
        let mut permissions = StaticPermissions::new();
        for package in &self.packages {
            for permission in &package.permissions {
                permissions.grant(&package.package, permission);
            }
        }
        permissions
    }

    pub fn labels(&self, table: &OpTable) -> StringTableLabels {
        let resolve = |strings: &BTreeMap<String, String>| {
            strings
                .iter()
                .filter_map(|(name, text)| table.by_name(name).map(|op| (op.code, text.clone())))
                .collect()
        };
        StringTableLabels::new(resolve(&self.strings.labels), resolve(&self.strings.summaries))
    }

    pub fn subject(&self, package: &str) -> Option<Subject> {
        self.packages
            .iter()
            .find(|p| p.package == package)
            .map(|p| Subject::new(p.uid, p.package.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
[host]
package = "com.android.settings"
manufacturer = "Google"
api_level = 19
ask_mode = 4

[[classes]]
name = "com.android.settings.Settings"
methods = ["onBuildHeaders(java.util.List)"]

[[packages]]
uid = 10042
package = "com.example.maps"
permissions = ["android.permission.ACCESS_FINE_LOCATION"]
ops = [
    { op = "FINE_LOCATION", mode = "ignore", last_access_ms = 1700000000000 },
    { op = "VIBRATE" },
]

[strings.labels]
COARSE_LOCATION = "Location"
"#;

    #[test]
    fn test_profile_parses_and_builds() {
        let profile = HostProfile::from_toml_str(PROFILE).unwrap();
        assert_eq!(profile.mode_values().ask, Some(4));
        assert!(profile.identity().has_class("com.android.settings.Settings"));

        let (model, _) = profile.build_ops().unwrap();
        let subject = profile.subject("com.example.maps").unwrap();
        assert_eq!(model.check_mode(0, &subject), Mode::Ignored);
        assert_eq!(model.snapshot(&subject).unwrap().entries.len(), 3);

        use crate::ops::OpLabels;
        let labels = profile.labels(model.table());
        assert_eq!(labels.label(0).as_deref(), Some("Location"));
        assert_eq!(labels.label(1), None);
    }

    #[test]
    fn test_profile_rejects_bad_method() {
        let bad = PROFILE.replace("onBuildHeaders(java.util.List)", "onBuildHeaders");
        assert!(HostProfile::from_toml_str(&bad).is_err());
    }

    #[test]
    fn test_preferences_defaults() {
        let prefs: Preferences = toml::from_str("").unwrap();
        assert!(!prefs.debug);
        assert!(prefs.hack_enabled("boot_completed", true));
        assert!(!prefs.clone().with_hack("boot_completed", false).hack_enabled("boot_completed", true));
    }
}
