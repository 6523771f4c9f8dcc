//! Global constants for opshim
//!
//! Centralized location for package names, class names and log targets

/// Package name of the module itself; the facade patches its self-check method
pub const MODULE_PACKAGE: &str = "at.opshim.module";

/// Class inside the module package exposing the "is the hook module active" check
pub const MODULE_SELF_CHECK_CLASS: &str = "at.opshim.module.Util";

/// Method on [`MODULE_SELF_CHECK_CLASS`] replaced with a constant `true`
pub const MODULE_SELF_CHECK_METHOD: &str = "isModuleEnabled";

/// Stock settings application package
pub const SETTINGS_PACKAGE: &str = "com.android.settings";

/// Settings forks that ship the same app-ops screens under another package
pub const SETTINGS_PACKAGES: &[&str] = &[
    SETTINGS_PACKAGE,
    "com.android.settings.lge",
    "com.htc.settings",
    "com.sonyericsson.settings",
];

/// System server package, where framework-level hacks install
pub const SYSTEM_PACKAGE: &str = "android";

/// Icon resources the module contributes to the settings resource table
pub const MODULE_ICONS: &[&str] = &[
    "drawable/ic_appops_shield",
    "drawable/ic_appops_launcher",
    "drawable/ic_appops_settings",
];

/// `log` target used for every engine diagnostic
pub const LOG_TARGET: &str = "opshim";
