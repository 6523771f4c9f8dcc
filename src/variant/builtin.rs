//! Host shapes shipped with the crate, most specific first

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::engine::PhaseContext;
use crate::hook::{MethodCall, MethodHook};
use crate::models::{HostIdentity, MethodSignature};
use crate::variant::matcher::{has_all_classes, has_matching_class};
use crate::variant::{no_install, Variant};

pub const SETTINGS_CLASS: &str = "com.android.settings.Settings";
pub const APP_OPS_SUMMARY: &str = "com.android.settings.applications.AppOpsSummary";
pub const INSTALLED_APP_DETAILS: &str = "com.android.settings.applications.InstalledAppDetails";
pub const SAMSUNG_APP_INFO: &str = "com.samsung.android.settings.applications.AppInfoDashboard";
pub const LG_SETTINGS: &str = "com.android.settings.lge.LgSettings";
const APPLICATIONS_PACKAGE: &str = "com.android.settings.applications.*";

/// Id of the entry every variant contributes to the host's UI lists
pub const APP_OPS_ENTRY_ID: &str = "app_ops";

pub fn all() -> Vec<Variant> {
    vec![SAMSUNG, LG, AOSP_HEADERS, AOSP_APP_INFO]
}

pub const SAMSUNG: Variant = Variant {
    name: "samsung",
    matches: samsung_matches,
    resources: samsung_resources,
    behavior: samsung_behavior,
};

pub const LG: Variant = Variant {
    name: "lg",
    matches: lg_matches,
    resources: no_install,
    behavior: lg_behavior,
};

pub const AOSP_HEADERS: Variant = Variant {
    name: "aosp_headers",
    matches: aosp_headers_matches,
    resources: aosp_headers_resources,
    behavior: aosp_headers_behavior,
};

pub const AOSP_APP_INFO: Variant = Variant {
    name: "aosp_app_info",
    matches: aosp_app_info_matches,
    resources: no_install,
    behavior: aosp_app_info_behavior,
};

fn build_headers() -> MethodSignature {
    MethodSignature::new("onBuildHeaders", vec!["java.util.List"])
}

fn create_options_menu() -> MethodSignature {
    MethodSignature::new("onCreateOptionsMenu", vec!["android.view.Menu", "android.view.MenuInflater"])
}

/// Appends an app-ops header to the list passed as the first argument
struct HeaderInjector {
    fragment: &'static str,
}

impl MethodHook for HeaderInjector {
    fn after(&self, call: &mut MethodCall) -> Result<()> {
        let headers = call
            .args
            .first_mut()
            .and_then(Value::as_array_mut)
            .context("header list argument missing")?;
        let present = headers
            .iter()
            .any(|h| h.get("id").and_then(Value::as_str) == Some(APP_OPS_ENTRY_ID));
        if !present {
            headers.push(json!({ "id": APP_OPS_ENTRY_ID, "fragment": self.fragment }));
        }
        Ok(())
    }
}

/// Adds an app-ops item to the options menu passed as the first argument
struct MenuInjector;

impl MethodHook for MenuInjector {
    fn after(&self, call: &mut MethodCall) -> Result<()> {
        let menu = call
            .args
            .first_mut()
            .and_then(Value::as_array_mut)
            .context("menu argument missing")?;
        if !menu.iter().any(|item| item.as_str() == Some(APP_OPS_ENTRY_ID)) {
            menu.push(Value::from(APP_OPS_ENTRY_ID));
        }
        Ok(())
    }
}

fn samsung_matches(identity: &HostIdentity) -> bool {
    identity.manufacturer_contains("samsung") && identity.has_class(SAMSUNG_APP_INFO)
}

fn samsung_resources(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.add_resource("string/app_ops_menu_title")?;
    Ok(())
}

fn samsung_behavior(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.bind(SAMSUNG_APP_INFO, create_options_menu(), Arc::new(MenuInjector))?;
    Ok(())
}

fn lg_matches(identity: &HostIdentity) -> bool {
    identity.manufacturer_contains("lge") && identity.has_class(LG_SETTINGS)
}

fn lg_behavior(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.bind(LG_SETTINGS, build_headers(), Arc::new(HeaderInjector { fragment: APP_OPS_SUMMARY }))?;
    Ok(())
}

fn aosp_headers_matches(identity: &HostIdentity) -> bool {
    has_all_classes(identity, &[SETTINGS_CLASS, APP_OPS_SUMMARY])
}

fn aosp_headers_resources(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.add_resource("drawable/ic_settings_appops")?;
    Ok(())
}

fn aosp_headers_behavior(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.bind(SETTINGS_CLASS, build_headers(), Arc::new(HeaderInjector { fragment: APP_OPS_SUMMARY }))?;
    Ok(())
}

fn aosp_app_info_matches(identity: &HostIdentity) -> bool {
    identity.has_class(INSTALLED_APP_DETAILS) && has_matching_class(identity, APPLICATIONS_PACKAGE)
}

fn aosp_app_info_behavior(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.bind(INSTALLED_APP_DETAILS, create_options_menu(), Arc::new(MenuInjector))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::matcher::validate_class_patterns;

    #[test]
    fn test_priority_order() {
        let names: Vec<_> = all().iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["samsung", "lg", "aosp_headers", "aosp_app_info"]);
    }

    #[test]
    fn test_class_patterns_are_valid() {
        validate_class_patterns(&[SETTINGS_CLASS, APP_OPS_SUMMARY, APPLICATIONS_PACKAGE]).unwrap();
    }

    #[test]
    fn test_vendor_shapes_need_manufacturer() {
        let identity = HostIdentity::new("com.android.settings").with_classes([SAMSUNG_APP_INFO]);
        assert!(!samsung_matches(&identity));
        assert!(samsung_matches(&identity.with_manufacturer("samsung")));
    }

    #[test]
    fn test_header_injector_is_idempotent() {
        let mut call = MethodCall::new(None, build_headers(), vec![json!([])]);
        let hook = HeaderInjector { fragment: APP_OPS_SUMMARY };
        hook.after(&mut call).unwrap();
        hook.after(&mut call).unwrap();
        assert_eq!(call.args[0].as_array().unwrap().len(), 1);
        assert_eq!(call.args[0][0]["fragment"], APP_OPS_SUMMARY);
    }

    #[test]
    fn test_injector_rejects_missing_list() {
        let mut call = MethodCall::new(None, build_headers(), Vec::new());
        assert!(HeaderInjector { fragment: APP_OPS_SUMMARY }.after(&mut call).is_err());
        assert!(MenuInjector.after(&mut call).is_err());
    }
}
