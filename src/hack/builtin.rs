//! Hacks shipped with the crate

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::constants::{MODULE_ICONS, SETTINGS_PACKAGES, SYSTEM_PACKAGE};
use crate::engine::PhaseContext;
use crate::hack::Hack;
use crate::hook::{MethodCall, MethodHook};
use crate::models::{MethodSignature, Subject};
use crate::ops::OpsModel;

pub const BOOT_COMPLETED_OP: &str = "BOOT_COMPLETED";
pub const BOOT_COMPLETED_ACTION: &str = "android.intent.action.BOOT_COMPLETED";
pub const BROADCAST_QUEUE_CLASS: &str = "com.android.server.am.BroadcastQueue";

pub fn all() -> Vec<Hack> {
    vec![SETTINGS_ICONS, BOOT_COMPLETED]
}

pub const SETTINGS_ICONS: Hack = Hack {
    name: "settings_icons",
    enabled_by_default: true,
    resources: Some(add_module_icons),
    behavior: None,
};

pub const BOOT_COMPLETED: Hack = Hack {
    name: "boot_completed",
    enabled_by_default: true,
    resources: None,
    behavior: Some(gate_boot_completed),
};

pub fn deliver_broadcast() -> MethodSignature {
    MethodSignature::new(
        "deliverBroadcast",
        vec!["android.content.Intent", "android.content.pm.ApplicationInfo"],
    )
}

fn add_module_icons(ctx: &mut PhaseContext<'_>) -> Result<()> {
    if !SETTINGS_PACKAGES.contains(&ctx.identity.package.as_str()) {
        return Ok(());
    }
    for icon in MODULE_ICONS {
        ctx.add_resource(icon)?;
    }
    Ok(())
}

fn gate_boot_completed(ctx: &mut PhaseContext<'_>) -> Result<()> {
    if ctx.identity.package != SYSTEM_PACKAGE {
        return Ok(());
    }
    let Some(ops) = ctx.ops else {
        ctx.logger.log_hack_skipped(BOOT_COMPLETED.name, "no ops model");
        return Ok(());
    };
    let Some(op) = ops.table().by_name(BOOT_COMPLETED_OP).map(|d| d.code) else {
        ctx.logger.log_hack_skipped(BOOT_COMPLETED.name, "host has no BOOT_COMPLETED op");
        return Ok(());
    };
    if !ctx.has_class(BROADCAST_QUEUE_CLASS) {
        ctx.logger.log_hack_skipped(BOOT_COMPLETED.name, "host has no broadcast queue");
        return Ok(());
    }

    let gate = BootGate { ops: ops.clone(), op };
    ctx.bind(BROADCAST_QUEUE_CLASS, deliver_broadcast(), Arc::new(gate))?;
    Ok(())
}

/// Drops BOOT_COMPLETED deliveries to packages whose op is switched off
struct BootGate {
    ops: OpsModel,
    op: u32,
}

impl BootGate {
    fn receiver(app: &Value) -> Result<Subject> {
        let uid = app
            .get("uid")
            .and_then(Value::as_u64)
            .context("receiver uid missing")?;
        let package = app
            .get("package")
            .and_then(Value::as_str)
            .context("receiver package missing")?;
        Ok(Subject::new(u32::try_from(uid)?, package))
    }
}

impl MethodHook for BootGate {
    fn before(&self, call: &mut MethodCall) -> Result<()> {
        let action = call.args.first().and_then(|i| i.get("action")).and_then(Value::as_str);
        if action != Some(BOOT_COMPLETED_ACTION) {
            return Ok(());
        }
        let app = call.args.get(1).context("receiver argument missing")?;
        let subject = Self::receiver(app)?;
        if !self.ops.is_checked(self.op, &subject) {
            log::info!(target: crate::constants::LOG_TARGET, "blocking {} for {}", BOOT_COMPLETED_OP, subject);
            call.set_result(Value::Bool(false));
        }
        Ok(())
    }
}
