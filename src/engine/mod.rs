//! Engine facade
//!
//! The two entry points the host calls at load time. Each phase builds a
//! fresh [`PhaseContext`], resolves a variant when the host is a settings
//! target, then applies the enabled hacks. The resource phase does nothing
//! at all for other hosts.

pub mod boundary;
pub mod context;
pub mod resources;

pub use context::{PhaseContext, PhaseTarget};
pub use resources::{MemoryResourceTable, ResourceError, ResourceTable};

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::config::Preferences;
use crate::constants::{MODULE_PACKAGE, MODULE_SELF_CHECK_CLASS, MODULE_SELF_CHECK_METHOD, SETTINGS_PACKAGES};
use crate::engine::boundary::isolate;
use crate::hack::HackRegistry;
use crate::hook::{HookHost, ReturnConstant};
use crate::logging::EngineLogger;
use crate::models::{HostIdentity, MethodSignature, Phase, PhaseReport};
use crate::ops::OpsModel;
use crate::variant::VariantRegistry;

#[derive(Debug, Clone, Default)]
pub struct Engine {
    variants: VariantRegistry,
    hacks: HackRegistry,
}

impl Engine {
    pub fn new(variants: VariantRegistry, hacks: HackRegistry) -> Self {
        Self { variants, hacks }
    }

    /// Engine with the built-in variants and hacks
    pub fn builtin() -> Self {
        Self::new(VariantRegistry::builtin(), HackRegistry::builtin())
    }

    pub fn variants(&self) -> &VariantRegistry {
        &self.variants
    }

    pub fn hacks(&self) -> &HackRegistry {
        &self.hacks
    }

    /// Whether variants are tried for this host at all
    pub fn is_variant_target(identity: &HostIdentity) -> bool {
        SETTINGS_PACKAGES.contains(&identity.package.as_str())
    }

    /// Host resources are about to load
    pub fn on_resource_phase(
        &self,
        identity: &HostIdentity,
        resources: &mut dyn ResourceTable,
        prefs: &Preferences,
    ) -> PhaseReport {
        let logger = EngineLogger::for_debug_flag(prefs.debug);
        let ctx = PhaseContext::new(identity, prefs, &logger, None, PhaseTarget::Resources(resources));
        self.run_phase(ctx)
    }

    /// Host code is about to load
    pub fn on_behavior_phase(
        &self,
        identity: &HostIdentity,
        host: &dyn HookHost,
        prefs: &Preferences,
        ops: Option<&OpsModel>,
    ) -> PhaseReport {
        let logger = EngineLogger::for_debug_flag(prefs.debug);
        let mut ctx = PhaseContext::new(identity, prefs, &logger, ops, PhaseTarget::Behavior(host));
        if identity.package == MODULE_PACKAGE {
            Self::install_self_check(&mut ctx);
        }
        self.run_phase(ctx)
    }

    fn run_phase(&self, mut ctx: PhaseContext<'_>) -> PhaseReport {
        let started = Instant::now();
        let phase = ctx.phase();
        ctx.logger.log_phase_start(phase, &ctx.identity.package);

        let target = Self::is_variant_target(ctx.identity);
        let variant = if target {
            Some(self.variants.resolve(&mut ctx))
        } else {
            None
        };
        // resources of non-settings hosts are left alone entirely
        let hacks = if target || phase == Phase::Behavior {
            self.hacks.apply_phase(&mut ctx)
        } else {
            Vec::new()
        };

        PhaseReport {
            phase,
            package: ctx.identity.package.clone(),
            variant,
            hacks,
            bound_hooks: ctx.bound_hooks().iter().map(|b| b.summary()).collect(),
            resources_added: ctx.resources_added().to_vec(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Make the module's own "is enabled" check report true
    fn install_self_check(ctx: &mut PhaseContext<'_>) {
        if !ctx.has_class(MODULE_SELF_CHECK_CLASS) {
            return;
        }
        let check = MethodSignature::new(MODULE_SELF_CHECK_METHOD, Vec::<String>::new());
        let result = isolate(|| {
            ctx.bind_unguarded(MODULE_SELF_CHECK_CLASS, check, Arc::new(ReturnConstant(Value::Bool(true))))?;
            Ok(())
        });
        if let Err(cause) = result {
            ctx.logger.log_hack_failed(Phase::Behavior, "self_check", &cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::SimulatedHost;

    #[test]
    fn test_variant_target_gating() {
        assert!(Engine::is_variant_target(&HostIdentity::new("com.android.settings")));
        assert!(Engine::is_variant_target(&HostIdentity::new("com.sonyericsson.settings")));
        assert!(!Engine::is_variant_target(&HostIdentity::new("android")));
    }

    #[test]
    fn test_non_target_skips_variants() {
        let engine = Engine::builtin();
        let mut table = MemoryResourceTable::new();
        let report = engine.on_resource_phase(&HostIdentity::new("com.example"), &mut table, &Preferences::default());
        assert!(report.variant.is_none());
        assert_eq!(report.phase, Phase::Resources);
        assert!(table.is_empty());
    }

    #[test]
    fn test_self_check_reports_enabled() {
        let check = MethodSignature::new(MODULE_SELF_CHECK_METHOD, Vec::<String>::new());
        let mut host = SimulatedHost::new();
        host.define_class(MODULE_SELF_CHECK_CLASS, None, [check.clone()]);
        host.set_return(MODULE_SELF_CHECK_CLASS, &check, Value::Bool(false)).unwrap();
        let identity = host.identity(MODULE_PACKAGE);

        let report = Engine::builtin().on_behavior_phase(&identity, &host, &Preferences::default(), None);
        assert_eq!(report.bound_hooks.len(), 1);

        let call = host.invoke_static(MODULE_SELF_CHECK_CLASS, &check, Vec::new()).unwrap();
        assert_eq!(call.into_result(), Some(Value::Bool(true)));
    }
}
