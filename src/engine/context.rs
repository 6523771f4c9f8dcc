//! Per-load context threaded through variants and hacks
//!
//! Built fresh for every phase call; nothing here outlives the load.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::config::Preferences;
use crate::engine::resources::ResourceTable;
use crate::hook::{bind_recursive, bind_recursive_guarded, BoundHook, GuardedHook, HookHost, MethodHook};
use crate::logging::EngineLogger;
use crate::models::{HostIdentity, MethodSignature, Phase};
use crate::ops::OpsModel;

/// What the current phase is allowed to patch
pub enum PhaseTarget<'a> {
    Resources(&'a mut dyn ResourceTable),
    Behavior(&'a dyn HookHost),
}

pub struct PhaseContext<'a> {
    pub identity: &'a HostIdentity,
    pub prefs: &'a Preferences,
    pub logger: &'a EngineLogger,
    /// Op model of the host, when the embedding side has one
    pub ops: Option<&'a OpsModel>,
    target: PhaseTarget<'a>,
    bound: Vec<BoundHook>,
    resources_added: Vec<String>,
}

impl<'a> PhaseContext<'a> {
    pub fn new(
        identity: &'a HostIdentity,
        prefs: &'a Preferences,
        logger: &'a EngineLogger,
        ops: Option<&'a OpsModel>,
        target: PhaseTarget<'a>,
    ) -> Self {
        Self {
            identity,
            prefs,
            logger,
            ops,
            target,
            bound: Vec::new(),
            resources_added: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.target {
            PhaseTarget::Resources(_) => Phase::Resources,
            PhaseTarget::Behavior(_) => Phase::Behavior,
        }
    }

    /// Host being patched; only available in the behavior phase
    pub fn host(&self) -> Option<&'a dyn HookHost> {
        match self.target {
            PhaseTarget::Behavior(host) => Some(host),
            PhaseTarget::Resources(_) => None,
        }
    }

    /// Whether the running host ships `class`
    pub fn has_class(&self, class: &str) -> bool {
        match self.target {
            PhaseTarget::Behavior(host) => host.has_class(class),
            PhaseTarget::Resources(_) => self.identity.has_class(class),
        }
    }

    /// Bind `hook` on `class` (or the nearest ancestor declaring `method`),
    /// guarded to receivers of `class`
    pub fn bind(&mut self, class: &str, method: MethodSignature, hook: Arc<dyn MethodHook>) -> Result<BoundHook> {
        let Some(host) = self.host() else {
            bail!("cannot bind {}#{} outside the behavior phase", class, method);
        };
        let bound = bind_recursive(host, class, &method, hook, self.logger)?;
        self.bound.push(bound.clone());
        Ok(bound)
    }

    /// Bind `hook` without a receiver guard, for static methods
    pub fn bind_unguarded(&mut self, class: &str, method: MethodSignature, hook: Arc<dyn MethodHook>) -> Result<BoundHook> {
        let Some(host) = self.host() else {
            bail!("cannot bind {}#{} outside the behavior phase", class, method);
        };
        let guarded = Arc::new(GuardedHook::accept_any(hook, self.logger.clone()));
        let bound = bind_recursive_guarded(host, class, &method, guarded, self.logger)?;
        self.bound.push(bound.clone());
        Ok(bound)
    }

    /// Add a module resource to the host table; resource phase only
    pub fn add_resource(&mut self, name: &str) -> Result<u32> {
        let PhaseTarget::Resources(table) = &mut self.target else {
            bail!("cannot add resource {} outside the resource phase", name);
        };
        let id = table.add_resource(name)?;
        self.resources_added.push(name.to_string());
        Ok(id)
    }

    pub fn bound_hooks(&self) -> &[BoundHook] {
        &self.bound
    }

    pub fn resources_added(&self) -> &[String] {
        &self.resources_added
    }
}
