//! Hack registry
//!
//! Hacks are independent feature units applied after variant resolution in
//! both phases. Each one runs inside its own failure boundary.

pub mod builtin;

use std::collections::BTreeSet;

use anyhow::Result;

use crate::config::Preferences;
use crate::engine::boundary::isolate;
use crate::engine::PhaseContext;
use crate::models::{HackResult, HackStatus, Phase};

pub type HackCallback = fn(&mut PhaseContext<'_>) -> Result<()>;

/// One independent feature unit
#[derive(Clone, Copy)]
pub struct Hack {
    pub name: &'static str,
    pub enabled_by_default: bool,
    pub resources: Option<HackCallback>,
    pub behavior: Option<HackCallback>,
}

impl Hack {
    pub fn callback(&self, phase: Phase) -> Option<HackCallback> {
        match phase {
            Phase::Resources => self.resources,
            Phase::Behavior => self.behavior,
        }
    }
}

impl std::fmt::Debug for Hack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hack")
            .field("name", &self.name)
            .field("enabled_by_default", &self.enabled_by_default)
            .field("resources", &self.resources.is_some())
            .field("behavior", &self.behavior.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HackRegistry {
    hacks: Vec<Hack>,
}

impl HackRegistry {
    pub fn new(hacks: Vec<Hack>) -> Self {
        Self { hacks }
    }

    pub fn builtin() -> Self {
        Self::new(builtin::all())
    }

    pub fn len(&self) -> usize {
        self.hacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hacks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hack> {
        self.hacks.iter()
    }

    /// Names of the hacks `prefs` enables
    pub fn enabled(&self, prefs: &Preferences) -> BTreeSet<&'static str> {
        self.hacks
            .iter()
            .filter(|hack| prefs.hack_enabled(hack.name, hack.enabled_by_default))
            .map(|hack| hack.name)
            .collect()
    }

    /// Run every enabled hack for the context's phase, in registration order.
    /// Failures are logged and reported, never propagated.
    pub fn apply_phase(&self, ctx: &mut PhaseContext<'_>) -> Vec<HackResult> {
        let phase = ctx.phase();
        let enabled = self.enabled(ctx.prefs);
        let mut results = Vec::with_capacity(enabled.len());

        for hack in self.hacks.iter().filter(|h| enabled.contains(h.name)) {
            let status = match hack.callback(phase) {
                None => HackStatus::NotApplicable,
                Some(callback) => match isolate(|| callback(ctx)) {
                    Ok(()) => HackStatus::Applied,
                    Err(error) => {
                        ctx.logger.log_hack_failed(phase, hack.name, &error);
                        HackStatus::Failed { error }
                    }
                },
            };
            results.push(HackResult {
                name: hack.name.to_string(),
                status,
            });
        }

        results
    }
}
