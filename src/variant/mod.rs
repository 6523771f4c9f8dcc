//! Variant registry and resolver
//!
//! A variant is a hypothesis about the host's internal layout paired with
//! the patches that are valid under it. Variants are tried in priority
//! order; the first whose install routine completes wins the phase.

pub mod builtin;
pub mod matcher;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::engine::boundary::isolate;
use crate::engine::PhaseContext;
use crate::models::{HostIdentity, Phase};

/// Install routine of a variant for one phase
pub type InstallFn = fn(&mut PhaseContext<'_>) -> Result<()>;

/// One known host shape
#[derive(Clone, Copy)]
pub struct Variant {
    pub name: &'static str,
    pub matches: fn(&HostIdentity) -> bool,
    pub resources: InstallFn,
    pub behavior: InstallFn,
}

impl Variant {
    pub fn install_fn(&self, phase: Phase) -> InstallFn {
        match phase {
            Phase::Resources => self.resources,
            Phase::Behavior => self.behavior,
        }
    }
}

impl std::fmt::Debug for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variant").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Install routine that changes nothing
pub fn no_install(_ctx: &mut PhaseContext<'_>) -> Result<()> {
    Ok(())
}

/// A candidate whose install routine failed, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFailure {
    pub name: String,
    pub cause: String,
}

/// Result of resolving one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VariantOutcome {
    Resolved {
        index: usize,
        name: String,
        /// Install routines run, the successful one included
        attempts: usize,
        /// Candidates tried before the winner, in order
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failures: Vec<VariantFailure>,
    },
    Exhausted {
        attempts: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failures: Vec<VariantFailure>,
    },
}

impl VariantOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, VariantOutcome::Resolved { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            VariantOutcome::Resolved { attempts, .. } | VariantOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }

    pub fn failures(&self) -> &[VariantFailure] {
        match self {
            VariantOutcome::Resolved { failures, .. } | VariantOutcome::Exhausted { failures, .. } => failures,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveState {
    Unresolved,
    Trying(usize),
    Resolved(usize),
    Exhausted,
}

/// Ordered list of host shapes, highest priority first
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    variants: Vec<Variant>,
}

impl VariantRegistry {
    pub fn new(variants: Vec<Variant>) -> Self {
        Self { variants }
    }

    /// The shapes shipped with the crate
    pub fn builtin() -> Self {
        Self::new(builtin::all())
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    /// Names of the variants whose predicate accepts `identity`, in order
    pub fn matching(&self, identity: &HostIdentity) -> Vec<&'static str> {
        self.variants
            .iter()
            .filter(|v| (v.matches)(identity))
            .map(|v| v.name)
            .collect()
    }

    /// Try every matching variant in order until one installs cleanly
    pub fn resolve(&self, ctx: &mut PhaseContext<'_>) -> VariantOutcome {
        let phase = ctx.phase();
        let mut attempts = 0;
        let mut failures = Vec::new();
        let mut state = ResolveState::Unresolved;

        loop {
            state = match state {
                ResolveState::Unresolved => self.next_candidate(0, ctx.identity),
                ResolveState::Trying(index) => {
                    let variant = &self.variants[index];
                    attempts += 1;
                    let install = variant.install_fn(phase);
                    match isolate(|| install(ctx)) {
                        Ok(()) => {
                            ctx.logger.log_variant_ok(phase, variant.name);
                            ResolveState::Resolved(index)
                        }
                        Err(cause) => {
                            ctx.logger.log_variant_failed(phase, variant.name, &cause);
                            failures.push(VariantFailure {
                                name: variant.name.to_string(),
                                cause,
                            });
                            self.next_candidate(index + 1, ctx.identity)
                        }
                    }
                }
                ResolveState::Resolved(index) => {
                    return VariantOutcome::Resolved {
                        index,
                        name: self.variants[index].name.to_string(),
                        attempts,
                        failures,
                    };
                }
                ResolveState::Exhausted => {
                    ctx.logger.log_variant_exhausted(phase, attempts);
                    return VariantOutcome::Exhausted { attempts, failures };
                }
            };
        }
    }

    fn next_candidate(&self, from: usize, identity: &HostIdentity) -> ResolveState {
        self.variants
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, v)| (v.matches)(identity))
            .map(|(index, _)| ResolveState::Trying(index))
            .unwrap_or(ResolveState::Exhausted)
    }
}
