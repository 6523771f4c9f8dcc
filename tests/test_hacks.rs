//! Hack isolation: one hack failing never affects the others

use anyhow::{bail, Result};

use opshim::config::Preferences;
use opshim::engine::{MemoryResourceTable, PhaseContext, PhaseTarget};
use opshim::hack::{Hack, HackRegistry};
use opshim::logging::EngineLogger;
use opshim::models::{HackStatus, HostIdentity};

fn errors(_ctx: &mut PhaseContext<'_>) -> Result<()> {
    bail!("host class renamed")
}

fn panics(_ctx: &mut PhaseContext<'_>) -> Result<()> {
    panic!("index out of range")
}

fn adds_b(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.add_resource("drawable/b")?;
    Ok(())
}

fn adds_c(ctx: &mut PhaseContext<'_>) -> Result<()> {
    ctx.add_resource("drawable/c")?;
    Ok(())
}

fn hack(name: &'static str, callback: fn(&mut PhaseContext<'_>) -> Result<()>) -> Hack {
    Hack { name, enabled_by_default: true, resources: Some(callback), behavior: None }
}

fn apply(registry: &HackRegistry, prefs: &Preferences) -> (Vec<(String, HackStatus)>, Vec<String>) {
    let identity = HostIdentity::new("com.example");
    let logger = EngineLogger::default();
    let mut table = MemoryResourceTable::new();
    let mut ctx = PhaseContext::new(&identity, prefs, &logger, None, PhaseTarget::Resources(&mut table));
    let results = registry
        .apply_phase(&mut ctx)
        .into_iter()
        .map(|r| (r.name, r.status))
        .collect();
    (results, ctx.resources_added().to_vec())
}

#[test]
fn test_failures_do_not_stop_later_hacks() {
    let registry = HackRegistry::new(vec![hack("a", errors), hack("p", panics), hack("b", adds_b), hack("c", adds_c)]);
    let (results, added) = apply(&registry, &Preferences::default());

    assert_eq!(results.len(), 4);
    assert!(matches!(&results[0].1, HackStatus::Failed { error } if error.contains("host class renamed")));
    assert!(matches!(&results[1].1, HackStatus::Failed { error } if error.contains("panicked: index out of range")));
    assert_eq!(results[2], ("b".to_string(), HackStatus::Applied));
    assert_eq!(results[3], ("c".to_string(), HackStatus::Applied));
    assert_eq!(added, vec!["drawable/b", "drawable/c"]);
}

#[test]
fn test_same_outcome_with_or_without_failing_hack() {
    let with = HackRegistry::new(vec![hack("a", errors), hack("b", adds_b), hack("c", adds_c)]);
    let without = HackRegistry::new(vec![hack("b", adds_b), hack("c", adds_c)]);

    let (_, added_with) = apply(&with, &Preferences::default());
    let (_, added_without) = apply(&without, &Preferences::default());
    assert_eq!(added_with, added_without);
}

#[test]
fn test_disabled_hack_is_not_run() {
    let registry = HackRegistry::new(vec![hack("a", errors), hack("b", adds_b)]);
    let prefs = Preferences::default().with_hack("a", false);
    let (results, _) = apply(&registry, &prefs);
    assert_eq!(results, vec![("b".to_string(), HackStatus::Applied)]);
}

#[test]
fn test_builtin_registry_order() {
    let names: Vec<_> = HackRegistry::builtin().iter().map(|h| h.name).collect();
    assert_eq!(names, vec!["settings_icons", "boot_completed"]);
}
