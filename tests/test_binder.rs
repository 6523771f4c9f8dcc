//! Recursive binder and receiver guard behavior against a simulated host

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use opshim::hook::{bind_recursive, BindError, HookFn, MethodHook, SimulatedHost};
use opshim::logging::EngineLogger;
use opshim::models::MethodSignature;

fn on_resume() -> MethodSignature {
    MethodSignature::new("onResume", Vec::<String>::new())
}

/// `app.C0 -> app.C1 -> ... -> app.C{depth}` with `on_resume` declared on
/// `app.C{declared_at}` when given
fn chain_host(depth: usize, declared_at: Option<usize>) -> SimulatedHost {
    let mut host = SimulatedHost::new();
    for level in 0..=depth {
        let name = format!("app.C{}", level);
        let parent = (level < depth).then(|| format!("app.C{}", level + 1));
        let methods = if declared_at == Some(level) { vec![on_resume()] } else { Vec::new() };
        host.define_class(&name, parent.as_deref(), methods);
    }
    host
}

fn counting_hook() -> (Arc<dyn MethodHook>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();
    let hook = HookFn::before(move |_call| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (Arc::new(hook), count)
}

#[test]
fn test_binds_after_exactly_k_retries() {
    let logger = EngineLogger::default();
    for k in 0..5 {
        let host = chain_host(5, Some(k));
        let (hook, _) = counting_hook();
        let bound = bind_recursive(&host, "app.C0", &on_resume(), hook, &logger).unwrap();
        assert_eq!(bound.retries, k, "declared {} levels up", k);
        assert_eq!(bound.declaring_class, format!("app.C{}", k));
        assert_eq!(bound.requested_class, "app.C0");
        assert!(host.is_hooked(&bound.declaring_class, &on_resume()));
    }
}

#[test]
fn test_absent_method_walks_whole_chain() {
    let host = chain_host(3, None);
    let (hook, _) = counting_hook();
    let err = bind_recursive(&host, "app.C0", &on_resume(), hook, &EngineLogger::default()).unwrap_err();
    match err {
        BindError::MethodNotFound { chain_walked, method } => {
            assert_eq!(chain_walked, vec!["app.C0", "app.C1", "app.C2", "app.C3"]);
            assert_eq!(method, "onResume()");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(host.hook_count(), 0);
}

#[test]
fn test_missing_start_class() {
    let host = chain_host(1, Some(1));
    let (hook, _) = counting_hook();
    let err = bind_recursive(&host, "app.Missing", &on_resume(), hook, &EngineLogger::default()).unwrap_err();
    assert_eq!(err, BindError::ClassNotFound { class: "app.Missing".to_string() });
}

#[test]
fn test_guard_ignores_unrelated_receivers() {
    // C0 and Sibling both inherit onResume from C1
    let mut host = chain_host(1, Some(1));
    host.define_class("app.Sibling", Some("app.C1"), Vec::<MethodSignature>::new());
    host.define_class("app.Leaf", Some("app.C0"), Vec::<MethodSignature>::new());

    let (hook, count) = counting_hook();
    bind_recursive(&host, "app.C0", &on_resume(), hook, &EngineLogger::default()).unwrap();

    host.invoke("app.Sibling", &on_resume(), Vec::new()).unwrap();
    host.invoke("app.C1", &on_resume(), Vec::new()).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);

    host.invoke("app.C0", &on_resume(), Vec::new()).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    host.invoke("app.Leaf", &on_resume(), Vec::new()).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}
