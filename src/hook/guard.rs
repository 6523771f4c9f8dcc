//! Identity-guarded callbacks
//!
//! A method bound on an ancestor class fires for every subclass sharing it.
//! `GuardedHook` remembers which class the hook was meant for and drops
//! invocations whose receiver is not an instance of it.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::logging::EngineLogger;
use crate::models::MethodSignature;

/// The object an intercepted method was called on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    /// Runtime class of the receiver
    pub class: String,
    /// The runtime class followed by every ancestor, root last
    pub lineage: Vec<String>,
}

impl Receiver {
    pub fn new(lineage: Vec<String>) -> Self {
        let class = lineage.first().cloned().unwrap_or_default();
        Self { class, lineage }
    }

    pub fn is_instance_of(&self, class: &str) -> bool {
        self.lineage.iter().any(|c| c == class)
    }
}

/// State of one intercepted call, shared by before and after routines
#[derive(Debug, Clone)]
pub struct MethodCall {
    /// `None` for static methods
    pub receiver: Option<Receiver>,
    pub method: MethodSignature,
    pub args: Vec<Value>,
    result: Option<Value>,
}

impl MethodCall {
    pub fn new(receiver: Option<Receiver>, method: MethodSignature, args: Vec<Value>) -> Self {
        Self {
            receiver,
            method,
            args,
            result: None,
        }
    }

    /// Set the return value. Called from a before routine this skips the
    /// original method.
    pub fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn result_mut(&mut self) -> Option<&mut Value> {
        self.result.as_mut()
    }

    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    pub fn into_result(self) -> Option<Value> {
        self.result
    }

    pub fn receiver_class(&self) -> &str {
        self.receiver
            .as_ref()
            .map(|r| r.class.as_str())
            .unwrap_or("<static>")
    }
}

/// Interception routines run around a patched host method
pub trait MethodHook: Send + Sync {
    fn before(&self, _call: &mut MethodCall) -> Result<()> {
        Ok(())
    }

    fn after(&self, _call: &mut MethodCall) -> Result<()> {
        Ok(())
    }
}

type HookRoutine = Box<dyn Fn(&mut MethodCall) -> Result<()> + Send + Sync>;

/// Closure-backed [`MethodHook`]
#[derive(Default)]
pub struct HookFn {
    before: Option<HookRoutine>,
    after: Option<HookRoutine>,
}

impl HookFn {
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&mut MethodCall) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            before: Some(Box::new(f)),
            after: None,
        }
    }

    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&mut MethodCall) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            before: None,
            after: Some(Box::new(f)),
        }
    }

    pub fn and_after<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut MethodCall) -> Result<()> + Send + Sync + 'static,
    {
        self.after = Some(Box::new(f));
        self
    }
}

impl MethodHook for HookFn {
    fn before(&self, call: &mut MethodCall) -> Result<()> {
        match &self.before {
            Some(f) => f(call),
            None => Ok(()),
        }
    }

    fn after(&self, call: &mut MethodCall) -> Result<()> {
        match &self.after {
            Some(f) => f(call),
            None => Ok(()),
        }
    }
}

/// Replaces a method body with a fixed return value
#[derive(Debug, Clone)]
pub struct ReturnConstant(pub Value);

impl MethodHook for ReturnConstant {
    fn before(&self, call: &mut MethodCall) -> Result<()> {
        call.set_result(self.0.clone());
        Ok(())
    }
}

/// A [`MethodHook`] that only runs for receivers of its target class
pub struct GuardedHook {
    target: Option<String>,
    inner: Arc<dyn MethodHook>,
    logger: EngineLogger,
}

impl GuardedHook {
    pub fn new(target: impl Into<String>, inner: Arc<dyn MethodHook>, logger: EngineLogger) -> Self {
        Self {
            target: Some(target.into()),
            inner,
            logger,
        }
    }

    /// Guard that lets every receiver through, static calls included
    pub fn accept_any(inner: Arc<dyn MethodHook>, logger: EngineLogger) -> Self {
        Self {
            target: None,
            inner,
            logger,
        }
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn accepts(&self, call: &MethodCall) -> bool {
        match (&self.target, &call.receiver) {
            (None, _) => true,
            (Some(target), Some(receiver)) => receiver.is_instance_of(target),
            (Some(_), None) => false,
        }
    }

    /// Run the before routine if the receiver passes the guard. Returns
    /// whether the wrapped routine was invoked.
    pub fn before(&self, call: &mut MethodCall) -> Result<bool> {
        if !self.accepts(call) {
            self.logger.log_guard_skip("before", call.receiver_class(), self.target());
            return Ok(false);
        }
        self.inner.before(call)?;
        Ok(true)
    }

    /// Run the after routine if the receiver passes the guard
    pub fn after(&self, call: &mut MethodCall) -> Result<bool> {
        if !self.accepts(call) {
            self.logger.log_guard_skip("after", call.receiver_class(), self.target());
            return Ok(false);
        }
        self.inner.after(call)?;
        Ok(true)
    }
}

impl std::fmt::Debug for GuardedHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedHook")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook(counter: Arc<AtomicUsize>) -> Arc<dyn MethodHook> {
        Arc::new(HookFn::before(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
    }

    fn call_on(lineage: &[&str]) -> MethodCall {
        MethodCall::new(
            Some(Receiver::new(lineage.iter().map(|s| s.to_string()).collect())),
            MethodSignature::new("onResume", Vec::<String>::new()),
            Vec::new(),
        )
    }

    #[test]
    fn test_unrelated_receiver_is_skipped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let guard = GuardedHook::new("app.Details", counting_hook(counter.clone()), EngineLogger::new(LogLevel::Debug));

        let mut call = call_on(&["app.Other", "app.Fragment", "java.lang.Object"]);
        assert!(!guard.before(&mut call).unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subclass_receiver_is_accepted() {
        let counter = Arc::new(AtomicUsize::new(0));
        let guard = GuardedHook::new("app.Details", counting_hook(counter.clone()), EngineLogger::new(LogLevel::Info));

        let mut call = call_on(&["app.VendorDetails", "app.Details", "java.lang.Object"]);
        assert!(guard.before(&mut call).unwrap());
        assert!(guard.before(&mut call).unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_static_call_needs_open_guard() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hook = counting_hook(counter.clone());
        let logger = EngineLogger::new(LogLevel::Info);
        let mut call = MethodCall::new(None, MethodSignature::new("check", Vec::<String>::new()), Vec::new());

        assert!(!GuardedHook::new("app.Util", hook.clone(), logger.clone()).before(&mut call).unwrap());
        assert!(GuardedHook::accept_any(hook, logger).before(&mut call).unwrap());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_return_constant_sets_result() {
        let mut call = call_on(&["app.Util"]);
        ReturnConstant(Value::Bool(true)).before(&mut call).unwrap();
        assert_eq!(call.result(), Some(&Value::Bool(true)));
    }
}
