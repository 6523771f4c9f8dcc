//! Host class model
//!
//! The binder never touches a concrete runtime; it patches through
//! [`HookHost`]. [`SimulatedHost`] is an in-memory class hierarchy with
//! virtual dispatch, built from a host profile for the CLI and for tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::hook::guard::{GuardedHook, MethodCall, Receiver};
use crate::models::{HostIdentity, MethodSignature};

/// Errors reported by the host while resolving or patching
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("method {method} is not declared on {class}")]
    NoSuchMethod { class: String, method: String },
}

/// The narrow surface the engine needs from the running host
pub trait HookHost {
    fn has_class(&self, class: &str) -> bool;

    /// Direct superclass of `class`, `None` at the root of the chain
    fn superclass_of(&self, class: &str) -> Result<Option<String>, HostError>;

    /// Patch `method` as declared exactly on `class`. Must fail with
    /// [`HostError::NoSuchMethod`] when the method is inherited rather than
    /// declared there.
    fn hook_method(
        &self,
        class: &str,
        method: &MethodSignature,
        hook: Arc<GuardedHook>,
    ) -> Result<(), HostError>;
}

/// Declared shape of one simulated class
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    pub superclass: Option<String>,
    /// Declared methods and the value the unpatched body returns
    pub methods: BTreeMap<MethodSignature, Value>,
}

type HookKey = (String, MethodSignature);

/// In-memory host with single inheritance and virtual dispatch
#[derive(Debug, Default)]
pub struct SimulatedHost {
    classes: HashMap<String, ClassDef>,
    hooks: RwLock<HashMap<HookKey, Vec<Arc<GuardedHook>>>>,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a class, replacing any earlier declaration of the same name
    pub fn define_class<I>(&mut self, name: &str, superclass: Option<&str>, methods: I) -> &mut Self
    where
        I: IntoIterator<Item = MethodSignature>,
    {
        let def = ClassDef {
            superclass: superclass.map(str::to_string),
            methods: methods.into_iter().map(|m| (m, Value::Null)).collect(),
        };
        self.classes.insert(name.to_string(), def);
        self
    }

    /// Set what the unpatched body of a declared method returns
    pub fn set_return(&mut self, class: &str, method: &MethodSignature, value: Value) -> Result<(), HostError> {
        let def = self
            .classes
            .get_mut(class)
            .ok_or_else(|| HostError::ClassNotFound(class.to_string()))?;
        match def.methods.get_mut(method) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(HostError::NoSuchMethod {
                class: class.to_string(),
                method: method.to_string(),
            }),
        }
    }

    pub fn class_names(&self) -> BTreeSet<String> {
        self.classes.keys().cloned().collect()
    }

    /// Identity of this host as seen by a process named `package`
    pub fn identity(&self, package: &str) -> HostIdentity {
        HostIdentity::new(package).with_classes(self.classes.keys().cloned())
    }

    /// `class` followed by its ancestors, root last. Stops at the first
    /// undeclared name or at a cycle.
    pub fn lineage(&self, class: &str) -> Vec<String> {
        let mut lineage = Vec::new();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            if lineage.contains(&name) {
                break;
            }
            current = self.classes.get(&name).and_then(|def| def.superclass.clone());
            lineage.push(name);
        }
        lineage
    }

    /// Number of hooks currently installed across all methods
    pub fn hook_count(&self) -> usize {
        self.hooks
            .read()
            .map(|hooks| hooks.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Whether any hook is installed on `method` as declared on `class`
    pub fn is_hooked(&self, class: &str, method: &MethodSignature) -> bool {
        self.hooks
            .read()
            .map(|hooks| hooks.contains_key(&(class.to_string(), method.clone())))
            .unwrap_or(false)
    }

    /// Call `method` on an instance of `receiver_class`, dispatching to the
    /// nearest declaring class and running any installed hooks
    pub fn invoke(&self, receiver_class: &str, method: &MethodSignature, args: Vec<Value>) -> Result<MethodCall, HostError> {
        if !self.classes.contains_key(receiver_class) {
            return Err(HostError::ClassNotFound(receiver_class.to_string()));
        }
        let lineage = self.lineage(receiver_class);
        let declaring = lineage
            .iter()
            .find(|class| self.declares(class, method))
            .cloned()
            .ok_or_else(|| HostError::NoSuchMethod {
                class: receiver_class.to_string(),
                method: method.to_string(),
            })?;
        let call = MethodCall::new(Some(Receiver::new(lineage)), method.clone(), args);
        Ok(self.dispatch(&declaring, call))
    }

    /// Call a static `method` declared on `class`
    pub fn invoke_static(&self, class: &str, method: &MethodSignature, args: Vec<Value>) -> Result<MethodCall, HostError> {
        if !self.declares(class, method) {
            return Err(HostError::NoSuchMethod {
                class: class.to_string(),
                method: method.to_string(),
            });
        }
        let call = MethodCall::new(None, method.clone(), args);
        Ok(self.dispatch(class, call))
    }

    fn declares(&self, class: &str, method: &MethodSignature) -> bool {
        self.classes
            .get(class)
            .map(|def| def.methods.contains_key(method))
            .unwrap_or(false)
    }

    fn dispatch(&self, declaring: &str, mut call: MethodCall) -> MethodCall {
        let key = (declaring.to_string(), call.method.clone());
        let hooks = self
            .hooks
            .read()
            .ok()
            .and_then(|hooks| hooks.get(&key).cloned())
            .unwrap_or_default();

        for hook in &hooks {
            if let Err(e) = hook.before(&mut call) {
                log::warn!(target: crate::constants::LOG_TARGET, "before routine on {}#{} failed: {:#}", declaring, call.method, e);
            }
        }

        if !call.has_result() {
            let body = self
                .classes
                .get(declaring)
                .and_then(|def| def.methods.get(&call.method))
                .cloned()
                .unwrap_or(Value::Null);
            call.set_result(body);
        }

        for hook in hooks.iter().rev() {
            if let Err(e) = hook.after(&mut call) {
                log::warn!(target: crate::constants::LOG_TARGET, "after routine on {}#{} failed: {:#}", declaring, call.method, e);
            }
        }

        call
    }
}

impl HookHost for SimulatedHost {
    fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn superclass_of(&self, class: &str) -> Result<Option<String>, HostError> {
        self.classes
            .get(class)
            .map(|def| def.superclass.clone())
            .ok_or_else(|| HostError::ClassNotFound(class.to_string()))
    }

    fn hook_method(
        &self,
        class: &str,
        method: &MethodSignature,
        hook: Arc<GuardedHook>,
    ) -> Result<(), HostError> {
        if !self.classes.contains_key(class) {
            return Err(HostError::ClassNotFound(class.to_string()));
        }
        if !self.declares(class, method) {
            return Err(HostError::NoSuchMethod {
                class: class.to_string(),
                method: method.to_string(),
            });
        }
        let mut hooks = self
            .hooks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        hooks
            .entry((class.to_string(), method.clone()))
            .or_default()
            .push(hook);
        Ok(())
    }
}
