//! Hook installation layer
//!
//! This module provides the pieces the engine binds host methods with:
//! - `host`: the `HookHost` trait the binder patches through, plus an
//!   in-memory `SimulatedHost` with virtual dispatch
//! - `guard`: identity-guarded callbacks that ignore foreign receivers
//! - `binder`: the superclass-walking method binder

pub mod binder;
pub mod guard;
pub mod host;

pub use binder::{bind_recursive, bind_recursive_guarded, BindError, BoundHook};
pub use guard::{GuardedHook, HookFn, MethodCall, MethodHook, Receiver, ReturnConstant};
pub use host::{ClassDef, HookHost, HostError, SimulatedHost};
