//! Superclass-walking method binder
//!
//! Host releases move method declarations up and down the class hierarchy.
//! `bind_recursive` tries the expected class first and then each ancestor
//! in turn until one of them declares the method.

use std::sync::Arc;

use crate::hook::guard::{GuardedHook, MethodHook};
use crate::hook::host::{HookHost, HostError};
use crate::logging::EngineLogger;
use crate::models::{BoundHookSummary, MethodSignature};

/// A hook that was successfully installed on the host
#[derive(Debug, Clone)]
pub struct BoundHook {
    /// Class the caller asked for
    pub requested_class: String,
    /// Class that actually declares the patched method
    pub declaring_class: String,
    pub signature: MethodSignature,
    pub callback: Arc<GuardedHook>,
    /// Superclass hops taken before binding
    pub retries: usize,
}

impl BoundHook {
    pub fn summary(&self) -> BoundHookSummary {
        BoundHookSummary {
            requested_class: self.requested_class.clone(),
            declaring_class: self.declaring_class.clone(),
            method: self.signature.to_string(),
            retries: self.retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("class not found: {class}")]
    ClassNotFound { class: String },
    #[error("method {method} not found after walking {}", .chain_walked.join(" -> "))]
    MethodNotFound {
        method: String,
        chain_walked: Vec<String>,
    },
}

/// Bind `hook` to `method`, starting at `class` and walking up the chain.
///
/// The hook is wrapped in a [`GuardedHook`] targeting `class`, so receivers
/// that merely share the ancestor the method was found on are ignored.
pub fn bind_recursive(
    host: &dyn HookHost,
    class: &str,
    method: &MethodSignature,
    hook: Arc<dyn MethodHook>,
    logger: &EngineLogger,
) -> Result<BoundHook, BindError> {
    let guarded = Arc::new(GuardedHook::new(class, hook, logger.clone()));
    bind_recursive_guarded(host, class, method, guarded, logger)
}

/// Same as [`bind_recursive`] with a caller-built guard. The same guard
/// instance is offered to every class tried.
pub fn bind_recursive_guarded(
    host: &dyn HookHost,
    class: &str,
    method: &MethodSignature,
    hook: Arc<GuardedHook>,
    logger: &EngineLogger,
) -> Result<BoundHook, BindError> {
    let mut chain_walked: Vec<String> = Vec::new();
    let mut current = Some(class.to_string());

    while let Some(candidate) = current {
        if chain_walked.contains(&candidate) {
            // cyclic hierarchy, treat as exhausted
            break;
        }
        chain_walked.push(candidate.clone());

        match host.hook_method(&candidate, method, hook.clone()) {
            Ok(()) => {
                return Ok(BoundHook {
                    requested_class: class.to_string(),
                    declaring_class: candidate,
                    signature: method.clone(),
                    callback: hook,
                    retries: chain_walked.len() - 1,
                });
            }
            Err(HostError::NoSuchMethod { .. }) => {
                current = match host.superclass_of(&candidate) {
                    Ok(parent) => parent,
                    Err(_) if chain_walked.len() > 1 => None,
                    Err(_) => {
                        return Err(BindError::ClassNotFound { class: candidate });
                    }
                };
                if let Some(parent) = &current {
                    logger.log_bind_retry(&method.to_string(), parent);
                }
            }
            Err(HostError::ClassNotFound(missing)) => {
                if chain_walked.len() == 1 {
                    return Err(BindError::ClassNotFound { class: missing });
                }
                // ancestor named but not loadable; the chain ends here
                break;
            }
        }
    }

    Err(BindError::MethodNotFound {
        method: method.to_string(),
        chain_walked,
    })
}
