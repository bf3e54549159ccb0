//! Shared host state and the injected handle middleware closures capture.

use std::sync::{Arc, Mutex, MutexGuard};

use morphgate_core::error::{MorphGateError, Result};

use crate::config::TransformSettings;
use crate::registry::Registry;
use crate::transform::Transform;

/// Cheaply cloneable view of the host surface a transform needs at request
/// time: the settings plus the transform step itself.
///
/// Captured by value in every generated middleware closure. Holds no path
/// back to the registry, so instrumented routes cannot form reference cycles.
#[derive(Clone)]
pub struct HostHandle {
    settings: Arc<TransformSettings>,
    transformer: Arc<dyn Transform>,
}

impl HostHandle {
    pub fn new(settings: Arc<TransformSettings>, transformer: Arc<dyn Transform>) -> Self {
        Self {
            settings,
            transformer,
        }
    }

    pub fn settings(&self) -> &TransformSettings {
        &self.settings
    }

    pub fn transformer(&self) -> Arc<dyn Transform> {
        Arc::clone(&self.transformer)
    }
}

/// Clone-able host state: the handle plus the route registry.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

struct HostInner {
    handle: HostHandle,
    registry: Mutex<Registry>,
}

impl Host {
    pub fn new(
        settings: TransformSettings,
        transformer: Arc<dyn Transform>,
        registry: Registry,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                handle: HostHandle::new(Arc::new(settings), transformer),
                registry: Mutex::new(registry),
            }),
        }
    }

    pub fn handle(&self) -> HostHandle {
        self.inner.handle.clone()
    }

    pub fn settings(&self) -> &TransformSettings {
        self.inner.handle.settings()
    }

    /// Poisoned lock means a panic elsewhere; surface as error, never panic.
    pub fn lock_registry(&self) -> Result<MutexGuard<'_, Registry>> {
        self.inner
            .registry
            .lock()
            .map_err(|_| MorphGateError::Internal("registry lock poisoned".into()))
    }

    pub fn with_registry<T>(&self, f: impl FnOnce(&Registry) -> T) -> Result<T> {
        Ok(f(&*self.lock_registry()?))
    }
}
