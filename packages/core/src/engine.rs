//! The storage engine contract.
//!
//! The bridge never touches resource state directly. It opens resources
//! through an [`Engine`], invokes decoded commands against the returned
//! [`EngineHandle`], and closes the handle when the registry lets go of it.

use std::sync::Arc;

use crate::{Command, EngineError, Path, ResourceKind, Value};

/// An engine-issued handle to an open resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineHandle(u64);

impl EngineHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A store of named, stateful resources.
///
/// Implementations must be callable from many threads at once. The bridge
/// guarantees that mutating commands on one handle never overlap with any
/// other command on that handle; commands on different handles may run
/// concurrently.
///
/// # Object Safety
///
/// This trait is object-safe: the bridge holds an `Arc<dyn Engine>`.
pub trait Engine: Send + Sync {
    /// Whether a resource exists at `path`.
    fn exists(&self, path: &Path) -> Result<bool, EngineError>;

    /// Open an existing resource.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Nothing exists at the path.
    /// * `Ok(Some(handle))` - The resource is open.
    fn open(&self, path: &Path) -> Result<Option<EngineHandle>, EngineError>;

    /// Open a resource, creating an empty one first if it is absent.
    ///
    /// Must be idempotent: concurrent calls for the same path create the
    /// resource at most once.
    fn create(&self, path: &Path, kind: ResourceKind) -> Result<EngineHandle, EngineError>;

    /// Execute a command against an open resource.
    fn invoke(&self, handle: EngineHandle, command: &Command) -> Result<Value, EngineError>;

    /// Release a handle. Unknown handles are ignored.
    fn close(&self, handle: EngineHandle);
}

impl<T: Engine + ?Sized> Engine for Arc<T> {
    fn exists(&self, path: &Path) -> Result<bool, EngineError> {
        self.as_ref().exists(path)
    }

    fn open(&self, path: &Path) -> Result<Option<EngineHandle>, EngineError> {
        self.as_ref().open(path)
    }

    fn create(&self, path: &Path, kind: ResourceKind) -> Result<EngineHandle, EngineError> {
        self.as_ref().create(path, kind)
    }

    fn invoke(&self, handle: EngineHandle, command: &Command) -> Result<Value, EngineError> {
        self.as_ref().invoke(handle, command)
    }

    fn close(&self, handle: EngineHandle) {
        self.as_ref().close(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Engine that only knows which paths exist.
    struct PresenceEngine {
        paths: Mutex<HashSet<Path>>,
    }

    impl Engine for PresenceEngine {
        fn exists(&self, path: &Path) -> Result<bool, EngineError> {
            Ok(self.paths.lock().unwrap().contains(path))
        }

        fn open(&self, path: &Path) -> Result<Option<EngineHandle>, EngineError> {
            Ok(self
                .exists(path)?
                .then(|| EngineHandle::new(path.len() as u64)))
        }

        fn create(&self, path: &Path, _kind: ResourceKind) -> Result<EngineHandle, EngineError> {
            self.paths.lock().unwrap().insert(path.clone());
            Ok(EngineHandle::new(path.len() as u64))
        }

        fn invoke(&self, _handle: EngineHandle, command: &Command) -> Result<Value, EngineError> {
            Err(EngineError::new(format!("{} not implemented", command.verb())))
        }

        fn close(&self, _handle: EngineHandle) {}
    }

    #[test]
    fn object_safety_works() {
        let engine: Arc<dyn Engine> = Arc::new(PresenceEngine {
            paths: Mutex::new(HashSet::new()),
        });

        assert_eq!(engine.open(&path!("db")).unwrap(), None);
        let handle = engine.create(&path!("db"), ResourceKind::Database).unwrap();
        assert_eq!(engine.open(&path!("db")).unwrap(), Some(handle));
        assert!(engine.exists(&path!("db")).unwrap());

        let err = engine.invoke(handle, &Command::List).unwrap_err();
        assert_eq!(err.message(), "list not implemented");
    }
}
