//! Live resource handles.
//!
//! The registry maps resolved paths to [`Handle`]s. Handles index an arena
//! of slots; every slot carries a generation that is bumped when the slot is
//! freed, so a handle outliving its resource can never reach whatever reuses
//! the slot.
//!
//! Locking:
//! - the table lock guards slot and path bookkeeping only, and is never held
//!   across an engine call or a wait on a resource;
//! - each resource has its own reader/writer lock, taken by [`Registry::acquire`];
//! - the tree lock orders resolves that may create resources against
//!   whole-resource removals. Resolves share it, [`Registry::remove`] holds it
//!   exclusively, and it is always taken before any resource lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use pathbridge_core::{Access, BridgeError, Engine, EngineHandle, Path, ResourceKind};

/// A registry handle: arena index plus the generation it was issued at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// An open resource, handed to the closure passed to [`Registry::acquire`].
pub struct Resource {
    path: Path,
    kind: ResourceKind,
    engine_handle: EngineHandle,
    open: RwLock<bool>,
}

impl Resource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn engine_handle(&self) -> EngineHandle {
        self.engine_handle
    }
}

struct Slot {
    generation: u32,
    resource: Option<Arc<Resource>>,
}

#[derive(Default)]
struct Table {
    slots: Vec<Slot>,
    free: Vec<u32>,
    by_path: HashMap<Path, Handle>,
    shut: bool,
}

impl Table {
    fn get(&self, handle: Handle) -> Option<Arc<Resource>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.resource.clone())
    }

    fn allocate(&mut self, resource: Arc<Resource>) -> Handle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.resource = Some(resource);
            return Handle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            resource: Some(resource),
        });
        Handle {
            index,
            generation: 0,
        }
    }

    /// Release `handle` only if it is still the one registered for its path.
    fn release_handle(&mut self, handle: Handle) -> Option<Arc<Resource>> {
        let path = self.get(handle)?.path.clone();
        if self.by_path.get(&path) != Some(&handle) {
            return None;
        }
        self.release(&path)
    }

    fn release(&mut self, path: &Path) -> Option<Arc<Resource>> {
        let handle = self.by_path.remove(path)?;
        let slot = self.slots.get_mut(handle.index as usize)?;
        let resource = slot.resource.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        resource
    }
}

enum Registration {
    Inserted(Handle),
    Existing(Handle),
}

pub struct Registry {
    engine: Arc<dyn Engine>,
    table: RwLock<Table>,
    tree: RwLock<()>,
}

impl Registry {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            table: RwLock::new(Table::default()),
            tree: RwLock::new(()),
        }
    }

    /// Shared hold on the resource tree. While any guard is alive no
    /// [`Registry::remove`] can run, so resources checked or created under it
    /// stay in place until their handles are registered.
    pub fn tree_guard(&self) -> RwLockReadGuard<'_, ()> {
        self.tree.read()
    }

    pub fn engine(&self) -> &dyn Engine {
        self.engine.as_ref()
    }

    pub fn lookup(&self, path: &Path) -> Option<Handle> {
        self.table.read().by_path.get(path).copied()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.table.read().by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`Registry::close_all`] has run.
    pub fn is_shut(&self) -> bool {
        self.table.read().shut
    }

    /// Register an open engine handle for `path`.
    ///
    /// If another caller registered `path` first, its handle is returned and
    /// `engine_handle` is closed. After [`Registry::close_all`] nothing can be
    /// registered.
    pub fn insert(
        &self,
        path: Path,
        kind: ResourceKind,
        engine_handle: EngineHandle,
    ) -> Result<Handle, BridgeError> {
        let registration = {
            let mut table = self.table.write();
            if table.shut {
                None
            } else if let Some(existing) = table.by_path.get(&path) {
                Some(Registration::Existing(*existing))
            } else {
                let handle = table.allocate(Arc::new(Resource {
                    path: path.clone(),
                    kind,
                    engine_handle,
                    open: RwLock::new(true),
                }));
                table.by_path.insert(path.clone(), handle);
                Some(Registration::Inserted(handle))
            }
        };

        match registration {
            Some(Registration::Inserted(handle)) => {
                tracing::debug!(%path, %kind, %handle, "registered resource");
                Ok(handle)
            }
            Some(Registration::Existing(handle)) => {
                tracing::debug!(%path, %handle, "resource already registered");
                self.engine.close(engine_handle);
                Ok(handle)
            }
            None => {
                self.engine.close(engine_handle);
                Err(BridgeError::ServiceUnavailable)
            }
        }
    }

    /// Run `f` against the resource behind `handle`.
    ///
    /// `Access::Read` shares the resource with other readers; `Access::Write`
    /// excludes everyone else. The lock is released when `f` returns. A
    /// handle whose resource was closed, before or while waiting for the
    /// lock, yields `ResourceClosed`.
    pub fn acquire<R>(
        &self,
        handle: Handle,
        access: Access,
        f: impl FnOnce(&Resource) -> R,
    ) -> Result<R, BridgeError> {
        let resource = self.resource(handle)?;
        match access {
            Access::Read => {
                let open = resource.open.read();
                if !*open {
                    return Err(closed(&resource));
                }
                Ok(f(&resource))
            }
            Access::Write => {
                let open = resource.open.write();
                if !*open {
                    return Err(closed(&resource));
                }
                Ok(f(&resource))
            }
        }
    }

    /// Run `f`, which removes the resource behind `handle` and everything
    /// below it, with exclusive access to the whole tree.
    ///
    /// Handles below the resource are closed before `f` runs. When `f`
    /// succeeds the resource's own handle is closed before its lock is
    /// released, so nobody reaches removed state through the registry, and
    /// the next resolve of any affected path starts from the engine.
    pub fn remove<T, E>(
        &self,
        handle: Handle,
        f: impl FnOnce(&Resource) -> Result<T, E>,
    ) -> Result<Result<T, E>, BridgeError> {
        let _tree = self.tree.write();
        let resource = self.resource(handle)?;
        let mut open = resource.open.write();
        if !*open {
            return Err(closed(&resource));
        }

        let below = self.close_below(&resource.path);
        let result = f(&resource);
        if result.is_ok() {
            *open = false;
            self.table.write().release_handle(handle);
            self.engine.close(resource.engine_handle);
            tracing::debug!(path = %resource.path, below, "removed resource");
        }
        Ok(result)
    }

    /// Close `handle` if it is still registered. A handle that was already
    /// replaced for its path leaves the replacement alone.
    pub fn close_handle(&self, handle: Handle) -> bool {
        let released = self.table.write().release_handle(handle);
        match released {
            Some(resource) => {
                self.shut_down(&resource);
                true
            }
            None => false,
        }
    }

    fn resource(&self, handle: Handle) -> Result<Arc<Resource>, BridgeError> {
        self.table
            .read()
            .get(handle)
            .ok_or_else(|| BridgeError::ResourceClosed(format!("stale handle {}", handle)))
    }

    /// Close the handle registered for `path`, if any.
    pub fn close(&self, path: &Path) -> bool {
        let released = self.table.write().release(path);
        match released {
            Some(resource) => {
                self.shut_down(&resource);
                true
            }
            None => false,
        }
    }

    /// Close every handle strictly below `path`. Returns how many were closed.
    fn close_below(&self, path: &Path) -> usize {
        let released: Vec<Arc<Resource>> = {
            let mut table = self.table.write();
            let doomed: Vec<Path> = table
                .by_path
                .keys()
                .filter(|candidate| *candidate != path && candidate.has_prefix(path))
                .cloned()
                .collect();
            doomed
                .iter()
                .filter_map(|candidate| table.release(candidate))
                .collect()
        };

        for resource in &released {
            self.shut_down(resource);
        }
        released.len()
    }

    /// Close every handle and refuse further registrations.
    pub fn close_all(&self) -> usize {
        let released: Vec<Arc<Resource>> = {
            let mut table = self.table.write();
            table.shut = true;
            let all: Vec<Path> = table.by_path.keys().cloned().collect();
            all.iter()
                .filter_map(|candidate| table.release(candidate))
                .collect()
        };

        for resource in &released {
            self.shut_down(resource);
        }
        tracing::debug!(closed = released.len(), "closed all resources");
        released.len()
    }

    /// Wait out in-flight users, then close the engine handle exactly once.
    fn shut_down(&self, resource: &Resource) {
        let mut open = resource.open.write();
        if *open {
            *open = false;
            self.engine.close(resource.engine_handle);
            tracing::debug!(path = %resource.path, "closed resource");
        }
    }
}

fn closed(resource: &Resource) -> BridgeError {
    BridgeError::ResourceClosed(resource.path.to_string())
}
