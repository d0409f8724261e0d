//! Path resolution: from a parsed path to a registry handle.

use std::sync::Arc;

use pathbridge_core::{BridgeError, Engine, Path, ResourceKind};

use crate::config::AutoCreatePolicy;
use crate::registry::{Handle, Registry};

pub struct Resolver {
    registry: Arc<Registry>,
    policy: AutoCreatePolicy,
}

impl Resolver {
    pub fn new(registry: Arc<Registry>, policy: AutoCreatePolicy) -> Self {
        Self { registry, policy }
    }

    /// Resolve `path` to a live handle, opening or creating it as needed.
    ///
    /// Already-registered paths resolve to the same handle without touching
    /// the engine. Otherwise the engine is asked which of the path and its
    /// ancestors exist. Missing ones are created, shortest first, only if the
    /// auto-create policy allows every one of them; a refused chain leaves
    /// the engine untouched.
    pub fn resolve(&self, path: &Path) -> Result<(Handle, ResourceKind), BridgeError> {
        let kind = ResourceKind::for_path(path)?;
        if let Some(handle) = self.registry.lookup(path) {
            return Ok((handle, kind));
        }

        // Held until the handle is registered, so no removal can interleave.
        let _tree = self.registry.tree_guard();
        let engine = self.registry.engine();

        let mut missing = Vec::new();
        for ancestor in path.ancestors() {
            if !engine.exists(&ancestor)? {
                let ancestor_kind = ResourceKind::for_path(&ancestor)?;
                missing.push((ancestor, ancestor_kind));
            }
        }
        let leaf_exists = engine.exists(path)?;
        if !leaf_exists {
            missing.push((path.clone(), kind));
        }

        if let Some((denied, _)) = missing.iter().find(|(_, kind)| !self.policy.allows(*kind)) {
            return Err(BridgeError::PathNotFound(denied.to_string()));
        }

        for (ancestor, ancestor_kind) in missing.iter().filter(|(p, _)| p != path) {
            let created = engine.create(ancestor, *ancestor_kind)?;
            engine.close(created);
        }

        let opened = if leaf_exists { engine.open(path)? } else { None };
        let engine_handle = match opened {
            Some(engine_handle) => engine_handle,
            None if self.policy.allows(kind) => engine.create(path, kind)?,
            None => return Err(BridgeError::PathNotFound(path.to_string())),
        };

        let handle = self.registry.insert(path.clone(), kind, engine_handle)?;
        tracing::trace!(%path, %handle, "resolved");
        Ok((handle, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathbridge_core::{path, Record};
    use pathbridge_engine::MemoryEngine;

    fn resolver(policy: AutoCreatePolicy) -> (Arc<MemoryEngine>, Resolver) {
        let engine = Arc::new(MemoryEngine::new());
        let registry = Arc::new(Registry::new(engine.clone()));
        (engine, Resolver::new(registry, policy))
    }

    #[test]
    fn resolve_is_idempotent() {
        let (engine, resolver) = resolver(AutoCreatePolicy::default());
        let (first, kind) = resolver.resolve(&path!("db/users")).unwrap();
        let (second, _) = resolver.resolve(&path!("db/users")).unwrap();
        assert_eq!(first, second);
        assert_eq!(kind, ResourceKind::Collection);
        assert_eq!(engine.open_handles(), 1);
    }

    #[test]
    fn creates_missing_ancestors() {
        let (engine, resolver) = resolver(AutoCreatePolicy::default());
        resolver.resolve(&path!("db/users/42")).unwrap();
        assert!(engine.exists(&path!("db")).unwrap());
        assert!(engine.exists(&path!("db/users")).unwrap());
        assert!(engine.exists(&path!("db/users/42")).unwrap());
        // Ancestors are not registered.
        assert_eq!(engine.open_handles(), 1);
    }

    #[test]
    fn missing_resources_without_auto_create() {
        let (engine, resolver) = resolver(AutoCreatePolicy::NEVER);
        assert_eq!(
            resolver.resolve(&path!("db/users")),
            Err(BridgeError::PathNotFound("db".into()))
        );

        engine.insert(path!("db"), Record::new());
        assert_eq!(
            resolver.resolve(&path!("db/users")),
            Err(BridgeError::PathNotFound("db/users".into()))
        );

        engine.insert(path!("db/users"), Record::new());
        assert!(resolver.resolve(&path!("db/users")).is_ok());
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn policy_is_per_kind() {
        let (engine, resolver) = resolver(AutoCreatePolicy {
            objects: false,
            ..AutoCreatePolicy::default()
        });
        assert!(resolver.resolve(&path!("db/users")).is_ok());
        assert_eq!(
            resolver.resolve(&path!("db/users/1")),
            Err(BridgeError::PathNotFound("db/users/1".into()))
        );
        assert!(!engine.exists(&path!("db/users/1")).unwrap());
    }

    #[test]
    fn refused_chain_creates_nothing() {
        let (engine, resolver) = resolver(AutoCreatePolicy {
            objects: false,
            ..AutoCreatePolicy::default()
        });
        assert_eq!(
            resolver.resolve(&path!("db/users/1")),
            Err(BridgeError::PathNotFound("db/users/1".into()))
        );
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.open_handles(), 0);

        engine.insert(path!("db/users/1"), Record::new());
        assert!(resolver.resolve(&path!("db/users/1")).is_ok());
        assert_eq!(engine.len(), 3);
    }

    #[test]
    fn registered_ancestor_missing_from_engine_is_recreated() {
        let (engine, resolver) = resolver(AutoCreatePolicy::default());
        let (users, _) = resolver.resolve(&path!("db/users")).unwrap();

        // Removed from the engine while its handle is still registered.
        let native = engine.open(&path!("db/users")).unwrap().unwrap();
        engine
            .invoke(native, &pathbridge_core::Command::Delete { fields: vec![] })
            .unwrap();
        engine.close(native);

        let (object, _) = resolver.resolve(&path!("db/users/5")).unwrap();
        assert_ne!(object, users);
        assert!(engine.exists(&path!("db/users")).unwrap());
        assert!(engine.exists(&path!("db/users/5")).unwrap());
    }

    #[test]
    fn too_deep_is_invalid_path() {
        let (engine, resolver) = resolver(AutoCreatePolicy::default());
        assert!(matches!(
            resolver.resolve(&path!("a/b/c/d")),
            Err(BridgeError::InvalidPath(_))
        ));
        assert!(engine.is_empty());
    }
}
