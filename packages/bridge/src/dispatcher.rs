//! One `execute` call from wire text to wire text.

use std::fmt;
use std::sync::Arc;

use pathbridge_codec::{decode_command, encode_outcome, Outcome};
use pathbridge_core::{BridgeError, Command, Engine, EngineError, Path, ResourceKind, Value};

use crate::config::AutoCreatePolicy;
use crate::registry::{Registry, Resource};
use crate::resolver::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resolving,
    Validating,
    Executing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Resolving => "resolving",
            Phase::Validating => "validating",
            Phase::Executing => "executing",
        };
        f.write_str(name)
    }
}

pub struct Dispatcher {
    registry: Arc<Registry>,
    resolver: Resolver,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn Engine>, policy: AutoCreatePolicy) -> Self {
        let registry = Arc::new(Registry::new(engine));
        Self {
            resolver: Resolver::new(Arc::clone(&registry), policy),
            registry,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch and encode. Never fails; errors are encoded.
    pub fn execute(&self, path: &str, command: &str) -> String {
        encode_outcome(&self.dispatch(path, command))
    }

    /// Dispatch a command to the resource at `path`.
    ///
    /// Path and command are both decoded before anything is resolved, so a
    /// malformed call has no side effects.
    pub fn dispatch(&self, path: &str, command: &str) -> Outcome {
        let parsed = Path::parse(path).map_err(|e| failed(Phase::Resolving, e.into()))?;
        ResourceKind::for_path(&parsed).map_err(|e| failed(Phase::Resolving, e.into()))?;
        let command = decode_command(command).map_err(|e| failed(Phase::Resolving, e))?;

        let (handle, kind) = self
            .resolver
            .resolve(&parsed)
            .map_err(|e| failed(Phase::Resolving, e))?;

        let verb = command.verb();
        if !kind.supports(verb) {
            return Err(failed(
                Phase::Validating,
                BridgeError::UnsupportedCommand(format!("{} does not support '{}'", kind, verb)),
            ));
        }

        let executed = if command.removes_resource() {
            self.registry
                .remove(handle, |resource| self.invoke(resource, &command))
        } else {
            self.registry
                .acquire(handle, command.access(), |resource| {
                    self.invoke(resource, &command)
                })
        }
        .map_err(|e| failed(Phase::Executing, e))?;

        let value = executed.map_err(|e| {
            if e.is_deleted() {
                // Removed outside the bridge; the next call resolves afresh.
                self.registry.close_handle(handle);
            }
            failed(Phase::Executing, e.into())
        })?;

        Ok(value)
    }
}

impl Dispatcher {
    fn invoke(&self, resource: &Resource, command: &Command) -> Result<Value, EngineError> {
        tracing::trace!(path = %resource.path(), verb = %command.verb(), "invoking");
        self.registry
            .engine()
            .invoke(resource.engine_handle(), command)
    }
}

fn failed(phase: Phase, error: BridgeError) -> BridgeError {
    tracing::debug!(%phase, %error, "dispatch failed");
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathbridge_codec::decode_outcome;
    use pathbridge_core::{path, Value};
    use pathbridge_engine::{LocalDiskEngine, MemoryEngine};

    fn dispatcher() -> (Arc<MemoryEngine>, Dispatcher) {
        let engine = Arc::new(MemoryEngine::new());
        let dispatcher = Dispatcher::new(engine.clone(), AutoCreatePolicy::default());
        (engine, dispatcher)
    }

    #[test]
    fn write_then_read() {
        let (_, dispatcher) = dispatcher();
        assert_eq!(dispatcher.execute("db/users", "write:name=alice"), "ok");
        assert_eq!(dispatcher.execute("db/users", "read:name"), "alice");
        assert_eq!(
            dispatcher.execute("db/users", "read:missing"),
            "!json:null"
        );
    }

    #[test]
    fn structured_results_decode() {
        let (_, dispatcher) = dispatcher();
        dispatcher.execute("db/users/1", r#"put:{"name":"alice","age":30}"#);
        dispatcher.execute("db/users/2", "write:name=bob");

        let count = decode_outcome(&dispatcher.execute("db/users", "count")).unwrap();
        assert_eq!(count, Ok(Value::Integer(2)));

        let list = decode_outcome(&dispatcher.execute("db/users", "list")).unwrap();
        assert_eq!(list, Ok(Value::from(vec!["1", "2"])));

        let query = dispatcher.execute("db/users", "query:age=30");
        assert_eq!(query, r#"!json:{"1":{"age":30,"name":"alice"}}"#);
    }

    #[test]
    fn malformed_input_has_no_side_effects() {
        let (engine, dispatcher) = dispatcher();
        assert!(dispatcher
            .execute("db//users", "read")
            .starts_with("!err:InvalidPath:"));
        assert!(dispatcher
            .execute("db/users", "write:")
            .starts_with("!err:MalformedCommand:"));
        assert!(dispatcher
            .execute("db/users", "bogus")
            .starts_with("!err:UnsupportedCommand:"));
        assert!(engine.is_empty());
        assert!(dispatcher.registry().is_empty());
    }

    #[test]
    fn path_errors_win_over_command_errors() {
        let (_, dispatcher) = dispatcher();
        assert!(dispatcher
            .execute("", "WRITE")
            .starts_with("!err:InvalidPath:"));
        assert!(dispatcher
            .execute("a/b/c/d", "bogus")
            .starts_with("!err:InvalidPath:"));
    }

    #[test]
    fn capability_tables_are_enforced() {
        let (_, dispatcher) = dispatcher();
        assert_eq!(
            dispatcher.dispatch("db/users/1", "list"),
            Err(BridgeError::UnsupportedCommand(
                "object does not support 'list'".into()
            ))
        );
        assert!(matches!(
            dispatcher.dispatch("db", "query:name=alice"),
            Err(BridgeError::UnsupportedCommand(_))
        ));
        assert!(dispatcher.dispatch("db/users", "query:name=alice").is_ok());
    }

    #[test]
    fn too_deep_paths_are_invalid() {
        let (_, dispatcher) = dispatcher();
        assert!(matches!(
            dispatcher.dispatch("a/b/c/d", "read"),
            Err(BridgeError::InvalidPath(_))
        ));
    }

    #[test]
    fn delete_closes_descendant_handles() {
        let (engine, dispatcher) = dispatcher();
        dispatcher.execute("db/users/1", "write:name=alice");
        dispatcher.execute("db/users", "write:label=people");
        dispatcher.execute("db/other", "write:label=other");
        assert_eq!(dispatcher.registry().len(), 3);

        assert_eq!(dispatcher.execute("db/users", "delete"), "ok");
        assert_eq!(dispatcher.registry().len(), 1);
        assert!(dispatcher.registry().lookup(&path!("db/other")).is_some());
        assert!(!engine.exists(&path!("db/users/1")).unwrap());

        // Re-resolving recreates an empty resource.
        assert_eq!(dispatcher.execute("db/users/1", "read"), "!json:{}");
    }

    #[test]
    fn delete_fields_keeps_resource() {
        let (_, dispatcher) = dispatcher();
        dispatcher.execute("db/users/1", "write:name=alice,role=admin");
        assert_eq!(
            dispatcher.execute("db/users/1", "delete:role,missing"),
            "!json:1"
        );
        assert_eq!(
            dispatcher.execute("db/users/1", "read"),
            r#"!json:{"name":"alice"}"#
        );
        assert_eq!(dispatcher.registry().len(), 1);
    }

    #[test]
    fn resource_deleted_outside_the_bridge_is_reopened() {
        let (engine, dispatcher) = dispatcher();
        dispatcher.execute("db/users", "write:label=people");
        // Delete behind the registry's back.
        let native = engine.open(&path!("db/users")).unwrap().unwrap();
        engine
            .invoke(native, &Command::Delete { fields: vec![] })
            .unwrap();

        assert_eq!(
            dispatcher.execute("db/users", "read"),
            "!err:ResourceClosed:resource 'db/users' was deleted"
        );
        assert!(dispatcher.registry().is_empty());

        assert_eq!(dispatcher.execute("db/users", "read"), "!json:{}");
        assert!(engine.exists(&path!("db/users")).unwrap());
        assert_eq!(dispatcher.registry().len(), 1);
    }

    #[test]
    fn engine_failures_become_execution_errors() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(LocalDiskEngine::new(dir.path()).unwrap());
        let dispatcher = Dispatcher::new(engine, AutoCreatePolicy::default());
        assert_eq!(dispatcher.execute("db", "write:owner=alice"), "ok");

        std::fs::write(dir.path().join("db/record.json"), "[1, 2]").unwrap();
        assert_eq!(
            dispatcher.execute("db", "read"),
            "!err:ExecutionError:record for 'db' is not a JSON object"
        );
        // The resource still exists, so its handle stays registered.
        assert_eq!(dispatcher.registry().len(), 1);
    }
}
