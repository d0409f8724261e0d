//! In-memory engine.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pathbridge_core::{
    Command, Engine, EngineError, EngineHandle, Path, Record, ResourceKind, Value,
};

use crate::record_ops;

struct Node {
    record: RwLock<Record>,
    removed: AtomicBool,
}

impl Node {
    fn new(record: Record) -> Arc<Self> {
        Arc::new(Self {
            record: RwLock::new(record),
            removed: AtomicBool::new(false),
        })
    }
}

#[derive(Clone)]
struct OpenResource {
    path: Path,
    node: Arc<Node>,
}

/// An engine that keeps every resource in process memory.
///
/// Nothing survives the engine being dropped.
///
/// # Example
///
/// ```rust
/// use pathbridge_engine::MemoryEngine;
/// use pathbridge_core::{path, Command, Engine, ResourceKind, Value};
///
/// let engine = MemoryEngine::new();
/// let users = engine.create(&path!("db/users"), ResourceKind::Collection).unwrap();
///
/// engine
///     .invoke(users, &Command::Write { assignments: vec![("name".into(), "alice".into())] })
///     .unwrap();
/// let name = engine
///     .invoke(users, &Command::Read { fields: vec!["name".into()] })
///     .unwrap();
/// assert_eq!(name, Value::from("alice"));
/// ```
pub struct MemoryEngine {
    nodes: RwLock<BTreeMap<Path, Arc<Node>>>,
    handles: Mutex<HashMap<EngineHandle, OpenResource>>,
    next_handle: AtomicU64,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Store a resource directly, replacing any existing record.
    pub fn insert(&self, path: Path, record: Record) {
        let mut nodes = self.nodes.write();
        match nodes.get(&path) {
            Some(node) => *node.record.write() = record,
            None => {
                nodes.insert(path, Node::new(record));
            }
        }
    }

    /// Number of resources stored.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    /// Number of handles not yet closed.
    pub fn open_handles(&self) -> usize {
        self.handles.lock().len()
    }

    fn issue_handle(&self, path: &Path, node: Arc<Node>) -> EngineHandle {
        let handle = EngineHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.handles.lock().insert(
            handle,
            OpenResource {
                path: path.clone(),
                node,
            },
        );
        handle
    }

    fn resolve_handle(&self, handle: EngineHandle) -> Result<OpenResource, EngineError> {
        let open = self
            .handles
            .lock()
            .get(&handle)
            .cloned()
            .ok_or_else(|| EngineError::new(format!("unknown handle {}", handle.get())))?;
        if open.node.removed.load(Ordering::Acquire) {
            return Err(EngineError::deleted(&open.path));
        }
        Ok(open)
    }

    /// Direct children of `path`, in path order.
    fn children(&self, path: &Path) -> Vec<(String, Arc<Node>)> {
        let nodes = self.nodes.read();
        nodes
            .range((Bound::Excluded(path.clone()), Bound::Unbounded))
            .take_while(|(candidate, _)| candidate.has_prefix(path))
            .filter(|(candidate, _)| candidate.len() == path.len() + 1)
            .filter_map(|(candidate, node)| {
                candidate
                    .name()
                    .map(|name| (name.to_string(), Arc::clone(node)))
            })
            .collect()
    }

    fn remove_subtree(&self, path: &Path) -> usize {
        let mut nodes = self.nodes.write();
        let doomed: Vec<Path> = nodes
            .range(path.clone()..)
            .take_while(|(candidate, _)| candidate.has_prefix(path))
            .map(|(candidate, _)| candidate.clone())
            .collect();
        for candidate in &doomed {
            if let Some(node) = nodes.remove(candidate) {
                node.removed.store(true, Ordering::Release);
            }
        }
        doomed.len()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MemoryEngine {
    fn exists(&self, path: &Path) -> Result<bool, EngineError> {
        Ok(self.nodes.read().contains_key(path))
    }

    fn open(&self, path: &Path) -> Result<Option<EngineHandle>, EngineError> {
        let node = self.nodes.read().get(path).cloned();
        Ok(node.map(|node| self.issue_handle(path, node)))
    }

    fn create(&self, path: &Path, kind: ResourceKind) -> Result<EngineHandle, EngineError> {
        let node = {
            let mut nodes = self.nodes.write();
            Arc::clone(nodes.entry(path.clone()).or_insert_with(|| {
                tracing::debug!(%path, %kind, "creating resource");
                Node::new(Record::new())
            }))
        };
        Ok(self.issue_handle(path, node))
    }

    fn invoke(&self, handle: EngineHandle, command: &Command) -> Result<Value, EngineError> {
        let OpenResource { path, node } = self.resolve_handle(handle)?;
        match command {
            Command::Read { fields } => Ok(record_ops::read(&node.record.read(), fields)),
            Command::Write { assignments } => {
                Ok(record_ops::write(&mut node.record.write(), assignments))
            }
            Command::Put { record } => Ok(record_ops::put(&mut node.record.write(), record)),
            Command::Delete { fields } if fields.is_empty() => {
                let removed = self.remove_subtree(&path);
                tracing::debug!(%path, removed, "deleted resource subtree");
                Ok(record_ops::ack())
            }
            Command::Delete { fields } => {
                Ok(record_ops::remove_fields(&mut node.record.write(), fields))
            }
            Command::List => Ok(Value::Array(
                self.children(&path)
                    .into_iter()
                    .map(|(name, _)| Value::String(name))
                    .collect(),
            )),
            Command::Count => Ok(Value::from(self.children(&path).len())),
            Command::Query { filter } => Ok(Value::Map(
                self.children(&path)
                    .into_iter()
                    .filter_map(|(name, child)| {
                        let record = child.record.read();
                        record_ops::matches(&record, filter)
                            .then(|| (name, Value::Map(record.clone())))
                    })
                    .collect(),
            )),
        }
    }

    fn close(&self, handle: EngineHandle) {
        self.handles.lock().remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection_literals::btree;
    use pathbridge_core::path;

    fn write(name: &str, value: &str) -> Command {
        Command::Write {
            assignments: vec![(name.into(), value.into())],
        }
    }

    #[test]
    fn open_missing_returns_none() {
        let engine = MemoryEngine::new();
        assert_eq!(engine.open(&path!("db")).unwrap(), None);
        assert!(!engine.exists(&path!("db")).unwrap());
    }

    #[test]
    fn create_is_idempotent() {
        let engine = MemoryEngine::new();
        let first = engine.create(&path!("db"), ResourceKind::Database).unwrap();
        engine.invoke(first, &write("owner", "alice")).unwrap();

        let second = engine.create(&path!("db"), ResourceKind::Database).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            engine
                .invoke(second, &Command::Read { fields: vec!["owner".into()] })
                .unwrap(),
            Value::from("alice")
        );
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn list_count_and_query_children() {
        let engine = MemoryEngine::new();
        engine.insert(path!("db"), Record::new());
        engine.insert(path!("db/users"), Record::new());
        engine.insert(
            path!("db/users/1"),
            btree! { "name".into() => Value::from("alice") },
        );
        engine.insert(
            path!("db/users/2"),
            btree! { "name".into() => Value::from("bob") },
        );
        engine.insert(path!("db/usersx"), Record::new());

        let users = engine.open(&path!("db/users")).unwrap().unwrap();
        assert_eq!(
            engine.invoke(users, &Command::List).unwrap(),
            Value::from(vec!["1", "2"])
        );
        assert_eq!(
            engine.invoke(users, &Command::Count).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            engine
                .invoke(
                    users,
                    &Command::Query {
                        filter: vec![("name".into(), "bob".into())]
                    }
                )
                .unwrap(),
            Value::Map(btree! {
                "2".into() => Value::Map(btree! { "name".into() => Value::from("bob") }),
            })
        );

        let db = engine.open(&path!("db")).unwrap().unwrap();
        assert_eq!(
            engine.invoke(db, &Command::List).unwrap(),
            Value::from(vec!["users", "usersx"])
        );
    }

    #[test]
    fn delete_removes_subtree_and_invalidates_handles() {
        let engine = MemoryEngine::new();
        let users = engine
            .create(&path!("db/users"), ResourceKind::Collection)
            .unwrap();
        let alice = engine
            .create(&path!("db/users/1"), ResourceKind::Object)
            .unwrap();
        engine.insert(path!("db/other"), Record::new());

        assert_eq!(
            engine
                .invoke(users, &Command::Delete { fields: vec![] })
                .unwrap(),
            Value::from("ok")
        );
        assert!(!engine.exists(&path!("db/users")).unwrap());
        assert!(!engine.exists(&path!("db/users/1")).unwrap());
        assert!(engine.exists(&path!("db/other")).unwrap());

        let err = engine
            .invoke(alice, &Command::Read { fields: vec![] })
            .unwrap_err();
        assert!(err.is_deleted());
        assert_eq!(err.message(), "resource 'db/users/1' was deleted");
    }

    #[test]
    fn closed_handles_are_unknown() {
        let engine = MemoryEngine::new();
        let db = engine.create(&path!("db"), ResourceKind::Database).unwrap();
        assert_eq!(engine.open_handles(), 1);
        engine.close(db);
        assert_eq!(engine.open_handles(), 0);
        let err = engine.invoke(db, &Command::List).unwrap_err();
        assert!(!err.is_deleted());
    }
}
