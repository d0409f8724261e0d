//! Local-disk engine.
//!
//! Every resource is a directory under the root holding a `record.json`
//! file. Children of a resource are its subdirectories:
//!
//! ```text
//! <root>/db/record.json
//! <root>/db/users/record.json
//! <root>/db/users/42/record.json
//! ```
//!
//! Paths are case-sensitive but filesystems may not be, and some normalize
//! Unicode names. A segment made only of lowercase ASCII letters, digits and
//! `_` is used as its directory name unchanged; any other segment is stored
//! as `~` followed by the lowercase hex of its UTF-8 bytes, so `db/Users`
//! lives in `db/~5573657273` and never shares a directory with `db/users`.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use pathbridge_codec::convert::{json_to_value, value_to_json};
use pathbridge_core::{
    Command, Engine, EngineError, EngineHandle, Path, Record, ResourceKind, Value,
};

use crate::record_ops;

const RECORD_FILE: &str = "record.json";
const SCRATCH_FILE: &str = "record.json.tmp";
const ENCODED_PREFIX: char = '~';

/// An engine persisting each resource as a JSON file on local disk.
pub struct LocalDiskEngine {
    root: PathBuf,
    handles: Mutex<HashMap<EngineHandle, Path>>,
    next_handle: AtomicU64,
}

impl LocalDiskEngine {
    /// Open an engine rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            EngineError::new(format!(
                "root directory ({}) could not be created: {}",
                root.display(),
                e
            ))
        })?;

        let attr = fs::metadata(&root)?;
        if attr.permissions().readonly() {
            return Err(EngineError::new(format!(
                "root directory ({}) must be writable",
                root.display()
            )));
        }

        let root = root.canonicalize()?;
        tracing::debug!(root = %root.display(), "opened local disk engine");
        Ok(Self {
            root,
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    fn dir_for(&self, path: &Path) -> PathBuf {
        let mut dir = self.root.clone();
        for segment in path.iter() {
            dir.push(&*dir_name(segment));
        }
        dir
    }

    fn record_file(&self, path: &Path) -> PathBuf {
        self.dir_for(path).join(RECORD_FILE)
    }

    fn issue_handle(&self, path: &Path) -> EngineHandle {
        let handle = EngineHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.handles.lock().insert(handle, path.clone());
        handle
    }

    fn resolve_handle(&self, handle: EngineHandle) -> Result<Path, EngineError> {
        let path = self
            .handles
            .lock()
            .get(&handle)
            .cloned()
            .ok_or_else(|| EngineError::new(format!("unknown handle {}", handle.get())))?;
        if !self.record_file(&path).is_file() {
            return Err(EngineError::deleted(&path));
        }
        Ok(path)
    }

    fn load(&self, path: &Path) -> Result<Record, EngineError> {
        let file = self.record_file(path);
        tracing::trace!(file = %file.display(), "reading record");
        let text = fs::read_to_string(&file)?;
        // A record file is created empty and filled in afterwards.
        if text.trim().is_empty() {
            return Ok(Record::new());
        }

        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            EngineError::new(format!("record for '{}' is not valid JSON: {}", path, e))
        })?;
        match json_to_value(json) {
            Value::Map(record) => Ok(record),
            _ => Err(EngineError::new(format!(
                "record for '{}' is not a JSON object",
                path
            ))),
        }
    }

    fn save(&self, path: &Path, record: &Record) -> Result<(), EngineError> {
        let dir = self.dir_for(path);
        let scratch = dir.join(SCRATCH_FILE);
        tracing::trace!(file = %scratch.display(), "writing record");

        let text = serde_json::to_string(&value_to_json(&Value::Map(record.clone())))
            .map_err(|e| {
                EngineError::new(format!("record for '{}' not serializable: {}", path, e))
            })?;
        let mut file = fs::File::create(&scratch)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        fs::rename(&scratch, dir.join(RECORD_FILE))?;
        Ok(())
    }

    /// Apply `f` to the stored record and persist the result.
    fn update(
        &self,
        path: &Path,
        f: impl FnOnce(&mut Record) -> Value,
    ) -> Result<Value, EngineError> {
        let mut record = self.load(path)?;
        let result = f(&mut record);
        self.save(path, &record)?;
        Ok(result)
    }

    /// Direct children of `path`, sorted by name.
    fn children(&self, path: &Path) -> Result<Vec<Path>, EngineError> {
        let mut children = Vec::new();
        for entry in fs::read_dir(self.dir_for(path))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            // Directories that do not name a valid segment are not resources.
            let Some(segment) = entry.file_name().to_str().and_then(segment_name) else {
                continue;
            };
            let Ok(child) = path.child(&segment) else {
                continue;
            };
            if entry.path().join(RECORD_FILE).is_file() {
                children.push(child);
            }
        }
        children.sort();
        Ok(children)
    }
}

fn is_plain(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Directory name for a path segment.
fn dir_name(segment: &str) -> Cow<'_, str> {
    if is_plain(segment) {
        return Cow::Borrowed(segment);
    }
    let mut name = String::with_capacity(1 + segment.len() * 2);
    name.push(ENCODED_PREFIX);
    for byte in segment.bytes() {
        name.push_str(&format!("{:02x}", byte));
    }
    Cow::Owned(name)
}

/// The segment a directory name stands for, if it is one `dir_name` produces.
fn segment_name(name: &str) -> Option<String> {
    let Some(hex) = name.strip_prefix(ENCODED_PREFIX) else {
        return is_plain(name).then(|| name.to_string());
    };
    if hex.is_empty() || hex.len() % 2 != 0 || hex.bytes().any(|b| b.is_ascii_uppercase()) {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    let segment = String::from_utf8(bytes).ok()?;
    // Plain segments are never encoded, so an encoded one must not be plain.
    (!is_plain(&segment)).then_some(segment)
}

impl Engine for LocalDiskEngine {
    fn exists(&self, path: &Path) -> Result<bool, EngineError> {
        Ok(self.record_file(path).is_file())
    }

    fn open(&self, path: &Path) -> Result<Option<EngineHandle>, EngineError> {
        if self.exists(path)? {
            Ok(Some(self.issue_handle(path)))
        } else {
            Ok(None)
        }
    }

    fn create(&self, path: &Path, kind: ResourceKind) -> Result<EngineHandle, EngineError> {
        fs::create_dir_all(self.dir_for(path))?;
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.record_file(path))
        {
            Ok(mut file) => {
                tracing::debug!(%path, %kind, "creating resource");
                file.write_all(b"{}")?;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self.issue_handle(path))
    }

    fn invoke(&self, handle: EngineHandle, command: &Command) -> Result<Value, EngineError> {
        let path = self.resolve_handle(handle)?;
        match command {
            Command::Read { fields } => Ok(record_ops::read(&self.load(&path)?, fields)),
            Command::Write { assignments } => {
                self.update(&path, |record| record_ops::write(record, assignments))
            }
            Command::Put { record: fields } => {
                self.update(&path, |record| record_ops::put(record, fields))
            }
            Command::Delete { fields } if fields.is_empty() => {
                fs::remove_dir_all(self.dir_for(&path))?;
                tracing::debug!(%path, "deleted resource subtree");
                Ok(record_ops::ack())
            }
            Command::Delete { fields } => {
                self.update(&path, |record| record_ops::remove_fields(record, fields))
            }
            Command::List => Ok(Value::Array(
                self.children(&path)?
                    .iter()
                    .filter_map(|child| child.name().map(Value::from))
                    .collect(),
            )),
            Command::Count => Ok(Value::from(self.children(&path)?.len())),
            Command::Query { filter } => {
                let mut matched = Record::new();
                for child in self.children(&path)? {
                    let record = self.load(&child)?;
                    if record_ops::matches(&record, filter) {
                        if let Some(name) = child.name() {
                            matched.insert(name.to_string(), Value::Map(record));
                        }
                    }
                }
                Ok(Value::Map(matched))
            }
        }
    }

    fn close(&self, handle: EngineHandle) {
        self.handles.lock().remove(&handle);
    }
}
