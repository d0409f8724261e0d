//! Core pathbridge types.
//!
//! This layer defines what the rest of the bridge talks about:
//! - `Path`: Validated, canonical resource address
//! - `Value` / `Record`: Resource state and structured payloads
//! - `Command` / `Verb`: The closed command vocabulary
//! - `ResourceKind`: Depth-derived kinds and their capability tables
//! - `BridgeError` / `EngineError`: The error taxonomy
//! - `Engine`: The contract a storage engine fulfils
//!
//! # Example
//!
//! ```rust
//! use pathbridge_core::{path, ResourceKind, Verb};
//!
//! let users = path!("db/users");
//! let kind = ResourceKind::for_path(&users).unwrap();
//! assert!(kind.supports(Verb::Query));
//! ```

mod command;
mod engine;
mod error;
mod kind;
mod path;
mod value;

pub use command::{Access, Command, Verb};
pub use engine::{Engine, EngineHandle};
pub use error::{BridgeError, EngineError, ErrorKind};
pub use kind::ResourceKind;
pub use path::{Path, PathError, DELIMITER};
pub use value::{Record, Value};
