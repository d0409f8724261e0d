//! A path-addressed, synchronous command bridge.
//!
//! A host calls [`Bridge::execute`] with a resource path such as
//! `db/users/42` and a command such as `write:name=alice`, and gets back a
//! single encoded result string. Internally each call is:
//!
//! 1. decoded (path and command, no side effects),
//! 2. resolved to a registry handle, opening or creating the resource,
//! 3. checked against the resource kind's capability table,
//! 4. executed on the engine under the handle's reader/writer lock,
//! 5. encoded.
//!
//! ```rust
//! use pathbridge::{Bridge, BridgeConfig};
//!
//! let bridge = Bridge::new(BridgeConfig::default());
//! bridge.start().unwrap();
//!
//! bridge.execute("db/users/1", r#"put:{"name":"alice","age":30}"#);
//! assert_eq!(bridge.execute("db/users/1", "read:name"), "alice");
//! assert_eq!(bridge.execute("db/users", "count"), "!json:1");
//! assert!(bridge.execute("db/users", "bogus").starts_with("!err:UnsupportedCommand"));
//! ```

mod config;
mod dispatcher;
mod registry;
mod resolver;
mod service;

pub use config::{AutoCreatePolicy, BridgeConfig, ConfigError, EngineConfig};
pub use dispatcher::Dispatcher;
pub use registry::{Handle, Registry, Resource};
pub use resolver::Resolver;
pub use service::{Bridge, Service, ServiceState};

pub use pathbridge_codec::convert::value_to_json;
pub use pathbridge_codec::{decode_outcome, encode_command, Outcome};
pub use pathbridge_core::{
    Access, BridgeError, Command, Engine, EngineError, EngineHandle, ErrorKind, Path, Record,
    ResourceKind, Value,
};
pub use pathbridge_engine::{LocalDiskEngine, MemoryEngine};
