//! # pathbridge-repl
//!
//! An interactive host for a pathbridge [`Bridge`](pathbridge::Bridge).
//!
//! ## Usage
//!
//! ```bash
//! # In-memory engine
//! pathbridge
//!
//! # Persist resources under a directory
//! pathbridge --data-dir ~/pathbridge-data
//!
//! # Inside the REPL:
//! > start
//! > db/users write:name=alice
//! > db/users read:name
//! > db/users/1 put:{"age": 30}
//! > db/users count
//! > stop
//! ```

pub mod commands;
pub mod host;
pub mod io;
pub mod repl;

pub use repl::{run, ReplCore};
