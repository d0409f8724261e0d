//! The pathbridge wire codec.
//!
//! Commands arrive as text and are decoded once into a
//! [`pathbridge_core::Command`]; outcomes leave as text. Both directions are
//! pure functions.
//!
//! ```rust
//! use pathbridge_codec::{decode_outcome, encode_outcome};
//! use pathbridge_core::{BridgeError, Value};
//!
//! assert_eq!(encode_outcome(&Ok(Value::from("alice"))), "alice");
//! assert_eq!(
//!     encode_outcome(&Err(BridgeError::ServiceNotStarted)),
//!     "!err:ServiceNotStarted"
//! );
//! assert_eq!(
//!     decode_outcome("!json:[1,2]").unwrap(),
//!     Ok(Value::from(vec![1i64, 2]))
//! );
//! ```

mod command;
pub mod convert;
mod outcome;

pub use command::{decode_command, encode_command, escape};
pub use outcome::{
    decode_outcome, encode_error, encode_outcome, encode_value, is_error, MalformedResult,
    Outcome, ERROR_PREFIX, JSON_PREFIX, SIGIL,
};
