//! Decoded commands.
//!
//! A [`Command`] is produced once per call by the codec and never mutated
//! afterwards. Its [`Verb`] is what capability tables are checked against.

use std::fmt;

use crate::value::Record;

/// The closed vocabulary of command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Read,
    Write,
    Put,
    Delete,
    Query,
    Count,
    List,
}

impl Verb {
    pub const ALL: [Verb; 7] = [
        Verb::Read,
        Verb::Write,
        Verb::Put,
        Verb::Delete,
        Verb::Query,
        Verb::Count,
        Verb::List,
    ];

    /// Look up a verb by its wire token.
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.as_str() == token)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Read => "read",
            Verb::Write => "write",
            Verb::Put => "put",
            Verb::Delete => "delete",
            Verb::Query => "query",
            Verb::Count => "count",
            Verb::List => "list",
        }
    }

    /// The access a verb needs on its resource.
    pub fn access(self) -> Access {
        match self {
            Verb::Write | Verb::Put | Verb::Delete => Access::Write,
            Verb::Read | Verb::Query | Verb::Count | Verb::List => Access::Read,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared or exclusive use of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// A decoded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// No fields: the whole record. One field: that value. Several: a map.
    Read { fields: Vec<String> },
    /// Set string-valued fields.
    Write { assignments: Vec<(String, String)> },
    /// Merge structured fields.
    Put { record: Record },
    /// No fields: remove the resource and its descendants.
    Delete { fields: Vec<String> },
    /// Children whose fields equal every pair.
    Query { filter: Vec<(String, String)> },
    Count,
    List,
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Command::Read { .. } => Verb::Read,
            Command::Write { .. } => Verb::Write,
            Command::Put { .. } => Verb::Put,
            Command::Delete { .. } => Verb::Delete,
            Command::Query { .. } => Verb::Query,
            Command::Count => Verb::Count,
            Command::List => Verb::List,
        }
    }

    pub fn access(&self) -> Access {
        self.verb().access()
    }

    /// Whether this command removes the resource itself.
    pub fn removes_resource(&self) -> bool {
        matches!(self, Command::Delete { fields } if fields.is_empty())
    }
}
