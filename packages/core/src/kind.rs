//! Resource kinds and their capability tables.

use std::fmt;

use crate::{Path, PathError, Verb};

/// The kind of resource a path addresses, fixed by its depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// `db` - a top-level container of collections.
    Database,
    /// `db/users` - a container of objects.
    Collection,
    /// `db/users/42` - a leaf record.
    Object,
}

const DATABASE_VERBS: &[Verb] = &[
    Verb::Read,
    Verb::Write,
    Verb::Put,
    Verb::Delete,
    Verb::List,
    Verb::Count,
];

const COLLECTION_VERBS: &[Verb] = &[
    Verb::Read,
    Verb::Write,
    Verb::Put,
    Verb::Delete,
    Verb::List,
    Verb::Count,
    Verb::Query,
];

const OBJECT_VERBS: &[Verb] = &[Verb::Read, Verb::Write, Verb::Put, Verb::Delete];

impl ResourceKind {
    /// Deepest addressable path.
    pub const MAX_DEPTH: usize = 3;

    /// Classify a path by its depth.
    pub fn for_path(path: &Path) -> Result<Self, PathError> {
        match path.len() {
            0 => Err(PathError::Empty),
            1 => Ok(ResourceKind::Database),
            2 => Ok(ResourceKind::Collection),
            3 => Ok(ResourceKind::Object),
            depth => Err(PathError::TooDeep {
                depth,
                max: Self::MAX_DEPTH,
            }),
        }
    }

    /// The verbs this kind accepts.
    pub fn capabilities(self) -> &'static [Verb] {
        match self {
            ResourceKind::Database => DATABASE_VERBS,
            ResourceKind::Collection => COLLECTION_VERBS,
            ResourceKind::Object => OBJECT_VERBS,
        }
    }

    pub fn supports(self, verb: Verb) -> bool {
        self.capabilities().contains(&verb)
    }

    /// Whether resources of this kind have children.
    pub fn is_container(self) -> bool {
        !matches!(self, ResourceKind::Object)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Database => "database",
            ResourceKind::Collection => "collection",
            ResourceKind::Object => "object",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
