//! Path type with validated identifier segments.

use std::fmt;

/// The canonical segment delimiter.
pub const DELIMITER: char = '/';

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path string was empty.
    #[error("path is empty")]
    Empty,

    /// Two delimiters were adjacent, or the path began or ended with one.
    #[error("empty segment at position {position}")]
    EmptySegment { position: usize },

    /// A segment is neither an identifier nor a run of digits.
    #[error("invalid path segment '{segment}' at position {position}: {message}")]
    InvalidSegment {
        segment: String,
        position: usize,
        message: String,
    },

    /// The path addresses something below the deepest resource kind.
    #[error("path has {depth} segments, at most {max} are addressable")]
    TooDeep { depth: usize, max: usize },
}

/// A validated, canonical resource path.
///
/// Segments must be Unicode identifiers (per UAX#31) or numeric strings
/// (for record ids like `42`). Comparison is case-sensitive and byte-exact;
/// no normalisation is applied, so `Users` and `users` name different
/// resources.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub components: Vec<String>,
}

impl Path {
    /// Parse a path string, validating segments.
    ///
    /// # Path Syntax
    ///
    /// - Segments are separated by `/`
    /// - Empty segments are rejected (no leading, trailing or doubled `/`)
    /// - Each segment must be a valid identifier or numeric string
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pathbridge_core::Path;
    ///
    /// let path = Path::parse("db/users/42").unwrap();
    /// assert_eq!(path.len(), 3);
    ///
    /// assert!(Path::parse("db//users").is_err());
    /// assert!(Path::parse("db/users/").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let mut components = Vec::new();
        for (position, segment) in s.split(DELIMITER).enumerate() {
            Self::validate_segment(segment, position)?;
            components.push(segment.to_string());
        }

        Ok(Path { components })
    }

    /// Try to create a path from segments, validating each.
    pub fn try_from_components(components: Vec<String>) -> Result<Self, PathError> {
        if components.is_empty() {
            return Err(PathError::Empty);
        }
        for (i, component) in components.iter().enumerate() {
            Self::validate_segment(component, i)?;
        }
        Ok(Path { components })
    }

    fn validate_segment(segment: &str, position: usize) -> Result<(), PathError> {
        let mut chars = segment.chars();
        let Some(first) = chars.next() else {
            return Err(PathError::EmptySegment { position });
        };

        // Allow pure numeric strings (record ids)
        if segment.chars().all(|c| c.is_ascii_digit()) {
            return Ok(());
        }

        // First char: XID_Start or underscore followed by XID_Continue
        let valid_start = unicode_ident::is_xid_start(first)
            || (first == '_'
                && chars
                    .clone()
                    .next()
                    .is_some_and(unicode_ident::is_xid_continue));

        if !valid_start {
            return Err(PathError::InvalidSegment {
                segment: segment.to_string(),
                position,
                message: "must start with a letter or underscore followed by letter/digit"
                    .to_string(),
            });
        }

        for c in chars {
            if !unicode_ident::is_xid_continue(c) {
                return Err(PathError::InvalidSegment {
                    segment: segment.to_string(),
                    position,
                    message: format!("invalid character '{}' in identifier", c),
                });
            }
        }

        Ok(())
    }

    /// Get the number of segments.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// A parsed path always has at least one segment; only hand-built
    /// values can be empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterate over segments.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// The final segment.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// The path with the final segment removed, if any remain.
    pub fn parent(&self) -> Option<Path> {
        if self.components.len() < 2 {
            return None;
        }
        Some(self.slice(0, self.components.len() - 1))
    }

    /// Proper prefixes of this path, shortest first.
    ///
    /// `db/users/42` yields `db` then `db/users`.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.components.len()).map(move |end| self.slice(0, end))
    }

    /// Append a validated segment.
    pub fn child(&self, segment: &str) -> Result<Path, PathError> {
        Self::validate_segment(segment, self.components.len())?;
        let mut components = self.components.clone();
        components.push(segment.to_string());
        Ok(Path { components })
    }

    /// Check if this path has the given prefix.
    pub fn has_prefix(&self, prefix: &Path) -> bool {
        prefix.components.len() <= self.components.len()
            && prefix.components == self.components[..prefix.components.len()]
    }

    /// Get a slice of segments as a new path.
    pub fn slice(&self, start: usize, end: usize) -> Path {
        Path {
            components: self.components[start..end].to_vec(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                write!(f, "{}", DELIMITER)?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use pathbridge_core::path;
///
/// let p = path!("db/users/42");
/// assert_eq!(p.len(), 3);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_paths() {
        assert_eq!(Path::parse("db").unwrap().len(), 1);
        assert_eq!(Path::parse("db/users").unwrap().len(), 2);
        assert_eq!(Path::parse("db/users/42").unwrap().len(), 3);
    }

    #[test]
    fn empty_path_rejected() {
        assert_eq!(Path::parse(""), Err(PathError::Empty));
    }

    #[test]
    fn empty_segments_rejected() {
        assert_eq!(
            Path::parse("/db"),
            Err(PathError::EmptySegment { position: 0 })
        );
        assert_eq!(
            Path::parse("db//users"),
            Err(PathError::EmptySegment { position: 1 })
        );
        assert_eq!(
            Path::parse("db/users/"),
            Err(PathError::EmptySegment { position: 2 })
        );
        assert!(Path::parse("/").is_err());
    }

    #[test]
    fn numeric_segments_allowed() {
        let p = Path::parse("db/users/0042").unwrap();
        assert_eq!(&p[2], "0042");
    }

    #[test]
    fn unicode_identifiers_allowed() {
        let p = Path::parse("usuarios/名前").unwrap();
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn invalid_segments_rejected() {
        assert!(Path::parse("db/bar baz").is_err()); // space
        assert!(Path::parse("db/bar-baz").is_err()); // hyphen
        assert!(Path::parse("db/.hidden").is_err()); // starts with dot
        assert!(Path::parse("db/123abc").is_err()); // digit then letters
        assert!(Path::parse("db:users").is_err());
        assert!(Path::parse("_").is_err());
    }

    #[test]
    fn invalid_character_reported() {
        let err = Path::parse("db/foo$bar").unwrap_err();
        assert!(err.to_string().contains("invalid character '$'"));
        assert!(err.to_string().contains("position 1"));
    }

    #[test]
    fn case_is_significant() {
        assert_ne!(path!("db/Users"), path!("db/users"));
    }

    #[test]
    fn display_roundtrips() {
        let p = path!("db/users/42");
        assert_eq!(p.to_string(), "db/users/42");
        assert_eq!(Path::parse(&p.to_string()).unwrap(), p);
    }

    #[test]
    fn ancestors_shortest_first() {
        let p = path!("db/users/42");
        let ancestors: Vec<String> = p.ancestors().map(|a| a.to_string()).collect();
        assert_eq!(ancestors, vec!["db", "db/users"]);
        assert_eq!(path!("db").ancestors().count(), 0);
    }

    #[test]
    fn parent_and_name() {
        let p = path!("db/users/42");
        assert_eq!(p.parent(), Some(path!("db/users")));
        assert_eq!(p.name(), Some("42"));
        assert_eq!(path!("db").parent(), None);
    }

    #[test]
    fn child_validates() {
        let p = path!("db");
        assert_eq!(p.child("users").unwrap(), path!("db/users"));
        assert!(p.child("no/slash").is_err());
        assert!(p.child("").is_err());
    }

    #[test]
    fn has_prefix_works() {
        let p = path!("db/users/42");
        assert!(p.has_prefix(&path!("db")));
        assert!(p.has_prefix(&path!("db/users")));
        assert!(p.has_prefix(&path!("db/users/42")));
        assert!(!p.has_prefix(&path!("users")));
        assert!(!path!("db/usersx").has_prefix(&path!("db/users")));
    }

    #[test]
    fn try_from_components_validates() {
        assert!(Path::try_from_components(vec!["db".into(), "users".into()]).is_ok());
        assert_eq!(
            Path::try_from_components(vec![]),
            Err(PathError::Empty)
        );
        assert!(Path::try_from_components(vec!["db".into(), "".into()]).is_err());
    }

    #[test]
    fn children_sort_after_parent() {
        let mut paths = vec![path!("db/b"), path!("db"), path!("db/a/1"), path!("db/a")];
        paths.sort();
        let rendered: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered, vec!["db", "db/a", "db/a/1", "db/b"]);
    }
}
