//! Hierarchical model names.
//!
//! A name has three parts, written `namespace/repository:tag`:
//!
//! - `namespace` groups repositories (`library` for the default catalogue)
//! - `repository` names the model
//! - `tag` selects a version (`latest` by default)
//!
//! A name with an empty part is *unqualified*. Unqualified names are a caller
//! error wherever a name must be resolved to storage; [`Name::fill_defaults`]
//! qualifies a name the way a user would expect from the short form.
//!
//! Part rules:
//! - Must be non-empty and at most [`MAX_PART_LEN`] bytes
//! - Must start with an ASCII letter, digit, or `_`
//! - May otherwise contain ASCII letters, digits, `_`, `-`, and `.`
//!   (namespaces do not allow `.`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Namespace used by [`Name::fill_defaults`].
pub const DEFAULT_NAMESPACE: &str = "library";

/// Tag used by [`Name::fill_defaults`].
pub const DEFAULT_TAG: &str = "latest";

/// Maximum byte length of each name part.
pub const MAX_PART_LEN: usize = 80;

/// A model name: namespace, repository, and tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    namespace: String,
    repository: String,
    tag: String,
}

impl Name {
    /// Build a name from its three parts. No validation is performed.
    pub fn new(
        namespace: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Parse the display form `namespace/repository:tag`.
    ///
    /// Missing parts are left empty; nothing is validated. Use
    /// [`Name::is_valid`] or [`Name::fill_defaults`] afterwards.
    ///
    /// ```
    /// use mvault_types::Name;
    ///
    /// let full = Name::parse("library/demo:latest");
    /// assert!(full.is_fully_qualified());
    ///
    /// let short = Name::parse("demo");
    /// assert!(!short.is_fully_qualified());
    /// assert_eq!(short.fill_defaults(), full);
    /// ```
    pub fn parse(s: &str) -> Self {
        let (path, tag) = match s.rsplit_once(':') {
            Some((path, tag)) if !tag.contains('/') => (path, tag),
            _ => (s, ""),
        };
        let (namespace, repository) = match path.rsplit_once('/') {
            Some((namespace, repository)) => (namespace, repository),
            None => ("", path),
        };
        Self::new(namespace, repository, tag)
    }

    /// Fill an empty namespace or tag with the defaults.
    pub fn fill_defaults(mut self) -> Self {
        if self.namespace.is_empty() {
            self.namespace = DEFAULT_NAMESPACE.to_string();
        }
        if self.tag.is_empty() {
            self.tag = DEFAULT_TAG.to_string();
        }
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The three parts in path order.
    pub fn parts(&self) -> [&str; 3] {
        [&self.namespace, &self.repository, &self.tag]
    }

    /// Returns `true` when none of the three parts is empty.
    pub fn is_fully_qualified(&self) -> bool {
        self.parts().iter().all(|part| !part.is_empty())
    }

    /// Returns `true` when the name is fully qualified and every part follows
    /// the part rules.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check every part, returning a description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        validate_part("namespace", &self.namespace, false)?;
        validate_part("repository", &self.repository, true)?;
        validate_part("tag", &self.tag, true)
    }
}

fn validate_part(kind: &str, part: &str, allow_dot: bool) -> Result<(), String> {
    if part.is_empty() {
        return Err(format!("{kind} must not be empty"));
    }
    if part.len() > MAX_PART_LEN {
        return Err(format!("{kind} exceeds {MAX_PART_LEN} bytes"));
    }

    let mut chars = part.chars();
    if let Some(first) = chars.next() {
        if !(first.is_ascii_alphanumeric() || first == '_') {
            return Err(format!("{kind} must start with a letter, digit, or '_'"));
        }
    }
    for ch in chars {
        let ok = ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || (allow_dot && ch == '.');
        if !ok {
            return Err(format!("{kind} contains forbidden character: {ch:?}"));
        }
    }
    Ok(())
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.namespace.is_empty() {
            write!(f, "{}/", self.namespace)?;
        }
        write!(f, "{}", self.repository)?;
        if !self.tag.is_empty() {
            write!(f, ":{}", self.tag)?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}
