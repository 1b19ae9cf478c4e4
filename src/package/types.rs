use std::fmt;

use super::PackageError;

/// A requested dependency update, parsed from `name@version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    /// Remainder after the separating `@`. Not validated, may be empty.
    pub version: String,
}

impl PackageSpec {
    /// Split on the first `@` after the name. A leading `@` belongs to a
    /// scoped name (`@scope/pkg@1.0.0`).
    pub fn parse(raw: &str) -> Result<PackageSpec, PackageError> {
        let scoped = raw.starts_with('@') && raw.contains('/');
        let search_from = usize::from(scoped);
        let (name, version) = match raw[search_from..].find('@') {
            Some(pos) => {
                let at = search_from + pos;
                (&raw[..at], &raw[at + 1..])
            }
            None => (raw, ""),
        };

        if name.is_empty() {
            return Err(PackageError::EmptyName(raw.to_string()));
        }

        Ok(PackageSpec {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<PackageSpec>, PackageError> {
        raw.iter().map(|s| Self::parse(s.as_ref())).collect()
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
