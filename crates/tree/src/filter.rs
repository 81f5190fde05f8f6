use crate::error::{Result, TreeError};
use crate::signature::{is_delimiter, starts_uppercase};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use usage_protocol::InvocationRecord;

/// Comma-separated package globs over dotted signatures.
///
/// `*` stays inside one segment, `**` crosses segments and `?` is one character.
/// A pattern selects a record when it matches the signature (with `$` read as
/// `.`), its owning class or one of that class's enclosing classes. So
/// `com.foo.*` selects every method of every class directly inside `com.foo`,
/// while sub-packages such as `com.foo.bar` need `com.foo.**`. Classes are found
/// with the same naming convention the tree classifier uses.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl PackageFilter {
    /// Compile a filter string. Fails on the first malformed pattern.
    pub fn parse(packages: &str) -> Result<Self> {
        let compact: String = packages.chars().filter(|c| !c.is_whitespace()).collect();
        let patterns: Vec<String> = compact
            .split(',')
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_string)
            .collect();

        if patterns.is_empty() {
            return Ok(Self::allow_all());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = GlobBuilder::new(&to_glob_path(pattern))
                .literal_separator(true)
                .build()
                .map_err(|err| TreeError::InvalidFilterPattern {
                    pattern: pattern.clone(),
                    message: err.kind().to_string(),
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|err| TreeError::InvalidFilterPattern {
            pattern: compact.clone(),
            message: err.to_string(),
        })?;

        Ok(Self {
            patterns,
            set: Some(set),
        })
    }

    pub fn allow_all() -> Self {
        Self {
            patterns: Vec::new(),
            set: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_none()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, signature: &str) -> bool {
        let Some(set) = &self.set else {
            return true;
        };

        let path = to_glob_path(&signature.replace('$', "."));
        set.is_match(path.as_str())
            || class_paths(signature)
                .iter()
                .any(|candidate| set.is_match(candidate.as_str()))
    }

    /// Keep the records this filter selects, in input order.
    pub fn apply<'a>(&self, records: &'a [InvocationRecord]) -> Vec<&'a InvocationRecord> {
        records
            .iter()
            .filter(|record| self.matches(&record.signature))
            .collect()
    }
}

impl Default for PackageFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}

/// Compile `packages` and keep the records it selects.
pub fn filter_records<'a>(
    records: &'a [InvocationRecord],
    packages: &str,
) -> Result<Vec<&'a InvocationRecord>> {
    Ok(PackageFilter::parse(packages)?.apply(records))
}

/// Glob paths of the classes enclosing a call, outermost first.
///
/// The outermost class is the first segment that starts uppercase. The final
/// segment is the called method, unless it is that outermost class itself
/// (a constructor).
fn class_paths(signature: &str) -> Vec<String> {
    let name = signature.split('(').next().unwrap_or(signature);
    let segments: Vec<&str> = name.split(is_delimiter).filter(|s| !s.is_empty()).collect();
    let Some(outermost) = segments.iter().position(|s| starts_uppercase(s)) else {
        return Vec::new();
    };

    let is_call = name.len() < signature.len();
    let end = if is_call && segments.len() - 1 > outermost {
        segments.len() - 1
    } else {
        segments.len()
    };
    (outermost + 1..=end)
        .map(|len| segments[..len].join("/"))
        .collect()
}

// globset only knows `/` as a path separator.
fn to_glob_path(dotted: &str) -> String {
    dotted.replace('.', "/")
}
