//! Version parsing, ordering and range matching.
use std::{cmp::Ordering, fmt, sync::OnceLock};

use regex::Regex;
use semver::Prerelease;

/// A dotted version with an optional pre-release label, e.g. `1.2.3` or `1.2.3-beta.2`.
///
/// Unlike [`semver::Version`], any number of numeric parts is accepted. Missing parts compare as
/// zero, so `1.2` equals `1.2.0`.
#[derive(Debug, Clone)]
pub struct Version {
    numbers: Vec<u64>,
    pre: Option<Prerelease>,
}

fn version_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)*)(?:-([0-9A-Za-z.-]+))?(?:\+[0-9A-Za-z.-]+)?$").ok()
    })
    .as_ref()
}

impl Version {
    /// Parse a version string. Returns `None` if `s` is not a version.
    pub fn parse(s: &str) -> Option<Version> {
        let captures = version_regex()?.captures(s.trim())?;

        let numbers = captures
            .get(1)?
            .as_str()
            .split('.')
            .map(|part| part.parse().ok())
            .collect::<Option<Vec<u64>>>()?;

        let pre = match captures.get(2) {
            Some(label) => Some(Prerelease::new(label.as_str()).ok()?),
            None => None,
        };

        Some(Version { numbers, pre })
    }

    /// Numeric parts of the version.
    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    /// Pre-release label, if any.
    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_ref().map(|pre| pre.as_str())
    }

    /// Returns `true` for versions carrying a pre-release label.
    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.numbers.len().max(other.numbers.len());
        for i in 0..len {
            let a = self.numbers.get(i).copied().unwrap_or(0);
            let b = other.numbers.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ordering => return ordering,
            }
        }

        // A release is greater than any pre-release of the same version.
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, n) in self.numbers.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{n}")?;
        }
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// Compare two version strings. Returns `None` if either of them does not parse.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    Some(Version::parse(a)?.cmp(&Version::parse(b)?))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Op {
    fn eval(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn parse(s: &str) -> Option<Comparator> {
        let s = s.trim();
        // Longer operators first, so that ">=" is not read as ">".
        let (op, rest) = [
            (">=", Op::Gte),
            ("<=", Op::Lte),
            ("==", Op::Eq),
            (">", Op::Gt),
            ("<", Op::Lt),
            ("=", Op::Eq),
        ]
        .into_iter()
        .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (op, rest)))
        .unwrap_or((Op::Eq, s));

        Some(Comparator {
            op,
            version: Version::parse(rest)?,
        })
    }

    fn matches(&self, version: &Version) -> bool {
        self.op.eval(version.cmp(&self.version))
    }
}

/// A version range such as `>=1.2.0-beta` or `>=1.0.0, <2.0.0`.
///
/// Comma-separated comparators must all match. A bare version means equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    comparators: Vec<Comparator>,
}

impl VersionRange {
    /// Parse a range expression. Returns `None` if any comparator is malformed.
    pub fn parse(expr: &str) -> Option<VersionRange> {
        let comparators = expr
            .split(',')
            .map(Comparator::parse)
            .collect::<Option<Vec<_>>>()?;
        Some(VersionRange { comparators })
    }

    /// Returns `true` if `version` is within the range.
    pub fn matches(&self, version: &Version) -> bool {
        self.comparators.iter().all(|c| c.matches(version))
    }
}

/// Returns `true` if `version` satisfies `range`. Unparseable input on either side never
/// matches.
pub fn satisfies_range(version: &str, range: &str) -> bool {
    let (Some(version), Some(range)) = (Version::parse(version), VersionRange::parse(range)) else {
        return false;
    };
    range.matches(&version)
}
