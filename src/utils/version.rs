//! Undo log version compatibility.

/// A parsed `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Parse `major[.minor[.patch]]`, ignoring any pre-release/build suffix.
    pub fn parse(s: &str) -> Option<Self> {
        let core = s
            .trim()
            .trim_start_matches('v')
            .split(['-', '+'])
            .next()
            .unwrap_or_default();
        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            major,
            minor,
            patch,
        })
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Whether a tool at `current` can read a log written at `log`.
///
/// Majors must match; within a major the tool must not be older than the log.
pub fn is_compatible(current: Version, log: Version) -> bool {
    if current.major != log.major {
        return false;
    }
    if current.minor < log.minor {
        return false;
    }
    !(current.minor == log.minor && current.patch < log.patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(v("1.2.3"), Version { major: 1, minor: 2, patch: 3 });
        assert_eq!(v("2"), Version { major: 2, minor: 0, patch: 0 });
        assert_eq!(v("v1.4.0-beta.1"), Version { major: 1, minor: 4, patch: 0 });
        assert!(Version::parse("one.two").is_none());
        assert!(Version::parse("1.2.3.4").is_none());
        assert!(Version::parse("").is_none());
    }

    #[test]
    fn test_newer_tool_reads_older_log() {
        assert!(is_compatible(v("1.2.0"), v("1.0.0")));
        assert!(is_compatible(v("1.2.5"), v("1.2.3")));
        assert!(is_compatible(v("1.0.0"), v("1.0.0")));
    }

    #[test]
    fn test_older_tool_rejects_newer_log() {
        assert!(!is_compatible(v("1.0.0"), v("1.1.0")));
        assert!(!is_compatible(v("1.2.2"), v("1.2.3")));
    }

    #[test]
    fn test_major_mismatch_always_rejected() {
        assert!(!is_compatible(v("1.9.9"), v("2.0.0")));
        assert!(!is_compatible(v("2.0.0"), v("1.0.0")));
        assert!(!is_compatible(v("1.0.0"), v("2.0.0")));
    }
}
