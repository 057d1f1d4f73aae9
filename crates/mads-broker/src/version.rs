//! Major/minor library-version compatibility check used by the settings
//! service (§4.3).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorMinor {
    pub major: u64,
    pub minor: u64,
}

impl MajorMinor {
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        Some(Self { major, minor })
    }
}

/// `true` if client and broker are compatible (same major and minor).
pub fn compatible(client: &str, broker: &str) -> bool {
    match (MajorMinor::parse(client), MajorMinor::parse(broker)) {
        (Some(c), Some(b)) => c == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_major_minor_is_compatible() {
        assert!(compatible("1.2.3", "1.2.9"));
    }

    #[test]
    fn different_minor_is_incompatible() {
        assert!(!compatible("1.2.0", "1.3.0"));
    }

    #[test]
    fn different_major_is_incompatible() {
        assert!(!compatible("2.0.0", "1.0.0"));
    }

    #[test]
    fn unparseable_version_is_incompatible() {
        assert!(!compatible("not-a-version", "1.0.0"));
    }
}
