//! Microversion negotiation and field gating
//!
//! The Placement API evolves through microversions. Every request carries a
//! version header, and individual arguments are only accepted by the server
//! at or above the microversion that introduced them. Both checks run
//! client-side before the first request so failures are fast and diagnosable
//! offline. The server still validates independently; its rejections are
//! surfaced verbatim.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Sentinel accepted in place of an explicit version string
pub const LATEST: &str = "latest";

/// Minimum microversion the client knows about
pub const MIN_VERSION: Microversion = Microversion { major: 1, minor: 0 };

/// Maximum microversion the client knows about
pub const MAX_VERSION: Microversion = Microversion { major: 1, minor: 28 };

// =============================================================================
// Microversion
// =============================================================================

/// An API microversion as a totally ordered (major, minor) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Microversion {
    pub major: u32,
    pub minor: u32,
}

impl Microversion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Microversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Microversion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| Error::invalid_version(s, "expected <major>.<minor>"))?;
        let major = parse_component(major)
            .ok_or_else(|| Error::invalid_version(s, "major version is not a number"))?;
        let minor = parse_component(minor)
            .ok_or_else(|| Error::invalid_version(s, "minor version is not a number"))?;
        Ok(Microversion { major, minor })
    }
}

// u32::from_str tolerates a leading '+'; version components must be digits
// only.
fn parse_component(s: &str) -> Option<u32> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok()
}

// =============================================================================
// Negotiation
// =============================================================================

/// Resolve the effective microversion for this invocation.
///
/// An absent request keeps the backward-compatible default (the minimum
/// supported version). The `latest` sentinel resolves to the maximum the
/// client knows about. Anything else must parse as `<major>.<minor>` and lie
/// within the supported range.
pub fn negotiate(requested: Option<&str>) -> Result<Microversion> {
    let requested = match requested {
        None => return Ok(MIN_VERSION),
        Some(r) => r,
    };
    if requested == LATEST {
        return Ok(MAX_VERSION);
    }

    let version: Microversion = requested.parse()?;
    if version.major != MIN_VERSION.major {
        return Err(Error::invalid_version(
            requested,
            format!("major version must be {}", MIN_VERSION.major),
        ));
    }
    if version < MIN_VERSION || version > MAX_VERSION {
        return Err(Error::invalid_version(
            requested,
            format!("supported range is {} to {}", MIN_VERSION, MAX_VERSION),
        ));
    }
    Ok(version)
}

// =============================================================================
// Field Version Gate
// =============================================================================

/// Minimum microversion required for an optional command argument
#[derive(Debug, Clone, Copy)]
pub struct FieldRequirement {
    pub field: &'static str,
    pub minimum: Microversion,
}

impl FieldRequirement {
    pub const fn new(field: &'static str, major: u32, minor: u32) -> Self {
        Self {
            field,
            minimum: Microversion::new(major, minor),
        }
    }
}

/// Check explicitly supplied fields against their minimum versions.
///
/// `used` holds only arguments the user actually supplied; unset optional
/// flags must not appear here. A field without a requirement entry is
/// available at the base version. The boundary is inclusive: a field whose
/// minimum equals the negotiated version passes.
pub fn check_fields(
    used: &[&str],
    negotiated: Microversion,
    requirements: &[FieldRequirement],
) -> Result<()> {
    for req in requirements {
        if used.contains(&req.field) && negotiated < req.minimum {
            return Err(Error::FieldNotSupported {
                field: req.field.to_string(),
                required: req.minimum.to_string(),
                negotiated: negotiated.to_string(),
            });
        }
    }
    Ok(())
}

/// Check an operation-level minimum version.
pub fn check_operation(
    operation: &str,
    minimum: Microversion,
    negotiated: Microversion,
) -> Result<()> {
    if negotiated < minimum {
        return Err(Error::NotSupported {
            operation: operation.to_string(),
            required: minimum.to_string(),
            negotiated: negotiated.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_ordering() {
        assert!(Microversion::new(1, 2) < Microversion::new(1, 10));
        assert!(Microversion::new(1, 28) > Microversion::new(1, 9));
        assert_eq!(Microversion::new(1, 4), Microversion::new(1, 4));
    }

    #[test]
    fn test_parse() {
        let v: Microversion = "1.17".parse().unwrap();
        assert_eq!(v, Microversion::new(1, 17));
        assert_eq!(v.to_string(), "1.17");

        assert_matches!(
            "1".parse::<Microversion>(),
            Err(Error::InvalidVersion { .. })
        );
        assert_matches!(
            "abc".parse::<Microversion>(),
            Err(Error::InvalidVersion { .. })
        );
        assert_matches!(
            "1.x".parse::<Microversion>(),
            Err(Error::InvalidVersion { .. })
        );
        assert_matches!(
            ".5".parse::<Microversion>(),
            Err(Error::InvalidVersion { .. })
        );
    }

    #[test]
    fn test_negotiate_default_is_minimum() {
        assert_eq!(negotiate(None).unwrap(), MIN_VERSION);
    }

    #[test]
    fn test_negotiate_latest() {
        assert_eq!(negotiate(Some("latest")).unwrap(), MAX_VERSION);
    }

    #[test]
    fn test_negotiate_in_range_returns_exact() {
        for minor in 0..=28 {
            let s = format!("1.{}", minor);
            assert_eq!(
                negotiate(Some(&s)).unwrap(),
                Microversion::new(1, minor),
                "version {} should be accepted",
                s
            );
        }
    }

    #[test]
    fn test_negotiate_out_of_range() {
        assert_matches!(negotiate(Some("1.29")), Err(Error::InvalidVersion { .. }));
        assert_matches!(negotiate(Some("1.999")), Err(Error::InvalidVersion { .. }));
        assert_matches!(negotiate(Some("2.0")), Err(Error::InvalidVersion { .. }));
        assert_matches!(negotiate(Some("0.9")), Err(Error::InvalidVersion { .. }));
    }

    #[test]
    fn test_negotiate_malformed() {
        assert_matches!(negotiate(Some("")), Err(Error::InvalidVersion { .. }));
        assert_matches!(negotiate(Some("1.")), Err(Error::InvalidVersion { .. }));
        assert_matches!(negotiate(Some("one.two")), Err(Error::InvalidVersion { .. }));
        // Signs are not part of the version grammar even though integer
        // parsing would tolerate them.
        assert_matches!(negotiate(Some("+1.5")), Err(Error::InvalidVersion { .. }));
        assert_matches!(negotiate(Some("1.+5")), Err(Error::InvalidVersion { .. }));
    }

    #[test]
    fn test_check_fields_boundary_inclusive() {
        let reqs = [FieldRequirement::new("aggregate-uuid", 1, 3)];

        // Below the minimum fails with both versions in the error.
        let err = check_fields(&["aggregate-uuid"], Microversion::new(1, 2), &reqs).unwrap_err();
        assert_matches!(
            err,
            Error::FieldNotSupported { ref field, ref required, ref negotiated }
                if field == "aggregate-uuid" && required == "1.3" && negotiated == "1.2"
        );

        // Equal to the minimum passes.
        check_fields(&["aggregate-uuid"], Microversion::new(1, 3), &reqs).unwrap();
        // Above the minimum passes.
        check_fields(&["aggregate-uuid"], Microversion::new(1, 10), &reqs).unwrap();
    }

    #[test]
    fn test_check_fields_unused_field_ignored() {
        let reqs = [FieldRequirement::new("resource", 1, 4)];
        // The field is versioned but not supplied, so the old version is fine.
        check_fields(&[], Microversion::new(1, 0), &reqs).unwrap();
    }

    #[test]
    fn test_check_fields_unlisted_field_is_base() {
        let reqs = [FieldRequirement::new("resource", 1, 4)];
        check_fields(&["name"], Microversion::new(1, 0), &reqs).unwrap();
    }

    #[test]
    fn test_check_operation() {
        check_operation("resource class list", Microversion::new(1, 2), Microversion::new(1, 2))
            .unwrap();
        let err = check_operation(
            "trait list",
            Microversion::new(1, 6),
            Microversion::new(1, 5),
        )
        .unwrap_err();
        assert_matches!(err, Error::NotSupported { .. });
    }
}
