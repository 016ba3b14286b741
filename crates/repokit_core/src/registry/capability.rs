//! Entity capabilities and the repository contracts keyed on them.

use std::fmt::{Display, Formatter};
use thiserror::Error;

/// What an entity type offers, ordered from weakest to strongest.
///
/// A generic repository constrained to capability `c` can be closed over every
/// entity whose capability is `>= c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// Surrogate integer key only.
    Keyed,
    /// Keyed plus GUID and external id.
    Identified,
    /// Identified plus audit timestamps.
    Audited,
}

impl Capability {
    /// Stable string id used in binding tables and CLI filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyed => CAPABILITY_KEYED,
            Self::Identified => CAPABILITY_IDENTIFIED,
            Self::Audited => CAPABILITY_AUDITED,
        }
    }

    /// Name of the repository contract exposed for this capability.
    pub fn contract_name(self) -> &'static str {
        match self {
            Self::Keyed => "KeyedRepo",
            Self::Identified => "IdentifiedRepo",
            Self::Audited => "AuditedRepo",
        }
    }

    pub fn satisfies(self, constraint: Capability) -> bool {
        self >= constraint
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const CAPABILITY_KEYED: &str = "keyed";
pub const CAPABILITY_IDENTIFIED: &str = "identified";
pub const CAPABILITY_AUDITED: &str = "audited";

const SUPPORTED_CAPABILITY_STRINGS: &[&str] =
    &[CAPABILITY_KEYED, CAPABILITY_IDENTIFIED, CAPABILITY_AUDITED];

pub fn supported_capability_strings() -> &'static [&'static str] {
    SUPPORTED_CAPABILITY_STRINGS
}

/// Parses one capability id; matching is exact and lowercase.
pub fn parse_capability(value: &str) -> Result<Capability, CapabilityError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(CapabilityError::Empty);
    }

    match normalized {
        CAPABILITY_KEYED => Ok(Capability::Keyed),
        CAPABILITY_IDENTIFIED => Ok(Capability::Identified),
        CAPABILITY_AUDITED => Ok(Capability::Audited),
        other => Err(CapabilityError::Unsupported(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("capability value must not be empty")]
    Empty,
    #[error("capability is unsupported: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::{parse_capability, supported_capability_strings, Capability, CapabilityError};

    #[test]
    fn parses_all_supported_capabilities() {
        for value in supported_capability_strings() {
            let parsed = parse_capability(value).expect("supported capability parses");
            assert_eq!(parsed.as_str(), *value);
        }
    }

    #[test]
    fn rejects_empty_and_unknown_values() {
        assert_eq!(
            parse_capability("  ").expect_err("empty must fail"),
            CapabilityError::Empty
        );
        assert_eq!(
            parse_capability("Keyed").expect_err("capitalized must fail"),
            CapabilityError::Unsupported("Keyed".to_string())
        );
    }

    #[test]
    fn stronger_capabilities_satisfy_weaker_constraints() {
        assert!(Capability::Audited.satisfies(Capability::Keyed));
        assert!(Capability::Audited.satisfies(Capability::Identified));
        assert!(Capability::Identified.satisfies(Capability::Identified));
        assert!(!Capability::Keyed.satisfies(Capability::Identified));
        assert!(!Capability::Identified.satisfies(Capability::Audited));
    }
}
