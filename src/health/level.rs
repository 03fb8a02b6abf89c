//! Health levels used to rank service instances
//!
//! Levels are totally ordered, worst first:
//!
//! ```text
//! Failed < Undetermined < NoCheckDefined < Warn < Green
//! ```
//!
//! An entity without any check ranks between a check in unknown state and a
//! check in warning state. This order must not change.

use std::fmt;

use crate::discovery::CheckStatus;

/// Health of a node or a service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HealthLevel {
    /// At least one check is critical
    Failed,
    /// At least one check is in unknown state
    Undetermined,
    /// No check is registered
    NoCheckDefined,
    /// At least one check is warning, none worse
    Warn,
    /// All checks are passing
    Green,
}

impl HealthLevel {
    /// Level of a single check
    pub fn for_status(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Critical => HealthLevel::Failed,
            CheckStatus::Unknown => HealthLevel::Undetermined,
            CheckStatus::Warning => HealthLevel::Warn,
            CheckStatus::Passing => HealthLevel::Green,
        }
    }

    /// Whether an instance at this level may receive traffic at all
    pub fn is_eligible(self) -> bool {
        self > HealthLevel::Failed
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Failed => "failed",
            HealthLevel::Undetermined => "undetermined",
            HealthLevel::NoCheckDefined => "no_check_defined",
            HealthLevel::Warn => "warn",
            HealthLevel::Green => "green",
        }
    }
}

impl fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `HealthLevel` extended with absorbing bounds
///
/// `Infinity` is the identity of `min` and `MinusInfinity` the identity of
/// `max`, so folds over levels need no special case for the first element.
/// Never exposed outside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Bounded {
    MinusInfinity,
    Level(HealthLevel),
    Infinity,
}

impl Bounded {
    /// The wrapped level, `None` for either bound
    pub(crate) fn level(self) -> Option<HealthLevel> {
        match self {
            Bounded::Level(level) => Some(level),
            Bounded::MinusInfinity | Bounded::Infinity => None,
        }
    }
}

impl From<HealthLevel> for Bounded {
    fn from(level: HealthLevel) -> Self {
        Bounded::Level(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        let ordered = [
            HealthLevel::Failed,
            HealthLevel::Undetermined,
            HealthLevel::NoCheckDefined,
            HealthLevel::Warn,
            HealthLevel::Green,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_for_status() {
        assert_eq!(HealthLevel::for_status(CheckStatus::Critical), HealthLevel::Failed);
        assert_eq!(HealthLevel::for_status(CheckStatus::Unknown), HealthLevel::Undetermined);
        assert_eq!(HealthLevel::for_status(CheckStatus::Warning), HealthLevel::Warn);
        assert_eq!(HealthLevel::for_status(CheckStatus::Passing), HealthLevel::Green);
    }

    #[test]
    fn test_bounds_absorb() {
        for level in [HealthLevel::Failed, HealthLevel::Green] {
            assert_eq!(Bounded::Infinity.min(level.into()), Bounded::Level(level));
            assert_eq!(Bounded::MinusInfinity.max(level.into()), Bounded::Level(level));
        }
        assert_eq!(Bounded::Infinity.level(), None);
        assert_eq!(Bounded::MinusInfinity.level(), None);
    }

    #[test]
    fn test_eligibility() {
        assert!(!HealthLevel::Failed.is_eligible());
        assert!(HealthLevel::Undetermined.is_eligible());
        assert!(HealthLevel::NoCheckDefined.is_eligible());
    }
}
