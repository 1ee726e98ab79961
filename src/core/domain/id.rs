//! Newtype identifiers used throughout the domain model.
//!
//! Wrapping raw strings in distinct types prevents accidentally passing a
//! `TokenId` where a `MarketSlug` is expected — a class of bug the source system
//! reportedly hit more than once when both were plain `String`.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw string as this identifier type.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(MarketSlug, "Human-readable market identifier, e.g. `nba-lal-gsw-2026-02-01`.");
string_id!(ConditionId, "On-chain condition identifier shared by a market's two tokens.");
string_id!(TokenId, "Exchange token identifier for one outcome of a market.");

/// Identity of a single fade cycle: `tokenId || ':' || timestamp`.
///
/// Kept as a distinct type rather than a bare `String` so that the cycle store's
/// keys can never be confused with a raw token or market identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShockId(String);

impl ShockId {
    /// Build the canonical `shockId` for a shock on `token` detected at `timestamp_ms`.
    #[must_use]
    pub fn new(token: &TokenId, timestamp_ms: i64) -> Self {
        Self(format!("{token}:{timestamp_ms}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A locally-assigned identifier for a `LadderOrder`, independent of whatever the
/// exchange eventually returns (or fails to return) for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalOrderId(pub u64);

impl fmt::Display for LocalOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local-{}", self.0)
    }
}

/// Exchange-assigned order identifier, opaque to the engine beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeOrderId(String);

impl ExchangeOrderId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shock_id_format_is_token_colon_timestamp() {
        let token = TokenId::from("token-abc");
        let id = ShockId::new(&token, 1_700_000_000_000);
        assert_eq!(id.as_str(), "token-abc:1700000000000");
    }

    #[test]
    fn ids_round_trip_through_serde() {
        let slug = MarketSlug::from("nba-lal-gsw");
        let json = serde_json::to_string(&slug).unwrap();
        assert_eq!(json, "\"nba-lal-gsw\"");
        let back: MarketSlug = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slug);
    }

    #[test]
    fn distinct_id_types_do_not_compare_equal_across_types() {
        // Compile-time guarantee exercised at runtime: these are different types
        // entirely, so this test exists to document the invariant, not to assert
        // much at runtime beyond construction succeeding.
        let market = MarketSlug::from("m");
        let token = TokenId::from("m");
        assert_eq!(market.as_str(), token.as_str());
    }
}
