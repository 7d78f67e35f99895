//! Rule kinds that can be bound to a Web ACL.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of rule referenced by a Web ACL rule binding.
///
/// The kind decides which action shape the binding carries: `GROUP`
/// bindings take an override action, the others take a plain action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WafRuleType {
    /// Standard match rule.
    #[default]
    Regular,
    /// Rate-based rule.
    RateBased,
    /// Rule group.
    Group,
}

impl WafRuleType {
    /// Returns the wire name used by the WAF API.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "REGULAR",
            Self::RateBased => "RATE_BASED",
            Self::Group => "GROUP",
        }
    }

    /// Returns true if bindings of this kind carry an override action.
    pub const fn uses_override_action(&self) -> bool {
        matches!(self, Self::Group)
    }
}

impl fmt::Display for WafRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WafRuleType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGULAR" => Ok(Self::Regular),
            "RATE_BASED" => Ok(Self::RateBased),
            "GROUP" => Ok(Self::Group),
            _ => Err(TypeError::InvalidRuleType(s.to_string())),
        }
    }
}
