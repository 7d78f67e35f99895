//! Action types carried by Web ACLs and their rule bindings.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action applied to a request matching a rule (or to every request when
/// used as a Web ACL default action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WafActionType {
    /// Let the request through.
    Allow,
    /// Reject the request.
    Block,
    /// Count the request and continue evaluation.
    Count,
}

impl WafActionType {
    /// Returns the wire name used by the WAF API.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "ALLOW",
            Self::Block => "BLOCK",
            Self::Count => "COUNT",
        }
    }
}

impl fmt::Display for WafActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WafActionType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOW" => Ok(Self::Allow),
            "BLOCK" => Ok(Self::Block),
            "COUNT" => Ok(Self::Count),
            _ => Err(TypeError::InvalidActionType(s.to_string())),
        }
    }
}

/// Override applied to the actions of a rule group.
///
/// `NONE` keeps the actions defined inside the group; `COUNT` turns every
/// one of them into a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WafOverrideActionType {
    None,
    Count,
}

impl WafOverrideActionType {
    /// Returns the wire name used by the WAF API.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Count => "COUNT",
        }
    }
}

impl fmt::Display for WafOverrideActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WafOverrideActionType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "COUNT" => Ok(Self::Count),
            _ => Err(TypeError::InvalidOverrideActionType(s.to_string())),
        }
    }
}

/// Direction of a single Web ACL update operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeAction {
    Insert,
    Delete,
}

impl ChangeAction {
    /// Returns the wire name used by the WAF API.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(Self::Insert),
            "DELETE" => Ok(Self::Delete),
            _ => Err(TypeError::InvalidChangeAction(s.to_string())),
        }
    }
}
