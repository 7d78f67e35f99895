//! Change tokens and the scopes that issue them.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Single-use credential authorising one mutating WAF call.
///
/// A token is consumed by the first mutation that uses it and becomes
/// stale as soon as any other mutation in the same scope commits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeToken(String);

impl ChangeToken {
    /// Wraps a token string returned by the WAF API.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Namespace a change token belongs to.
///
/// Global WAF (CloudFront) and each regional WAF endpoint issue their own
/// tokens; a token from one scope is never valid in another.
///
/// # Examples
///
/// ```
/// use waf_types::TokenScope;
///
/// let scope: TokenScope = "regional:eu-west-1".parse().unwrap();
/// assert_eq!(scope, TokenScope::Regional("eu-west-1".to_string()));
/// assert_eq!(TokenScope::Global.to_string(), "global");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TokenScope {
    #[default]
    Global,
    Regional(String),
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Regional(region) => write!(f, "regional:{}", region),
        }
    }
}

impl FromStr for TokenScope {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(Self::Global);
        }
        match s.split_once(':') {
            Some(("regional", region)) if !region.is_empty() => {
                Ok(Self::Regional(region.to_string()))
            }
            _ => Err(TypeError::InvalidTokenScope(s.to_string())),
        }
    }
}

impl TryFrom<String> for TokenScope {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenScope> for String {
    fn from(scope: TokenScope) -> Self {
        scope.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_parse() {
        assert_eq!("global".parse::<TokenScope>().unwrap(), TokenScope::Global);
        assert_eq!(
            "regional:us-east-1".parse::<TokenScope>().unwrap(),
            TokenScope::Regional("us-east-1".to_string())
        );
        assert!("regional:".parse::<TokenScope>().is_err());
        assert!("us-east-1".parse::<TokenScope>().is_err());
    }

    #[test]
    fn test_scope_serde() {
        let scope = TokenScope::Regional("ap-south-1".to_string());
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"regional:ap-south-1\"");
        let back: TokenScope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }

    #[test]
    fn test_token_display() {
        let token = ChangeToken::new("abcd-1234");
        assert_eq!(token.to_string(), "abcd-1234");
        assert_eq!(token.as_str(), "abcd-1234");
    }
}
