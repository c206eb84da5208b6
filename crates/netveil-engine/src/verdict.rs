//! Classification verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The tier that produced a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Host set, reached through a DNS lookup
    Dns,
    /// Host set, reached through an HTTPS request
    Host,
    /// URL set, after normalization
    FullUrl,
    /// Nothing matched
    None,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dns => write!(f, "DNS"),
            Self::Host => write!(f, "HOST"),
            Self::FullUrl => write!(f, "FULL_URL"),
            Self::None => write!(f, "NONE"),
        }
    }
}

/// Block/pass decision plus the tier and set entry behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub matched: bool,
    pub tier: Tier,
    /// The exact set member that matched; `None` when passing
    pub rule: Option<String>,
}

impl Verdict {
    /// A match in `tier` on the set entry `rule`
    pub fn blocked(tier: Tier, rule: impl Into<String>) -> Self {
        Self {
            matched: true,
            tier,
            rule: Some(rule.into()),
        }
    }

    /// No match in any tier
    pub fn pass() -> Self {
        Self {
            matched: false,
            tier: Tier::None,
            rule: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_has_no_rule() {
        let verdict = Verdict::pass();
        assert!(!verdict.matched);
        assert_eq!(verdict.tier, Tier::None);
        assert!(verdict.rule.is_none());
    }

    #[test]
    fn test_blocked_keeps_rule() {
        let verdict = Verdict::blocked(Tier::FullUrl, "https://cdn.example.com/track");
        assert!(verdict.matched);
        assert_eq!(verdict.rule.as_deref(), Some("https://cdn.example.com/track"));
        assert_eq!(verdict.tier.to_string(), "FULL_URL");
    }
}
