//! Declarative route rule table.
//!
//! The table is built once from static configuration and is immutable at
//! request time. Sorting happens at build, not per lookup: regex rules
//! precede prefix rules, and within each group longer (more specific)
//! matchers precede shorter ones that would otherwise shadow them. The sort
//! is stable, so rules with equal priority keep their configuration order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Permission;

/// Path matcher for one rule: exactly one of the two kinds.
#[derive(Debug, Clone)]
pub enum RouteMatcher {
    /// Matches when the request path starts with the prefix.
    Prefix(String),
    /// Full-path regex; anchored at build so a partial hit never authorizes
    /// a broader path.
    Pattern(Regex),
}

impl RouteMatcher {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            RouteMatcher::Prefix(prefix) => path.starts_with(prefix.as_str()),
            RouteMatcher::Pattern(re) => re.is_match(path),
        }
    }

    fn is_pattern(&self) -> bool {
        matches!(self, RouteMatcher::Pattern(_))
    }

    /// Matcher length used for the longest-first ordering within a group.
    fn specificity(&self) -> usize {
        match self {
            RouteMatcher::Prefix(prefix) => prefix.len(),
            RouteMatcher::Pattern(re) => re.as_str().len(),
        }
    }
}

/// HTTP method matcher: `ALL` or one exact method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatcher {
    Any,
    Exact(String),
}

impl MethodMatcher {
    pub fn parse(raw: &str) -> Self {
        let upper = raw.trim().to_ascii_uppercase();
        if upper.is_empty() || upper == "ALL" {
            MethodMatcher::Any
        } else {
            MethodMatcher::Exact(upper)
        }
    }

    pub fn matches(&self, method: &str) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Exact(m) => m.eq_ignore_ascii_case(method),
        }
    }
}

/// One authorization policy entry.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub matcher: RouteMatcher,
    pub method: MethodMatcher,
    /// Public rules allow the request regardless of authentication state.
    pub public: bool,
    /// `None` means login-only; `Some` delegates to the permission resolver.
    pub required: Option<Permission>,
}

/// Serde form of a rule as it appears in configuration.
///
/// Exactly one of `path` (prefix) or `pattern` (regex) must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// HTTP method or "ALL" (default).
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
}

impl RuleConfig {
    pub fn prefix(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            pattern: None,
            method: None,
            public: false,
            required: None,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            path: None,
            pattern: Some(pattern.into()),
            method: None,
            public: false,
            required: None,
        }
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    pub fn requires(mut self, permission: impl Into<String>) -> Self {
        self.required = Some(permission.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule must set exactly one of `path` or `pattern`")]
    AmbiguousMatcher,

    #[error("rule has neither `path` nor `pattern`")]
    MissingMatcher,

    #[error("invalid route pattern {pattern:?}: {source}")]
    BadPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Ordered, immutable rule table.
///
/// Lookup returns the first rule whose method and matcher both match; the
/// build-time ordering makes that deterministic for any input order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<RouteRule>,
}

impl RuleTable {
    pub fn build(configs: impl IntoIterator<Item = RuleConfig>) -> Result<Self, RuleError> {
        let mut rules = configs
            .into_iter()
            .map(compile_rule)
            .collect::<Result<Vec<_>, _>>()?;

        // Stable sort: regex group first, then longer matchers first.
        rules.sort_by(|a, b| {
            b.matcher
                .is_pattern()
                .cmp(&a.matcher.is_pattern())
                .then_with(|| b.matcher.specificity().cmp(&a.matcher.specificity()))
        });

        Ok(Self { rules })
    }

    /// First matching rule for (path, method), in priority order.
    ///
    /// The path is the mount path plus sub-path, query string excluded.
    pub fn match_rule(&self, path: &str, method: &str) -> Option<&RouteRule> {
        self.rules
            .iter()
            .find(|rule| rule.method.matches(method) && rule.matcher.matches(path))
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile_rule(config: RuleConfig) -> Result<RouteRule, RuleError> {
    let matcher = match (config.path, config.pattern) {
        (Some(_), Some(_)) => return Err(RuleError::AmbiguousMatcher),
        (None, None) => return Err(RuleError::MissingMatcher),
        (Some(path), None) => RouteMatcher::Prefix(path),
        (None, Some(pattern)) => {
            let anchored = anchor(&pattern);
            let re = Regex::new(&anchored).map_err(|source| RuleError::BadPattern {
                pattern,
                source,
            })?;
            RouteMatcher::Pattern(re)
        }
    };

    Ok(RouteRule {
        matcher,
        method: MethodMatcher::parse(config.method.as_deref().unwrap_or("ALL")),
        public: config.public,
        required: config.required.map(Permission::new),
    })
}

/// Anchor a pattern to the full path unless the author already did.
fn anchor(pattern: &str) -> String {
    let mut anchored = String::with_capacity(pattern.len() + 2);
    if !pattern.starts_with('^') {
        anchored.push('^');
    }
    anchored.push_str(pattern);
    if !pattern.ends_with('$') {
        anchored.push('$');
    }
    anchored
}
