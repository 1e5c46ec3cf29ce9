//! Node predicates for filtered projections

use glob::{MatchOptions, Pattern};
use regex::{Regex, RegexBuilder};

use crate::entry::{Entry, EntryKind};
use crate::error::{ArchiveError, Result};

use super::node::Node;

const IGNORE_CASE: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Text predicate applied to a node's full path.
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// Lower-cased needle, matched case-insensitively.
    Substring(String),
    Regex(Regex),
}

impl TextMatcher {
    pub fn matches(&self, haystack: &str) -> bool {
        match self {
            TextMatcher::Substring(needle) => haystack.to_lowercase().contains(needle.as_str()),
            TextMatcher::Regex(re) => re.is_match(haystack),
        }
    }
}

/// How a clause combines with the result of the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseOp {
    And,
    Or,
    /// Accepted so far and the test does not hold.
    Not,
}

impl ClauseOp {
    fn apply(self, accepted: bool, test: bool) -> bool {
        match self {
            ClauseOp::And => accepted && test,
            ClauseOp::Or => accepted || test,
            ClauseOp::Not => accepted && !test,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClauseTest {
    /// Glob against the display name, case-insensitive.
    NameGlob(Pattern),
    Kind(EntryKind),
    /// Record type is one of these, case-insensitive.
    TypeName(Vec<String>),
}

impl ClauseTest {
    pub fn name_glob(pattern: &str) -> Result<Self> {
        Pattern::new(pattern)
            .map(ClauseTest::NameGlob)
            .map_err(|e| ArchiveError::InvalidPattern(format!("{}: {}", pattern, e)))
    }

    fn holds(&self, node: &Node) -> bool {
        match self {
            ClauseTest::NameGlob(pattern) => {
                pattern.matches_with(node.display_name(), IGNORE_CASE)
            }
            ClauseTest::Kind(kind) => node.entry().is_some_and(|e| e.kind() == *kind),
            ClauseTest::TypeName(types) => node
                .entry()
                .and_then(Entry::type_name)
                .is_some_and(|t| types.iter().any(|want| want.eq_ignore_ascii_case(t))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterClause {
    pub op: ClauseOp,
    pub test: ClauseTest,
}

/// Which nodes a projection shows on their own account.
///
/// An empty filter accepts everything. Otherwise a node is accepted when the
/// clauses, folded left to right from "accepted", hold and the text predicate
/// (if any) matches its path or, when enabled, its secondary key.
#[derive(Debug, Clone, Default)]
pub struct TreeFilter {
    text: Option<TextMatcher>,
    clauses: Vec<FilterClause>,
    match_keys: bool,
}

impl TreeFilter {
    /// A filter that accepts every node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match. Empty text filters nothing.
    pub fn substring(text: &str) -> Self {
        Self {
            text: (!text.is_empty()).then(|| TextMatcher::Substring(text.to_lowercase())),
            ..Self::default()
        }
    }

    /// Case-insensitive regular expression match.
    pub fn regex(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Ok(Self::default());
        }
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ArchiveError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            text: Some(TextMatcher::Regex(re)),
            ..Self::default()
        })
    }

    pub fn with_clause(mut self, op: ClauseOp, test: ClauseTest) -> Self {
        self.clauses.push(FilterClause { op, test });
        self
    }

    /// Also match the text against secondary keys (record GUIDs).
    pub fn matching_keys(mut self, enabled: bool) -> Self {
        self.match_keys = enabled;
        self
    }

    pub fn text(&self) -> Option<&TextMatcher> {
        self.text.as_ref()
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.clauses.is_empty()
    }

    /// Whether `node` matches on its own, ignoring its descendants.
    pub fn accepts(&self, node: &Node) -> bool {
        if self.is_empty() {
            return true;
        }
        if node.is_root() {
            return false;
        }

        let accepted = self
            .clauses
            .iter()
            .fold(true, |accepted, clause| clause.op.apply(accepted, clause.test.holds(node)));
        if !accepted {
            return false;
        }

        match &self.text {
            None => true,
            Some(matcher) => {
                matcher.matches(node.path())
                    || (self.match_keys && node.secondary_key().is_some_and(|k| matcher.matches(k)))
            }
        }
    }
}
