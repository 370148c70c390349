//! Trigger rules - decide whether a repository event starts a run

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of repository event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Commits pushed to a branch
    Push,
    /// Pull request opened or updated against a target branch
    PullRequest,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Push => "push",
            EventKind::PullRequest => "pull_request",
        }
    }

    /// Parse the stored name back into a kind
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "push" => Some(EventKind::Push),
            "pull_request" => Some(EventKind::PullRequest),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An incoming repository event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,

    /// Pushed branch, or the target branch of a pull request
    pub branch: String,

    /// Commit to check out (optional)
    pub sha: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        let branch = branch
            .strip_prefix("refs/heads/")
            .map(str::to_string)
            .unwrap_or(branch);

        Self {
            kind,
            branch,
            sha: None,
        }
    }

    pub fn push(branch: impl Into<String>) -> Self {
        Self::new(EventKind::Push, branch)
    }

    pub fn pull_request(target_branch: impl Into<String>) -> Self {
        Self::new(EventKind::PullRequest, target_branch)
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }
}

/// A branch filter entry
#[derive(Debug, Clone)]
pub enum BranchPattern {
    /// Matches one branch name exactly
    Literal(String),
    /// Glob compiled to an anchored regex
    Glob { source: String, regex: Regex },
}

impl BranchPattern {
    /// Compile a pattern. Names without `*` or `?` stay literal.
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        if !pattern.contains(['*', '?']) {
            return Ok(BranchPattern::Literal(pattern.to_string()));
        }

        let mut expr = String::from("^");
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    expr.push_str(".*");
                }
                '*' => expr.push_str("[^/]*"),
                '?' => expr.push_str("[^/]"),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        Ok(BranchPattern::Glob {
            source: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    pub fn matches(&self, branch: &str) -> bool {
        match self {
            BranchPattern::Literal(name) => name == branch,
            BranchPattern::Glob { regex, .. } => regex.is_match(branch),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BranchPattern::Literal(name) => name,
            BranchPattern::Glob { source, .. } => source,
        }
    }
}

/// Event kind plus the branches it is filtered to
#[derive(Debug, Clone)]
pub struct TriggerRule {
    pub kind: EventKind,

    /// `None` means every branch
    pub branches: Option<Vec<BranchPattern>>,
}

impl TriggerRule {
    pub fn new(kind: EventKind, branches: Option<Vec<BranchPattern>>) -> Self {
        Self { kind, branches }
    }

    /// Check whether an event starts a run under this rule
    pub fn matches(&self, event: &Event) -> bool {
        if self.kind != event.kind {
            return false;
        }

        match &self.branches {
            None => true,
            Some(patterns) => patterns.iter().any(|p| p.matches(&event.branch)),
        }
    }
}
