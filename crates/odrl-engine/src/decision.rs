//! Policy decision types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The verdict of an authorization query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
    /// The answer depends on world facts that are missing or unusable.
    Indeterminate,
    /// Satisfied permission and prohibition under the `invalid` strategy.
    Conflict,
}

impl Decision {
    /// Integer verdict code used at the C boundary.
    pub fn code(&self) -> i32 {
        match self {
            Decision::Deny => 0,
            Decision::Allow => 1,
            Decision::Indeterminate => 2,
            Decision::Conflict => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::Indeterminate => "indeterminate",
            Decision::Conflict => "conflict",
        }
    }
}

/// A complete policy decision with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// The final decision.
    pub decision: Decision,

    /// Reason for the decision.
    pub reason: String,

    /// ID of the rule that made the decision (if any).
    pub rule_id: Option<String>,

    /// UID of the policy that made the decision.
    pub policy_id: Option<String>,

    /// Digest of the policy document.
    pub policy_digest: Option<String>,

    /// Whether this is a default decision (no matching rules).
    pub is_default: bool,

    /// Time taken to evaluate (in microseconds).
    pub evaluation_time_us: Option<u64>,

    /// Additional metadata about the decision.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl PolicyDecision {
    /// Creates a decision with the given verdict.
    pub fn new(decision: Decision, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
            rule_id: None,
            policy_id: None,
            policy_digest: None,
            is_default: false,
            evaluation_time_us: None,
            metadata: HashMap::new(),
        }
    }

    pub fn allow(reason: impl Into<String>) -> Self {
        Self::new(Decision::Allow, reason)
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self::new(Decision::Deny, reason)
    }

    pub fn indeterminate(reason: impl Into<String>) -> Self {
        Self::new(Decision::Indeterminate, reason)
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::new(Decision::Conflict, reason)
    }

    /// Creates a default deny decision.
    pub fn default_deny() -> Self {
        Self {
            is_default: true,
            ..Self::deny("No applicable permission - default deny")
        }
    }

    /// Sets the rule ID.
    pub fn with_rule_id(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Sets the policy ID.
    pub fn with_policy_id(mut self, policy_id: Option<&str>) -> Self {
        self.policy_id = policy_id.map(str::to_string);
        self
    }

    /// Sets the policy digest.
    pub fn with_policy_digest(mut self, digest: impl Into<String>) -> Self {
        self.policy_digest = Some(digest.into());
        self
    }

    /// Sets the evaluation time.
    pub fn with_evaluation_time(mut self, time_us: u64) -> Self {
        self.evaluation_time_us = Some(time_us);
        self
    }

    /// Adds metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the decision is allow.
    pub fn is_allowed(&self) -> bool {
        matches!(self.decision, Decision::Allow)
    }

    /// Returns true if the decision is deny.
    pub fn is_denied(&self) -> bool {
        matches!(self.decision, Decision::Deny)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self.decision, Decision::Indeterminate)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.decision, Decision::Conflict)
    }

    /// Serializes the decision to JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
