//! Policy model.
//!
//! Built once by the loader and immutable afterwards. Parties and constraint
//! trees are shared through `Arc` so a rule that names the policy-level
//! assignee points at the same party as the policy itself.

use crate::config::EngineConfig;
use crate::constraint::ConstraintNode;
use crate::error::Result;
use crate::membership::MembershipOracle;
use crate::types::{term_eq, ConflictStrategy, PartyType, PolicyType, RuleKind};
use std::sync::Arc;

/// A principal or a group of principals.
#[derive(Debug, Clone, PartialEq)]
pub struct Party {
    pub uid: String,
    pub party_type: PartyType,
    pub refinement: Option<Arc<ConstraintNode>>,
    /// Where a collection's membership is sourced from, if declared.
    pub source: Option<String>,
}

impl Party {
    /// Creates a single-principal party.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            party_type: PartyType::Party,
            refinement: None,
            source: None,
        }
    }

    /// Creates a party collection.
    pub fn collection(uid: impl Into<String>) -> Self {
        Self {
            party_type: PartyType::PartyCollection,
            ..Self::new(uid)
        }
    }

    pub fn is_collection(&self) -> bool {
        self.party_type == PartyType::PartyCollection
    }

    /// True when `principal` is this party, or a member of it for collections.
    pub fn matches(&self, principal: &str, membership: &dyn MembershipOracle) -> bool {
        if self.uid == principal {
            return true;
        }
        if !self.is_collection() {
            return false;
        }
        let collection = self.source.as_deref().unwrap_or(&self.uid);
        membership.is_member(collection, principal)
            || (collection != self.uid && membership.is_member(&self.uid, principal))
    }
}

/// An action a rule is about.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub name: String,
    pub refinement: Option<Arc<ConstraintNode>>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refinement: None,
        }
    }

    /// `use`, `odrl:use` and the ODRL IRI agree; actions from other vocabularies match exactly.
    pub fn matches(&self, requested: &str) -> bool {
        self.name == requested || term_eq(&self.name, requested)
    }
}

/// A permission, prohibition or duty.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Identifier used in decisions: the rule `uid`, or its document path.
    pub id: String,
    pub uid: Option<String>,
    pub kind: RuleKind,
    pub actions: Vec<Action>,
    pub targets: Vec<String>,
    pub assigner: Option<Arc<Party>>,
    pub assignee: Option<Arc<Party>>,
    pub constraint: Option<Arc<ConstraintNode>>,
    /// Duties attached to a permission.
    pub duties: Vec<Rule>,
    /// Remedies attached to a prohibition.
    pub remedies: Vec<Rule>,
    /// Consequences attached to a duty.
    pub consequences: Vec<Rule>,
}

impl Rule {
    /// Creates an unconstrained rule.
    pub fn new(id: impl Into<String>, kind: RuleKind, action: Action) -> Self {
        Self {
            id: id.into(),
            uid: None,
            kind,
            actions: vec![action],
            targets: Vec::new(),
            assigner: None,
            assignee: None,
            constraint: None,
            duties: Vec::new(),
            remedies: Vec::new(),
            consequences: Vec::new(),
        }
    }

    /// Returns the first action matching `requested`.
    pub fn matching_action(&self, requested: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.matches(requested))
    }

    pub fn has_consequences(&self) -> bool {
        !self.consequences.is_empty()
    }
}

/// A loaded ODRL policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub uid: Option<String>,
    pub policy_type: PolicyType,
    pub assigner: Option<Arc<Party>>,
    pub assignee: Option<Arc<Party>>,
    pub targets: Vec<String>,
    pub title: Option<String>,
    pub conflict: ConflictStrategy,
    pub inherit_from: Vec<String>,
    pub profiles: Vec<String>,
    pub permissions: Vec<Rule>,
    pub prohibitions: Vec<Rule>,
    pub obligations: Vec<Rule>,
    /// Content digest of the source document.
    pub digest: String,
}

impl Policy {
    /// Parses a policy from JSON or YAML with the default configuration.
    pub fn parse(content: &str) -> Result<Self> {
        crate::parser::load_policy(content, &EngineConfig::default())
    }

    /// Parses a policy from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        crate::parser::load_policy_with_format(json, crate::parser::PolicyFormat::Json, &EngineConfig::default())
    }

    /// Parses a policy from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        crate::parser::load_policy_with_format(yaml, crate::parser::PolicyFormat::Yaml, &EngineConfig::default())
    }

    /// Rules of the given kind.
    pub fn rules(&self, kind: RuleKind) -> &[Rule] {
        match kind {
            RuleKind::Permission => &self.permissions,
            RuleKind::Prohibition => &self.prohibitions,
            RuleKind::Duty => &self.obligations,
        }
    }

    /// Targets in force for a rule: its own, or the policy-level ones.
    pub fn effective_targets<'a>(&'a self, rule: &'a Rule) -> &'a [String] {
        if rule.targets.is_empty() {
            &self.targets
        } else {
            &rule.targets
        }
    }

    /// Assignee in force for a rule.
    pub fn effective_assignee<'a>(&'a self, rule: &'a Rule) -> Option<&'a Arc<Party>> {
        rule.assignee.as_ref().or(self.assignee.as_ref())
    }

    /// Assigner in force for a rule.
    pub fn effective_assigner<'a>(&'a self, rule: &'a Rule) -> Option<&'a Arc<Party>> {
        rule.assigner.as_ref().or(self.assigner.as_ref())
    }

    /// Total number of permissions, prohibitions and obligations.
    pub fn rule_count(&self) -> usize {
        self.permissions.len() + self.prohibitions.len() + self.obligations.len()
    }
}
