//! Policy evaluation engine.
//!
//! One engine owns one immutable policy and one world store. Queries select
//! candidate rules, evaluate their constraints against a read-locked view of
//! the world, and resolve permissions against prohibitions using the policy's
//! conflict strategy.

use crate::config::EngineConfig;
use crate::context::QueryContext;
use crate::decision::PolicyDecision;
use crate::error::Result;
use crate::evaluator::{ConstraintEvaluator, Tri};
use crate::membership::{MembershipOracle, NoMembership};
use crate::parser::load_policy;
use crate::policy::{Policy, Rule};
use crate::types::{ConflictStrategy, RuleKind};
use crate::world::WorldStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

/// A rule that applies to the query, with its constraint outcome.
#[derive(Debug, Clone, Copy)]
struct Candidate<'p> {
    rule: &'p Rule,
    outcome: Tri,
}

/// A loaded policy together with its world.
pub struct PolicyEngine {
    policy: Arc<Policy>,
    world: WorldStore,
    membership: Arc<dyn MembershipOracle>,
    config: EngineConfig,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("policy", &self.policy.uid)
            .field("digest", &self.policy.digest)
            .field("world_facts", &self.world.len())
            .finish()
    }
}

impl PolicyEngine {
    /// Wraps an already loaded policy.
    pub fn new(policy: Policy, config: EngineConfig) -> Self {
        Self {
            policy: Arc::new(policy),
            world: WorldStore::new(),
            membership: Arc::new(NoMembership),
            config,
            created_at: Utc::now(),
        }
    }

    /// Loads a JSON or YAML policy document with the default configuration.
    pub fn from_document(document: &str) -> Result<Self> {
        Self::with_config(document, EngineConfig::default())
    }

    /// Loads a policy document with the given configuration.
    pub fn with_config(document: &str, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        if config.verbose {
            crate::logging::set_verbose(true);
        }
        let policy = load_policy(document, &config)?;
        tracing::info!(
            policy = policy.uid.as_deref().unwrap_or("-"),
            policy_type = policy.policy_type.as_str(),
            conflict = policy.conflict.as_str(),
            rules = policy.rule_count(),
            digest = %policy.digest,
            "policy engine created"
        );
        Ok(Self::new(policy, config))
    }

    /// Replaces the membership oracle used for party collections.
    pub fn with_membership(mut self, membership: Arc<dyn MembershipOracle>) -> Self {
        self.membership = membership;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn world(&self) -> &WorldStore {
        &self.world
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// When the engine and its world were created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Answers "may `assignee` perform `action` on `target` under `assigner`'s policy?".
    ///
    /// Only a malformed query is an error; every other outcome, including
    /// missing world facts, is a decision.
    pub fn evaluate(&self, action: &str, target: &str, assigner: &str, assignee: &str) -> Result<PolicyDecision> {
        self.evaluate_context(&QueryContext::new(action, target, assigner, assignee))
    }

    /// Evaluates a prepared query context.
    pub fn evaluate_context(&self, ctx: &QueryContext) -> Result<PolicyDecision> {
        let start = started();
        ctx.validate()?;

        let (permissions, prohibitions) = {
            let world = self.world.read();
            let evaluator =
                ConstraintEvaluator::new(ctx, &*world, &self.config).with_world_started(self.created_at);
            (
                self.candidates(RuleKind::Permission, ctx, &evaluator),
                self.candidates(RuleKind::Prohibition, ctx, &evaluator),
            )
        };

        let decision = resolve(self.policy.conflict, &permissions, &prohibitions)
            .with_policy_id(self.policy.uid.as_deref())
            .with_policy_digest(self.policy.digest.clone())
            .with_metadata("permissions", serde_json::json!(permissions.len()))
            .with_metadata("prohibitions", serde_json::json!(prohibitions.len()));
        let decision = match start {
            Some(start) => decision.with_evaluation_time(start.elapsed().as_micros() as u64),
            None => decision,
        };

        tracing::debug!(
            action = %ctx.action,
            target = %ctx.target,
            assignee = %ctx.assignee,
            decision = decision.decision.as_str(),
            rule = decision.rule_id.as_deref().unwrap_or("-"),
            "query evaluated"
        );
        Ok(decision)
    }

    /// Stores a world fact.
    pub fn world_set(&self, key: &str, value: &str) -> Result<()> {
        self.world.set(key, value)
    }

    /// Reads a world fact.
    pub fn world_get(&self, key: &str) -> Option<String> {
        self.world.get(key)
    }

    /// Removes a world fact; returns whether it existed.
    pub fn world_remove(&self, key: &str) -> bool {
        self.world.remove(key)
    }

    /// Rules of `kind` that apply to the query and are not ruled out by their constraints.
    fn candidates<'p>(
        &'p self,
        kind: RuleKind,
        ctx: &QueryContext,
        evaluator: &ConstraintEvaluator<'_>,
    ) -> Vec<Candidate<'p>> {
        self.policy
            .rules(kind)
            .iter()
            .filter_map(|rule| {
                let outcome = self.rule_outcome(rule, ctx, evaluator)?;
                tracing::debug!(rule = %rule.id, kind = kind.as_str(), outcome = outcome.as_str(), "candidate rule");
                (!outcome.is_unsatisfied()).then_some(Candidate { rule, outcome })
            })
            .collect()
    }

    /// `None` when the rule does not apply to the query at all.
    fn rule_outcome(&self, rule: &Rule, ctx: &QueryContext, evaluator: &ConstraintEvaluator<'_>) -> Option<Tri> {
        let action = rule.matching_action(&ctx.action)?;
        if !self.policy.effective_targets(rule).iter().any(|t| *t == ctx.target) {
            return None;
        }
        let assignee = self.policy.effective_assignee(rule);
        if let Some(party) = assignee {
            if !party.matches(&ctx.assignee, self.membership.as_ref()) {
                return None;
            }
        }
        if let Some(party) = self.policy.effective_assigner(rule) {
            if party.uid != ctx.assigner {
                return None;
            }
        }

        let mut parts = Vec::new();
        if let Some(constraint) = &rule.constraint {
            parts.push(evaluator.evaluate(constraint));
        }
        if let Some(refinement) = &action.refinement {
            parts.push(evaluator.evaluate(refinement));
        }
        if let Some(refinement) = assignee.and_then(|party| party.refinement.as_ref()) {
            parts.push(evaluator.evaluate(refinement));
        }
        if rule.kind == RuleKind::Permission {
            parts.extend(rule.duties.iter().map(|duty| evaluator.evaluate_duty(duty)));
        }
        Some(Tri::all(parts))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn started() -> Option<Instant> {
    Some(Instant::now())
}

// No monotonic clock on wasm32-unknown-unknown.
#[cfg(target_arch = "wasm32")]
fn started() -> Option<Instant> {
    None
}

fn first_satisfied<'a, 'p>(candidates: &'a [Candidate<'p>]) -> Option<&'a Candidate<'p>> {
    candidates.iter().find(|c| c.outcome.is_satisfied())
}

/// Combines surviving candidates into a verdict.
fn resolve(conflict: ConflictStrategy, permissions: &[Candidate<'_>], prohibitions: &[Candidate<'_>]) -> PolicyDecision {
    let permitted = first_satisfied(permissions);
    let prohibited = first_satisfied(prohibitions);

    let allow = |c: &Candidate<'_>| {
        PolicyDecision::allow(format!("Permission '{}' is satisfied", c.rule.id)).with_rule_id(&c.rule.id)
    };
    let deny = |c: &Candidate<'_>| {
        PolicyDecision::deny(format!("Prohibition '{}' applies", c.rule.id)).with_rule_id(&c.rule.id)
    };
    let undecided = |c: &Candidate<'_>, what: &str| {
        PolicyDecision::indeterminate(format!("{} '{}' depends on missing world facts", what, c.rule.id))
            .with_rule_id(&c.rule.id)
    };

    let Some(first_permission) = permissions.first() else {
        return match prohibitions.first() {
            Some(h) => deny(prohibited.unwrap_or(h)),
            None => PolicyDecision::default_deny(),
        };
    };

    let Some(first_prohibition) = prohibitions.first() else {
        return match permitted {
            Some(p) => allow(p),
            None => undecided(first_permission, "Permission"),
        };
    };

    match conflict {
        ConflictStrategy::Perm => match permitted {
            Some(p) => allow(p),
            None => undecided(first_permission, "Permission"),
        },
        ConflictStrategy::Prohibit => deny(prohibited.unwrap_or(first_prohibition)),
        ConflictStrategy::Invalid => match (permitted, prohibited) {
            (Some(p), Some(h)) => PolicyDecision::conflict(format!(
                "Permission '{}' and prohibition '{}' are both satisfied",
                p.rule.id, h.rule.id
            ))
            .with_rule_id(&p.rule.id)
            .with_metadata("conflicting_rule", serde_json::json!(h.rule.id)),
            (Some(_), None) => undecided(first_prohibition, "Prohibition"),
            (None, Some(h)) => deny(h),
            (None, None) => undecided(first_permission, "Permission"),
        },
    }
}
