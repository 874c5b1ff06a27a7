//! Three-valued constraint evaluation.
//!
//! Evaluation is a pure read over a constraint tree, the query context and a
//! world view. Anything that keeps an atomic constraint from being decided
//! (missing operand, value not of the declared type, operator undefined for
//! the type) yields [`Tri::Indeterminate`] for that node only; logical nodes
//! then combine child results per their operator.

use crate::config::EngineConfig;
use crate::constraint::{Constraint, ConstraintNode, LogicalConstraint, RightOperand};
use crate::context::QueryContext;
use crate::policy::Rule;
use crate::types::{odrl_term, DataType, LogicalOperator};
use crate::value::{compare, compare_sets, infer_data_type, split_set, Scalar};
use crate::world::FactSource;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of evaluating a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tri {
    Satisfied,
    Unsatisfied,
    Indeterminate,
}

impl Tri {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Tri::Satisfied
        } else {
            Tri::Unsatisfied
        }
    }

    pub fn is_satisfied(self) -> bool {
        self == Tri::Satisfied
    }

    pub fn is_unsatisfied(self) -> bool {
        self == Tri::Unsatisfied
    }

    pub fn is_indeterminate(self) -> bool {
        self == Tri::Indeterminate
    }

    /// Conjunction: Unsatisfied dominates, then Indeterminate.
    pub fn all(results: impl IntoIterator<Item = Tri>) -> Tri {
        let mut undecided = false;
        for result in results {
            match result {
                Tri::Unsatisfied => return Tri::Unsatisfied,
                Tri::Indeterminate => undecided = true,
                Tri::Satisfied => {}
            }
        }
        if undecided {
            Tri::Indeterminate
        } else {
            Tri::Satisfied
        }
    }

    /// Disjunction: Satisfied dominates, then Indeterminate.
    pub fn any(results: impl IntoIterator<Item = Tri>) -> Tri {
        let mut undecided = false;
        for result in results {
            match result {
                Tri::Satisfied => return Tri::Satisfied,
                Tri::Indeterminate => undecided = true,
                Tri::Unsatisfied => {}
            }
        }
        if undecided {
            Tri::Indeterminate
        } else {
            Tri::Unsatisfied
        }
    }

    /// Exactly one Satisfied; any Indeterminate makes the count unknowable.
    pub fn exactly_one(results: impl IntoIterator<Item = Tri>) -> Tri {
        let mut satisfied = 0usize;
        for result in results {
            match result {
                Tri::Indeterminate => return Tri::Indeterminate,
                Tri::Satisfied => satisfied += 1,
                Tri::Unsatisfied => {}
            }
        }
        Tri::from_bool(satisfied == 1)
    }

    /// Ordered conjunction: the first child that is not Satisfied decides.
    pub fn in_sequence(results: impl IntoIterator<Item = Tri>) -> Tri {
        results
            .into_iter()
            .find(|result| !result.is_satisfied())
            .unwrap_or(Tri::Satisfied)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tri::Satisfied => "satisfied",
            Tri::Unsatisfied => "unsatisfied",
            Tri::Indeterminate => "indeterminate",
        }
    }
}

/// Why an atomic constraint could not be decided.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalIssue {
    /// Left operand or referenced right operand has no value.
    #[error("operand '{0}' could not be resolved")]
    MissingOperand(String),

    /// Operand value does not parse as the data type.
    #[error("value '{value}' is not a valid {data_type}")]
    TypeMismatch { value: String, data_type: &'static str },

    /// Operator is not defined for the data type or operand shape.
    #[error("operator '{operator}' is not supported for {data_type}")]
    OperatorUnsupported {
        operator: &'static str,
        data_type: &'static str,
    },
}

/// Evaluates constraint trees for one query.
pub struct ConstraintEvaluator<'a> {
    ctx: &'a QueryContext,
    world: &'a dyn FactSource,
    config: &'a EngineConfig,
    /// When the world was created; origin of `elapsedTime`.
    world_started: Option<DateTime<Utc>>,
}

impl<'a> ConstraintEvaluator<'a> {
    pub fn new(ctx: &'a QueryContext, world: &'a dyn FactSource, config: &'a EngineConfig) -> Self {
        Self {
            ctx,
            world,
            config,
            world_started: None,
        }
    }

    /// Sets the instant `elapsedTime` is measured from.
    pub fn with_world_started(mut self, started: DateTime<Utc>) -> Self {
        self.world_started = Some(started);
        self
    }

    /// Evaluates a constraint tree.
    pub fn evaluate(&self, node: &ConstraintNode) -> Tri {
        match node {
            ConstraintNode::Atomic(constraint) => self.evaluate_constraint(constraint),
            ConstraintNode::Logical(logical) => self.evaluate_logical(logical),
        }
    }

    fn evaluate_logical(&self, logical: &LogicalConstraint) -> Tri {
        let children = logical.constraints.iter().map(|child| self.evaluate(child));
        let result = match logical.operator {
            LogicalOperator::And => Tri::all(children),
            LogicalOperator::Or => Tri::any(children),
            LogicalOperator::Xone => Tri::exactly_one(children),
            LogicalOperator::AndSequence => Tri::in_sequence(children),
        };
        tracing::debug!(
            uid = logical.uid.as_deref().unwrap_or("-"),
            operator = logical.operator.as_str(),
            result = result.as_str(),
            "logical constraint evaluated"
        );
        result
    }

    fn evaluate_constraint(&self, constraint: &Constraint) -> Tri {
        match self.evaluate_atomic(constraint) {
            Ok(holds) => {
                let result = Tri::from_bool(holds);
                tracing::debug!(
                    left = %constraint.left_operand,
                    operator = constraint.operator.as_str(),
                    result = result.as_str(),
                    "constraint evaluated"
                );
                result
            }
            Err(issue @ EvalIssue::OperatorUnsupported { .. }) => {
                tracing::warn!(left = %constraint.left_operand, issue = %issue, "constraint is indeterminate");
                Tri::Indeterminate
            }
            Err(issue) => {
                tracing::debug!(left = %constraint.left_operand, issue = %issue, "constraint is indeterminate");
                Tri::Indeterminate
            }
        }
    }

    /// Decides an atomic constraint, or reports why it cannot be decided.
    pub fn evaluate_atomic(&self, constraint: &Constraint) -> Result<bool, EvalIssue> {
        let left = self
            .resolve_left(constraint)
            .ok_or_else(|| EvalIssue::MissingOperand(constraint.left_operand.clone()))?;
        let operator = constraint.operator;

        if operator.is_set_operator() {
            let left_items = split_set(&left);
            let right_items = match &constraint.right_operand {
                RightOperand::Set(items) => items.clone(),
                RightOperand::Literal(raw) => split_set(raw),
                RightOperand::Reference(key) => split_set(self.resolve_reference(key)?),
            };
            let data_type = constraint.data_type.unwrap_or_else(|| {
                infer_data_type(
                    &constraint.left_operand,
                    left_items.first().map(String::as_str).unwrap_or_default(),
                    right_items.first().map(String::as_str).unwrap_or_default(),
                )
            });
            return compare_sets(operator, &left_items, &right_items, data_type).ok_or(
                EvalIssue::OperatorUnsupported {
                    operator: operator.as_str(),
                    data_type: data_type.as_str(),
                },
            );
        }

        let right = match &constraint.right_operand {
            RightOperand::Literal(raw) => raw.as_str(),
            RightOperand::Set(items) if items.len() == 1 => items[0].as_str(),
            RightOperand::Set(_) => {
                return Err(EvalIssue::OperatorUnsupported {
                    operator: operator.as_str(),
                    data_type: "set",
                })
            }
            RightOperand::Reference(key) => self.resolve_reference(key)?,
        };

        let data_type = constraint
            .data_type
            .unwrap_or_else(|| infer_data_type(&constraint.left_operand, &left, right));
        let unsupported = EvalIssue::OperatorUnsupported {
            operator: operator.as_str(),
            data_type: data_type.as_str(),
        };
        if operator.is_ordering() && !data_type.is_ordered() {
            return Err(unsupported);
        }

        let left_value = coerce(&left, data_type)?;
        let right_value = coerce(right, data_type)?;
        compare(operator, &left_value, &right_value).ok_or(unsupported)
    }

    /// Evaluates whether a duty attached to a permission holds.
    ///
    /// A duty whose own constraint is Unsatisfied is not in force. Otherwise
    /// its state comes from the world fact `<duty_fact_prefix><uid>`.
    pub fn evaluate_duty(&self, duty: &Rule) -> Tri {
        if let Some(constraint) = &duty.constraint {
            if self.evaluate(constraint).is_unsatisfied() {
                return Tri::Satisfied;
            }
        }
        let Some(uid) = duty.uid.as_deref() else {
            tracing::debug!(duty = %duty.id, "duty without uid cannot be tracked");
            return Tri::Indeterminate;
        };
        let key = self.config.duty_fact_key(uid);
        let state = self.world.fact(&key).map(|v| v.trim().to_ascii_lowercase());
        let result = match state.as_deref() {
            Some("true") | Some("fulfilled") => Tri::Satisfied,
            Some("false") | Some("violated") if duty.has_consequences() => Tri::Indeterminate,
            Some("false") | Some("violated") => Tri::Unsatisfied,
            _ => Tri::Indeterminate,
        };
        tracing::debug!(duty = %duty.id, key = %key, result = result.as_str(), "duty evaluated");
        result
    }

    /// Left operand: query context, then world by term and by ODRL IRI, then the clock.
    fn resolve_left(&self, constraint: &Constraint) -> Option<String> {
        if let Some(value) = self.ctx.get_value(&constraint.left_operand) {
            return Some(value.to_string());
        }
        for key in constraint.left_operand_keys() {
            if let Some(value) = self.world.fact(&key) {
                return Some(value.to_string());
            }
        }
        if !self.config.system_clock_fallback {
            return None;
        }
        let term = odrl_term(&constraint.left_operand)?;
        if term.eq_ignore_ascii_case("dateTime") {
            return Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        }
        if term.eq_ignore_ascii_case("elapsedTime") {
            let millis = (Utc::now() - self.world_started?).num_milliseconds().max(0);
            return Some(format!("PT{}.{:03}S", millis / 1000, millis % 1000));
        }
        None
    }

    fn resolve_reference(&self, key: &str) -> Result<&'a str, EvalIssue> {
        self.world
            .fact(key)
            .ok_or_else(|| EvalIssue::MissingOperand(key.to_string()))
    }
}

fn coerce(raw: &str, data_type: DataType) -> Result<Scalar, EvalIssue> {
    Scalar::coerce(raw, data_type).ok_or_else(|| EvalIssue::TypeMismatch {
        value: raw.to_string(),
        data_type: data_type.as_str(),
    })
}
