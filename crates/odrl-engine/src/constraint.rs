//! Constraint trees.
//!
//! A constraint is either atomic (`leftOperand operator rightOperand`) or
//! logical (an operator over an ordered list of child constraints). Trees are
//! built by the loader and never contain back-references, so they are finite.

use crate::types::{DataType, LogicalOperator, Operator, ODRL_NS};
use serde::{Deserialize, Serialize};

/// Right-hand side of an atomic constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RightOperand {
    /// A single literal value.
    Literal(String),
    /// A literal set, used by the set-based operators.
    Set(Vec<String>),
    /// A world key whose current value is the operand.
    Reference(String),
}

/// An atomic constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub uid: Option<String>,
    /// Left operand term as written, e.g. `dateTime` or `odrl:purpose`.
    pub left_operand: String,
    pub operator: Operator,
    pub right_operand: RightOperand,
    pub data_type: Option<DataType>,
    pub unit: Option<String>,
}

impl Constraint {
    /// Creates a constraint with a literal right operand and no data type.
    pub fn new(left_operand: impl Into<String>, operator: Operator, right_operand: RightOperand) -> Self {
        Self {
            uid: None,
            left_operand: left_operand.into(),
            operator,
            right_operand,
            data_type: None,
            unit: None,
        }
    }

    /// Sets the data type.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// World keys consulted for the left operand, most specific first.
    ///
    /// An ODRL term is also looked up bare and by IRI; any other IRI only as written.
    pub fn left_operand_keys(&self) -> Vec<String> {
        let written = self.left_operand.trim().to_string();
        let Some(term) = crate::types::odrl_term(&written).map(str::to_string) else {
            return vec![written];
        };
        let mut keys = vec![written];
        if term != keys[0] {
            keys.push(term.clone());
        }
        let iri = format!("{}{}", ODRL_NS, term);
        if iri != keys[0] {
            keys.push(iri);
        }
        keys
    }
}

/// A logical constraint over child constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalConstraint {
    pub uid: Option<String>,
    pub operator: LogicalOperator,
    pub constraints: Vec<ConstraintNode>,
}

/// A node of a constraint tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintNode {
    Atomic(Constraint),
    Logical(LogicalConstraint),
}

impl ConstraintNode {
    /// Conjunction of `nodes`; a single node is returned as-is.
    pub fn all_of(mut nodes: Vec<ConstraintNode>) -> Option<ConstraintNode> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(ConstraintNode::Logical(LogicalConstraint {
                uid: None,
                operator: LogicalOperator::And,
                constraints: nodes,
            })),
        }
    }

    /// Nesting depth; an atomic constraint has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            ConstraintNode::Atomic(_) => 1,
            ConstraintNode::Logical(logical) => {
                1 + logical.constraints.iter().map(ConstraintNode::depth).max().unwrap_or(0)
            }
        }
    }

    /// Number of atomic constraints in the tree.
    pub fn atomic_count(&self) -> usize {
        match self {
            ConstraintNode::Atomic(_) => 1,
            ConstraintNode::Logical(logical) => {
                logical.constraints.iter().map(ConstraintNode::atomic_count).sum()
            }
        }
    }

    pub fn uid(&self) -> Option<&str> {
        match self {
            ConstraintNode::Atomic(c) => c.uid.as_deref(),
            ConstraintNode::Logical(l) => l.uid.as_deref(),
        }
    }
}

impl From<Constraint> for ConstraintNode {
    fn from(constraint: Constraint) -> Self {
        ConstraintNode::Atomic(constraint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(left: &str) -> ConstraintNode {
        Constraint::new(left, Operator::Eq, RightOperand::Literal("x".into())).into()
    }

    #[test]
    fn test_depth_and_count() {
        let inner = ConstraintNode::all_of(vec![atom("a"), atom("b")]).unwrap();
        let outer = ConstraintNode::Logical(LogicalConstraint {
            uid: Some("urn:c:1".into()),
            operator: LogicalOperator::Or,
            constraints: vec![inner, atom("c")],
        });
        assert_eq!(outer.depth(), 3);
        assert_eq!(outer.atomic_count(), 3);
        assert_eq!(outer.uid(), Some("urn:c:1"));
    }

    #[test]
    fn test_all_of_single_is_unwrapped() {
        let node = ConstraintNode::all_of(vec![atom("a")]).unwrap();
        assert!(matches!(node, ConstraintNode::Atomic(_)));
        assert!(ConstraintNode::all_of(Vec::new()).is_none());
    }

    #[test]
    fn test_left_operand_keys() {
        let c = Constraint::new("odrl:dateTime", Operator::Lt, RightOperand::Literal("2025-01-01".into()));
        assert_eq!(
            c.left_operand_keys(),
            vec![
                "odrl:dateTime".to_string(),
                "dateTime".to_string(),
                "http://www.w3.org/ns/odrl/2/dateTime".to_string()
            ]
        );

        let foreign = Constraint::new(
            "http://vendor.example/vocab/target",
            Operator::Eq,
            RightOperand::Literal("gold".into()),
        );
        assert_eq!(foreign.left_operand_keys(), vec!["http://vendor.example/vocab/target".to_string()]);
    }
}
