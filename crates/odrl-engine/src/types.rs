//! ODRL vocabulary terms used by the policy model.

use serde::{Deserialize, Serialize};

/// ODRL 2.2 namespace IRI.
pub const ODRL_NS: &str = "http://www.w3.org/ns/odrl/2/";

/// Reduces a term given as `lt`, `odrl:lt` or a full IRI to its local name.
pub fn local_name(term: &str) -> &str {
    let term = term.trim();
    match term.rfind(|c| c == '/' || c == '#' || c == ':') {
        Some(idx) if idx + 1 < term.len() => &term[idx + 1..],
        _ => term,
    }
}

/// The ODRL term named by `term`, when it is bare, `odrl:`-prefixed or in the ODRL namespace.
///
/// Terms from any other vocabulary yield `None`.
pub fn odrl_term(term: &str) -> Option<&str> {
    let term = term.trim();
    let rest = term
        .strip_prefix(ODRL_NS)
        .or_else(|| term.strip_prefix("odrl:"))
        .unwrap_or(term);
    let bare = !rest.is_empty() && !rest.contains(|c| c == ':' || c == '/' || c == '#');
    bare.then_some(rest)
}

/// Term equality: ODRL terms compare by case-insensitive local name, any other IRI exactly.
pub fn term_eq(a: &str, b: &str) -> bool {
    match (odrl_term(a), odrl_term(b)) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => a.trim() == b.trim(),
    }
}

/// Comparison operator of an atomic constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lteq,
    Gt,
    Gteq,
    IsA,
    HasPart,
    IsPartOf,
    IsAllOf,
    IsAnyOf,
    IsNoneOf,
}

impl Operator {
    /// Parses an operator term; `None` when unknown.
    pub fn parse(term: &str) -> Option<Self> {
        let op = match local_name(term).to_ascii_lowercase().as_str() {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "lt" => Operator::Lt,
            "lteq" => Operator::Lteq,
            "gt" => Operator::Gt,
            "gteq" => Operator::Gteq,
            "isa" => Operator::IsA,
            "haspart" => Operator::HasPart,
            "ispartof" => Operator::IsPartOf,
            "isallof" => Operator::IsAllOf,
            "isanyof" => Operator::IsAnyOf,
            "isnoneof" => Operator::IsNoneOf,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Lteq => "lteq",
            Operator::Gt => "gt",
            Operator::Gteq => "gteq",
            Operator::IsA => "isA",
            Operator::HasPart => "hasPart",
            Operator::IsPartOf => "isPartOf",
            Operator::IsAllOf => "isAllOf",
            Operator::IsAnyOf => "isAnyOf",
            Operator::IsNoneOf => "isNoneOf",
        }
    }

    /// True for the set-based operators.
    pub fn is_set_operator(&self) -> bool {
        matches!(
            self,
            Operator::IsA
                | Operator::HasPart
                | Operator::IsPartOf
                | Operator::IsAllOf
                | Operator::IsAnyOf
                | Operator::IsNoneOf
        )
    }

    /// True for the ordering operators that need a total order on the data type.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Operator::Lt | Operator::Lteq | Operator::Gt | Operator::Gteq)
    }
}

/// Operator of a logical constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
    Xone,
    AndSequence,
}

impl LogicalOperator {
    pub fn parse(term: &str) -> Option<Self> {
        let op = match local_name(term).to_ascii_lowercase().as_str() {
            "and" => LogicalOperator::And,
            "or" => LogicalOperator::Or,
            "xone" => LogicalOperator::Xone,
            "andsequence" => LogicalOperator::AndSequence,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
            LogicalOperator::Xone => "xone",
            LogicalOperator::AndSequence => "andSequence",
        }
    }
}

/// Data type used to interpret operand values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    Time,
    DateTime,
    Duration,
}

impl DataType {
    /// Parses an XSD data type name (`integer`, `xsd:integer`, or the XSD IRI).
    pub fn parse(term: &str) -> Option<Self> {
        let ty = match local_name(term).to_ascii_lowercase().as_str() {
            "string" | "anyuri" | "token" | "language" | "normalizedstring" | "nmtoken"
            | "hexbinary" | "base64binary" => DataType::String,
            "integer" | "int" | "long" | "short" | "byte" | "nonnegativeinteger"
            | "positiveinteger" | "unsignedint" | "unsignedlong" | "unsignedshort"
            | "unsignedbyte" | "gyear" => DataType::Integer,
            "decimal" | "float" | "double" => DataType::Decimal,
            "boolean" => DataType::Boolean,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "datetime" | "datetimestamp" => DataType::DateTime,
            "duration" | "daytimeduration" | "yearmonthduration" => DataType::Duration,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "dateTime",
            DataType::Duration => "duration",
        }
    }

    /// True when values of this type have a total order.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, DataType::String | DataType::Boolean)
    }
}

/// Policy-level conflict resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Permissions override prohibitions.
    Perm,
    /// Prohibitions override permissions.
    Prohibit,
    /// Conflicting satisfied rules are an error.
    #[default]
    Invalid,
}

impl ConflictStrategy {
    pub fn parse(term: &str) -> Option<Self> {
        let strategy = match local_name(term).to_ascii_lowercase().as_str() {
            "perm" => ConflictStrategy::Perm,
            "prohibit" => ConflictStrategy::Prohibit,
            "invalid" => ConflictStrategy::Invalid,
            _ => return None,
        };
        Some(strategy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::Perm => "perm",
            ConflictStrategy::Prohibit => "prohibit",
            ConflictStrategy::Invalid => "invalid",
        }
    }
}

/// Subclass of the top-level policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    Policy,
    Set,
    Offer,
    Agreement,
    Request,
    Ticket,
    Assertion,
    Privacy,
}

impl PolicyType {
    pub fn parse(term: &str) -> Option<Self> {
        let ty = match local_name(term).to_ascii_lowercase().as_str() {
            "policy" => PolicyType::Policy,
            "set" => PolicyType::Set,
            "offer" => PolicyType::Offer,
            "agreement" => PolicyType::Agreement,
            "request" => PolicyType::Request,
            "ticket" => PolicyType::Ticket,
            "assertion" | "assert" => PolicyType::Assertion,
            "privacy" => PolicyType::Privacy,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Policy => "Policy",
            PolicyType::Set => "Set",
            PolicyType::Offer => "Offer",
            PolicyType::Agreement => "Agreement",
            PolicyType::Request => "Request",
            PolicyType::Ticket => "Ticket",
            PolicyType::Assertion => "Assertion",
            PolicyType::Privacy => "Privacy",
        }
    }

    /// Full ODRL IRI of this policy class.
    pub fn iri(&self) -> String {
        format!("{}{}", ODRL_NS, self.as_str())
    }
}

/// Whether a party names a single principal or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PartyType {
    #[default]
    Party,
    PartyCollection,
}

impl PartyType {
    pub fn parse(term: &str) -> Option<Self> {
        match local_name(term).to_ascii_lowercase().as_str() {
            "party" => Some(PartyType::Party),
            "partycollection" => Some(PartyType::PartyCollection),
            _ => None,
        }
    }
}

/// Kind of rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Permission,
    Prohibition,
    Duty,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Permission => "permission",
            RuleKind::Prohibition => "prohibition",
            RuleKind::Duty => "duty",
        }
    }
}
