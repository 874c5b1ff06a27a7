//! Evaluation context for authorization queries.

use crate::error::{OdrlError, Result};
use crate::types::odrl_term;
use serde::{Deserialize, Serialize};

/// The four arguments of an authorization query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    /// The action being requested.
    pub action: String,

    /// The asset the action applies to.
    pub target: String,

    /// The party whose policy is consulted.
    pub assigner: String,

    /// The party asking to act.
    pub assignee: String,
}

impl QueryContext {
    /// Creates a new query context.
    pub fn new(
        action: impl Into<String>,
        target: impl Into<String>,
        assigner: impl Into<String>,
        assignee: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            target: target.into(),
            assigner: assigner.into(),
            assignee: assignee.into(),
        }
    }

    /// Gets a context-bound operand value by term.
    ///
    /// Recognized terms (bare, `odrl:`-prefixed or the ODRL IRI):
    /// - "action"
    /// - "target"
    /// - "assigner"
    /// - "assignee"
    pub fn get_value(&self, term: &str) -> Option<&str> {
        match odrl_term(term)? {
            "action" => Some(&self.action),
            "target" => Some(&self.target),
            "assigner" => Some(&self.assigner),
            "assignee" => Some(&self.assignee),
            _ => None,
        }
    }

    /// Validates that every argument is present.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("action", &self.action),
            ("target", &self.target),
            ("assigner", &self.assigner),
            ("assignee", &self.assignee),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(OdrlError::MalformedQuery(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_context() -> QueryContext {
        QueryContext::new("use", "urn:asset:T", "urn:org:acme", "liumazi")
    }

    #[test]
    fn test_get_value() {
        let ctx = create_test_context();
        assert_eq!(ctx.get_value("assignee"), Some("liumazi"));
        assert_eq!(ctx.get_value("odrl:target"), Some("urn:asset:T"));
        assert_eq!(ctx.get_value("http://www.w3.org/ns/odrl/2/action"), Some("use"));
        assert_eq!(ctx.get_value("dateTime"), None);
        assert_eq!(ctx.get_value("http://vendor.example/vocab/target"), None);
        assert_eq!(ctx.get_value("urn:x:assignee"), None);
    }

    #[test]
    fn test_validate() {
        assert!(create_test_context().validate().is_ok());

        let mut ctx = create_test_context();
        ctx.assigner = "  ".to_string();
        assert!(matches!(ctx.validate(), Err(OdrlError::MalformedQuery(_))));
    }
}
