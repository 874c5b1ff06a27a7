//! Policy document loader.
//!
//! Documents arrive as JSON or YAML with JSON-LD context already normalized
//! into plain keys. Both formats are read into a `serde_json::Value` first and
//! then walked by [`PolicyLoader`], which reports failures with the path of
//! the offending field (e.g. `permission[1].constraint.and[0].operator`).

use crate::config::EngineConfig;
use crate::constraint::{Constraint, ConstraintNode, LogicalConstraint, RightOperand};
use crate::digest::policy_digest;
use crate::error::{OdrlError, Result};
use crate::policy::{Action, Party, Policy, Rule};
use crate::types::{
    local_name, ConflictStrategy, DataType, LogicalOperator, Operator, PartyType, PolicyType,
    RuleKind,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Supported policy file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    Yaml,
    Json,
}

impl PolicyFormat {
    /// Detects format from file extension.
    pub fn from_extension(path: &str) -> Option<Self> {
        if path.ends_with(".yaml") || path.ends_with(".yml") {
            Some(PolicyFormat::Yaml)
        } else if path.ends_with(".json") || path.ends_with(".jsonld") {
            Some(PolicyFormat::Json)
        } else {
            None
        }
    }

    /// Detects format from content.
    pub fn detect(content: &str) -> Self {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            PolicyFormat::Json
        } else {
            PolicyFormat::Yaml
        }
    }
}

/// Parses a document into a JSON value, auto-detecting the format.
pub fn parse_document(content: &str) -> Result<Value> {
    parse_document_with_format(content, PolicyFormat::detect(content))
}

/// Parses a document into a JSON value.
pub fn parse_document_with_format(content: &str, format: PolicyFormat) -> Result<Value> {
    match format {
        PolicyFormat::Json => Ok(serde_json::from_str(content)?),
        PolicyFormat::Yaml => Ok(serde_yaml::from_str(content)?),
    }
}

/// Parses and loads a policy, auto-detecting the format.
pub fn load_policy(content: &str, config: &EngineConfig) -> Result<Policy> {
    load_policy_with_format(content, PolicyFormat::detect(content), config)
}

/// Parses and loads a policy in the given format.
pub fn load_policy_with_format(
    content: &str,
    format: PolicyFormat,
    config: &EngineConfig,
) -> Result<Policy> {
    let document = parse_document_with_format(content, format)?;
    PolicyLoader::new(config).load(&document)
}

/// Builds the policy model from a parsed document.
pub struct PolicyLoader<'a> {
    config: &'a EngineConfig,
    /// Policy-level parties, shared with rules that name them by uid.
    parties: Vec<Arc<Party>>,
}

impl<'a> PolicyLoader<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            parties: Vec::new(),
        }
    }

    /// Loads a policy from a parsed document.
    pub fn load(&mut self, document: &Value) -> Result<Policy> {
        let obj = document
            .as_object()
            .ok_or_else(|| OdrlError::invalid("$", "policy document must be an object"))?;

        let type_value = field(obj, &["type", "@type"]).ok_or_else(|| OdrlError::missing("type"))?;
        let policy_type = parse_policy_type(type_value)?;
        let uid = string_field(obj, &["uid", "@id"], "uid")?;

        let assigner = match field(obj, &["assigner"]) {
            Some(value) => Some(self.parse_party(value, "assigner")?),
            None => None,
        };
        let assignee = match field(obj, &["assignee"]) {
            Some(value) => Some(self.parse_party(value, "assignee")?),
            None => None,
        };
        match policy_type {
            PolicyType::Agreement if assigner.is_none() => return Err(OdrlError::missing("assigner")),
            PolicyType::Agreement if assignee.is_none() => return Err(OdrlError::missing("assignee")),
            PolicyType::Offer if assigner.is_none() => return Err(OdrlError::missing("assigner")),
            _ => {}
        }
        self.parties.extend(assigner.iter().cloned());
        self.parties.extend(assignee.iter().cloned());

        let targets = match field(obj, &["target"]) {
            Some(value) => parse_targets(value, "target")?,
            None => Vec::new(),
        };

        let conflict = match field(obj, &["conflict"]) {
            Some(value) => {
                let term = term_of(value).ok_or_else(|| OdrlError::invalid("conflict", "expected a term"))?;
                ConflictStrategy::parse(term).ok_or_else(|| {
                    OdrlError::invalid("conflict", format!("unrecognized conflict strategy '{}'", term))
                })?
            }
            None => ConflictStrategy::default(),
        };

        let inherit_from = match field(obj, &["inheritFrom"]) {
            Some(value) => parse_terms(value, "inheritFrom")?,
            None => Vec::new(),
        };
        if !inherit_from.is_empty() {
            tracing::warn!(
                policy = uid.as_deref().unwrap_or("-"),
                parents = ?inherit_from,
                "inheritFrom is recorded but not merged"
            );
        }

        let profiles = match field(obj, &["profile"]) {
            Some(value) => parse_terms(value, "profile")?,
            None => Vec::new(),
        };

        let title = field(obj, &["title", "dc:title"]).and_then(literal_string);

        let has_targets = !targets.is_empty();
        let permissions = self.parse_rules(obj, "permission", None, RuleKind::Permission, has_targets)?;
        let prohibitions = self.parse_rules(obj, "prohibition", None, RuleKind::Prohibition, has_targets)?;
        let obligations = self.parse_rules(obj, "obligation", None, RuleKind::Duty, has_targets)?;

        tracing::debug!(
            policy = uid.as_deref().unwrap_or("-"),
            policy_type = policy_type.as_str(),
            permissions = permissions.len(),
            prohibitions = prohibitions.len(),
            obligations = obligations.len(),
            "policy document loaded"
        );

        Ok(Policy {
            uid,
            policy_type,
            assigner,
            assignee,
            targets,
            title,
            conflict,
            inherit_from,
            profiles,
            permissions,
            prohibitions,
            obligations,
            digest: policy_digest(document),
        })
    }

    /// Parses the rule list under `key`; `parent` is the path of the owning rule, if any.
    fn parse_rules(
        &self,
        obj: &Map<String, Value>,
        key: &str,
        parent: Option<&str>,
        kind: RuleKind,
        policy_has_targets: bool,
    ) -> Result<Vec<Rule>> {
        let Some(value) = obj.get(key) else {
            return Ok(Vec::new());
        };
        one_or_many(value)
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let path = match parent {
                    Some(parent) => format!("{}.{}[{}]", parent, key, i),
                    None => format!("{}[{}]", key, i),
                };
                self.parse_rule(item, &path, kind, policy_has_targets)
            })
            .collect()
    }

    fn parse_rule(&self, value: &Value, path: &str, kind: RuleKind, policy_has_targets: bool) -> Result<Rule> {
        let obj = value
            .as_object()
            .ok_or_else(|| OdrlError::invalid(path, "rule must be an object"))?;

        let uid = string_field(obj, &["uid", "@id"], &format!("{}.uid", path))?;

        let action_path = format!("{}.action", path);
        let action_value = obj.get("action").ok_or_else(|| OdrlError::missing(&action_path))?;
        let actions = self.parse_actions(action_value, &action_path)?;

        let targets = match obj.get("target") {
            Some(value) => parse_targets(value, &format!("{}.target", path))?,
            None => Vec::new(),
        };
        if targets.is_empty() && !policy_has_targets && kind != RuleKind::Duty {
            return Err(OdrlError::missing(format!("{}.target", path)));
        }

        let assigner = match obj.get("assigner") {
            Some(value) => Some(self.parse_party(value, &format!("{}.assigner", path))?),
            None => None,
        };
        let assignee = match obj.get("assignee") {
            Some(value) => Some(self.parse_party(value, &format!("{}.assignee", path))?),
            None => None,
        };

        let constraint = self
            .parse_constraint_field(obj.get("constraint"), &format!("{}.constraint", path))?
            .map(Arc::new);

        let nested_key = match kind {
            RuleKind::Permission => "duty",
            RuleKind::Prohibition => "remedy",
            RuleKind::Duty => "consequence",
        };
        let nested = self.parse_rules(obj, nested_key, Some(path), RuleKind::Duty, true)?;

        let (duties, remedies, consequences) = match kind {
            RuleKind::Permission => (nested, Vec::new(), Vec::new()),
            RuleKind::Prohibition => (Vec::new(), nested, Vec::new()),
            RuleKind::Duty => (Vec::new(), Vec::new(), nested),
        };

        Ok(Rule {
            id: uid.clone().unwrap_or_else(|| path.to_string()),
            uid,
            kind,
            actions,
            targets,
            assigner,
            assignee,
            constraint,
            duties,
            remedies,
            consequences,
        })
    }

    fn parse_actions(&self, value: &Value, path: &str) -> Result<Vec<Action>> {
        let actions = match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.parse_action(item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>>>()?,
            other => vec![self.parse_action(other, path)?],
        };
        if actions.is_empty() {
            return Err(OdrlError::invalid(path, "action must not be empty"));
        }
        Ok(actions)
    }

    fn parse_action(&self, value: &Value, path: &str) -> Result<Action> {
        match value {
            Value::String(name) => Ok(Action::new(non_empty(name, path)?)),
            Value::Object(obj) => {
                let name = field(obj, &["rdf:value", "value", "@id", "uid", "name"])
                    .and_then(term_of)
                    .ok_or_else(|| OdrlError::missing(format!("{}.rdf:value", path)))?;
                let refinement = self
                    .parse_constraint_field(obj.get("refinement"), &format!("{}.refinement", path))?
                    .map(Arc::new);
                Ok(Action {
                    name: non_empty(name, path)?,
                    refinement,
                })
            }
            _ => Err(OdrlError::invalid(path, "action must be a term or an object")),
        }
    }

    fn parse_party(&self, value: &Value, path: &str) -> Result<Arc<Party>> {
        match value {
            Value::String(uid) => {
                let uid = non_empty(uid, path)?;
                if let Some(shared) = self.parties.iter().find(|p| p.uid == uid) {
                    return Ok(Arc::clone(shared));
                }
                Ok(Arc::new(Party::new(uid)))
            }
            Value::Object(obj) => {
                let uid = field(obj, &["uid", "@id"])
                    .and_then(Value::as_str)
                    .ok_or_else(|| OdrlError::missing(format!("{}.uid", path)))?;
                let uid = non_empty(uid, &format!("{}.uid", path))?;

                let party_type = match field(obj, &["type", "@type"]) {
                    Some(ty) => {
                        let term = term_of(ty).unwrap_or_default();
                        PartyType::parse(term).ok_or_else(|| {
                            OdrlError::invalid(format!("{}.type", path), format!("unrecognized party type '{}'", term))
                        })?
                    }
                    None => PartyType::default(),
                };
                let refinement = self
                    .parse_constraint_field(obj.get("refinement"), &format!("{}.refinement", path))?
                    .map(Arc::new);
                let source = field(obj, &["source"]).and_then(term_of).map(str::to_string);

                Ok(Arc::new(Party {
                    uid,
                    party_type,
                    refinement,
                    source,
                }))
            }
            _ => Err(OdrlError::invalid(path, "party must be a URI or an object")),
        }
    }

    /// Parses a `constraint`/`refinement` field: a node, or an array read as an implicit `and`.
    fn parse_constraint_field(&self, value: Option<&Value>, path: &str) -> Result<Option<ConstraintNode>> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) if items.len() == 1 => {
                self.parse_node(&items[0], &format!("{}[0]", path), 1).map(Some)
            }
            Some(Value::Array(items)) => {
                let children = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.parse_node(item, &format!("{}[{}]", path, i), 2))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ConstraintNode::all_of(children))
            }
            Some(other) => self.parse_node(other, path, 1).map(Some),
        }
    }

    fn parse_node(&self, value: &Value, path: &str, depth: usize) -> Result<ConstraintNode> {
        let max = self.config.max_constraint_depth;
        if depth > max {
            return Err(OdrlError::DepthExceeded {
                path: path.to_string(),
                max,
            });
        }

        let obj = value
            .as_object()
            .ok_or_else(|| OdrlError::invalid(path, "constraint must be an object"))?;
        let uid = string_field(obj, &["uid", "@id"], &format!("{}.uid", path))?;

        // Shorthand form: {"and": [..]}
        for (key, children) in obj {
            if let (Some(operator), Value::Array(items)) = (LogicalOperator::parse(key), children) {
                let child_path = format!("{}.{}", path, local_name(key));
                return self.parse_logical(uid, operator, items, &child_path, depth);
            }
        }

        let is_logical_type = field(obj, &["type", "@type"])
            .and_then(term_of)
            .map(|t| local_name(t).eq_ignore_ascii_case("LogicalConstraint"))
            .unwrap_or(false);
        let nested = obj.get("constraint").and_then(Value::as_array);

        if is_logical_type || (nested.is_some() && !obj.contains_key("leftOperand")) {
            let op_path = format!("{}.operator", path);
            let term = obj
                .get("operator")
                .and_then(term_of)
                .ok_or_else(|| OdrlError::missing(&op_path))?;
            let operator = LogicalOperator::parse(term).ok_or_else(|| OdrlError::UnknownOperator {
                path: op_path.clone(),
                value: term.to_string(),
            })?;
            let items = nested.ok_or_else(|| OdrlError::missing(format!("{}.constraint", path)))?;
            return self.parse_logical(uid, operator, items, &format!("{}.constraint", path), depth);
        }

        self.parse_atomic(obj, uid, path).map(ConstraintNode::Atomic)
    }

    fn parse_logical(
        &self,
        uid: Option<String>,
        operator: LogicalOperator,
        items: &[Value],
        path: &str,
        depth: usize,
    ) -> Result<ConstraintNode> {
        if items.is_empty() {
            return Err(OdrlError::invalid(path, "logical constraint needs at least one operand"));
        }
        let constraints = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.parse_node(item, &format!("{}[{}]", path, i), depth + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(ConstraintNode::Logical(LogicalConstraint {
            uid,
            operator,
            constraints,
        }))
    }

    fn parse_atomic(&self, obj: &Map<String, Value>, uid: Option<String>, path: &str) -> Result<Constraint> {
        let left_path = format!("{}.leftOperand", path);
        let left_operand = obj
            .get("leftOperand")
            .and_then(term_of)
            .ok_or_else(|| OdrlError::missing(&left_path))?;
        let left_operand = non_empty(left_operand, &left_path)?;

        let op_path = format!("{}.operator", path);
        let term = obj
            .get("operator")
            .and_then(term_of)
            .ok_or_else(|| OdrlError::missing(&op_path))?;
        let operator = Operator::parse(term).ok_or_else(|| OdrlError::UnknownOperator {
            path: op_path,
            value: term.to_string(),
        })?;

        let mut data_type = match obj.get("dataType") {
            Some(value) => {
                let term = term_of(value).unwrap_or_default();
                Some(DataType::parse(term).ok_or_else(|| {
                    OdrlError::invalid(format!("{}.dataType", path), format!("unrecognized data type '{}'", term))
                })?)
            }
            None => None,
        };

        let right_path = format!("{}.rightOperand", path);
        let right_operand = if let Some(reference) = obj.get("rightOperandReference") {
            let key = term_of(reference)
                .ok_or_else(|| OdrlError::invalid(format!("{}.rightOperandReference", path), "expected a key"))?;
            RightOperand::Reference(key.to_string())
        } else {
            let value = obj.get("rightOperand").ok_or_else(|| OdrlError::missing(&right_path))?;
            let (operand, typed) = parse_right_operand(value, &right_path)?;
            if data_type.is_none() {
                data_type = typed;
            }
            operand
        };

        let unit = obj.get("unit").and_then(term_of).map(str::to_string);

        Ok(Constraint {
            uid,
            left_operand,
            operator,
            right_operand,
            data_type,
            unit,
        })
    }
}

fn parse_policy_type(value: &Value) -> Result<PolicyType> {
    // JSON-LD permits several types; the first recognized one wins.
    let terms: Vec<&str> = one_or_many(value).into_iter().filter_map(term_of).collect();
    terms
        .iter()
        .find_map(|t| PolicyType::parse(t))
        .ok_or_else(|| OdrlError::invalid("type", format!("unrecognized policy type {:?}", terms)))
}

fn parse_right_operand(value: &Value, path: &str) -> Result<(RightOperand, Option<DataType>)> {
    match value {
        Value::Array(items) => {
            let elements = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    literal_string(item)
                        .ok_or_else(|| OdrlError::invalid(format!("{}[{}]", path, i), "expected a literal"))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((RightOperand::Set(elements), None))
        }
        Value::Object(obj) if obj.contains_key("@value") => {
            let literal = obj
                .get("@value")
                .and_then(literal_string)
                .ok_or_else(|| OdrlError::invalid(path, "expected a literal @value"))?;
            let typed = obj.get("@type").and_then(Value::as_str).and_then(DataType::parse);
            Ok((RightOperand::Literal(literal), typed))
        }
        Value::Object(obj) => {
            let key = field(obj, &["@id", "uid"])
                .and_then(Value::as_str)
                .ok_or_else(|| OdrlError::invalid(path, "expected a literal, a set or an @id reference"))?;
            Ok((RightOperand::Reference(key.to_string()), None))
        }
        Value::Null => Err(OdrlError::missing(path)),
        other => {
            let literal = literal_string(other).ok_or_else(|| OdrlError::invalid(path, "expected a literal"))?;
            Ok((RightOperand::Literal(literal), None))
        }
    }
}

fn parse_targets(value: &Value, path: &str) -> Result<Vec<String>> {
    one_or_many(value)
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let target = match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => field(obj, &["uid", "@id"]).and_then(Value::as_str),
                _ => None,
            };
            target
                .filter(|t| !t.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| OdrlError::invalid(format!("{}[{}]", path, i), "target must be a non-empty URI"))
        })
        .collect()
}

fn parse_terms(value: &Value, path: &str) -> Result<Vec<String>> {
    one_or_many(value)
        .into_iter()
        .map(|item| {
            term_of(item)
                .map(str::to_string)
                .ok_or_else(|| OdrlError::invalid(path, "expected a URI or a list of URIs"))
        })
        .collect()
}

fn field<'v>(obj: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null())
}

fn string_field(obj: &Map<String, Value>, keys: &[&str], path: &str) -> Result<Option<String>> {
    match field(obj, keys) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(OdrlError::invalid(path, "expected a string")),
    }
}

/// A term given as a string or as `{"@id": ..}`.
fn term_of(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => field(obj, &["@id", "uid"]).and_then(Value::as_str),
        _ => None,
    }
}

fn literal_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(obj) => obj
            .get("@value")
            .or_else(|| obj.get("@id"))
            .and_then(literal_string),
        _ => None,
    }
}

fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn non_empty(value: &str, path: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OdrlError::invalid(path, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_MAX_DEPTH, DEPTH_CEILING};

    fn load(doc: &str) -> Result<Policy> {
        load_policy(doc, &EngineConfig::default())
    }

    const AGREEMENT: &str = r#"{
        "@context": "http://www.w3.org/ns/odrl.jsonld",
        "type": "Agreement",
        "uid": "urn:policy:1",
        "assigner": "urn:org:acme",
        "assignee": {"uid": "liumazi", "type": "Party"},
        "target": "urn:asset:T",
        "conflict": "perm",
        "permission": [{
            "action": "use",
            "assignee": "liumazi",
            "constraint": [{
                "leftOperand": "dateTime",
                "operator": "lt",
                "rightOperand": {"@value": "2025-12-31", "@type": "xsd:date"}
            }],
            "duty": [{"uid": "urn:duty:pay", "action": "compensate"}]
        }],
        "prohibition": [{"action": "odrl:distribute"}],
        "somethingNew": {"ignored": true}
    }"#;

    #[test]
    fn test_format_detection() {
        assert_eq!(PolicyFormat::detect(r#"{"type": "Set"}"#), PolicyFormat::Json);
        assert_eq!(PolicyFormat::detect("type: Set"), PolicyFormat::Yaml);
        assert_eq!(PolicyFormat::from_extension("policy.jsonld"), Some(PolicyFormat::Json));
    }

    #[test]
    fn test_load_agreement() {
        let policy = load(AGREEMENT).unwrap();
        assert_eq!(policy.policy_type, PolicyType::Agreement);
        assert_eq!(policy.uid.as_deref(), Some("urn:policy:1"));
        assert_eq!(policy.conflict, ConflictStrategy::Perm);
        assert_eq!(policy.targets, vec!["urn:asset:T".to_string()]);

        let permission = &policy.permissions[0];
        assert_eq!(permission.id, "permission[0]");
        assert_eq!(permission.duties.len(), 1);
        assert_eq!(permission.duties[0].id, "urn:duty:pay");

        let constraint = permission.constraint.as_deref().unwrap();
        match constraint {
            ConstraintNode::Atomic(c) => {
                assert_eq!(c.operator, Operator::Lt);
                assert_eq!(c.data_type, Some(DataType::Date));
                assert_eq!(c.right_operand, RightOperand::Literal("2025-12-31".into()));
            }
            other => panic!("unexpected node {:?}", other),
        }
        assert!(policy.digest.starts_with("p:"));
    }

    #[test]
    fn test_rule_assignee_shares_policy_party() {
        let policy = load(AGREEMENT).unwrap();
        let rule_party = policy.permissions[0].assignee.as_ref().unwrap();
        let policy_party = policy.assignee.as_ref().unwrap();
        assert!(Arc::ptr_eq(rule_party, policy_party));
    }

    #[test]
    fn test_missing_type() {
        let err = load(r#"{"uid": "urn:p", "target": "t", "permission": [{"action": "use"}]}"#).unwrap_err();
        assert!(matches!(err, OdrlError::MissingField { ref path } if path == "type"));
    }

    #[test]
    fn test_unrecognized_type() {
        let err = load(r#"{"type": "Contract", "target": "t"}"#).unwrap_err();
        assert!(matches!(err, OdrlError::InvalidField { ref path, .. } if path == "type"));
    }

    #[test]
    fn test_agreement_requires_parties() {
        let err = load(r#"{"type": "Agreement", "assigner": "a", "target": "t"}"#).unwrap_err();
        assert!(matches!(err, OdrlError::MissingField { ref path } if path == "assignee"));
    }

    #[test]
    fn test_missing_action() {
        let err = load(r#"{"type": "Set", "target": "t", "permission": [{"uid": "r"}]}"#).unwrap_err();
        assert!(matches!(err, OdrlError::MissingField { ref path } if path == "permission[0].action"));
    }

    #[test]
    fn test_empty_action() {
        let err = load(r#"{"type": "Set", "target": "t", "permission": [{"action": []}]}"#).unwrap_err();
        assert!(matches!(err, OdrlError::InvalidField { ref path, .. } if path == "permission[0].action"));
    }

    #[test]
    fn test_rule_target_required_without_policy_target() {
        let err = load(r#"{"type": "Set", "permission": [{"action": "use"}]}"#).unwrap_err();
        assert!(matches!(err, OdrlError::MissingField { ref path } if path == "permission[0].target"));
    }

    #[test]
    fn test_unknown_operator_path() {
        let doc = r#"{"type": "Set", "target": "t", "permission": [
            {"action": "use"},
            {"action": "use", "constraint": {"and": [
                {"leftOperand": "count", "operator": "before", "rightOperand": 5}
            ]}}
        ]}"#;
        let err = load(doc).unwrap_err();
        match err {
            OdrlError::UnknownOperator { path, value } => {
                assert_eq!(path, "permission[1].constraint.and[0].operator");
                assert_eq!(value, "before");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    /// A policy whose constraint tree is `depth` levels deep.
    fn nested(depth: usize) -> String {
        let mut node = r#"{"leftOperand": "count", "operator": "lt", "rightOperand": 5}"#.to_string();
        for _ in 1..depth {
            node = format!(r#"{{"or": [{}]}}"#, node);
        }
        format!(r#"{{"type": "Set", "target": "t", "permission": [{{"action": "use", "constraint": {}}}]}}"#, node)
    }

    #[test]
    fn test_depth_exceeded() {
        let doc = nested(6);
        assert!(load_policy(&doc, &EngineConfig::default().with_max_depth(6)).is_ok());
        let err = load_policy(&doc, &EngineConfig::default().with_max_depth(5)).unwrap_err();
        assert!(matches!(err, OdrlError::DepthExceeded { max: 5, .. }));
    }

    #[test]
    fn test_depth_at_default_limit() {
        let config = EngineConfig::default();
        let policy = load_policy(&nested(DEFAULT_MAX_DEPTH), &config).unwrap();
        assert_eq!(
            policy.permissions[0].constraint.as_deref().map(ConstraintNode::depth),
            Some(DEFAULT_MAX_DEPTH)
        );
        let yaml = load_policy_with_format(&nested(DEFAULT_MAX_DEPTH), PolicyFormat::Yaml, &config);
        assert!(yaml.is_ok());

        match load_policy(&nested(DEFAULT_MAX_DEPTH + 1), &config).unwrap_err() {
            OdrlError::DepthExceeded { path, max } => {
                assert_eq!(max, DEFAULT_MAX_DEPTH);
                assert!(path.starts_with("permission[0].constraint.or[0]"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_depth_ceiling_is_reachable() {
        let config = EngineConfig::default().with_max_depth(DEPTH_CEILING);
        assert!(load_policy(&nested(DEPTH_CEILING), &config).is_ok());
        let err = load_policy(&nested(DEPTH_CEILING + 1), &config).unwrap_err();
        assert!(matches!(err, OdrlError::DepthExceeded { .. }));
    }

    #[test]
    fn test_logical_constraint_object_form() {
        let doc = r#"{"type": "Set", "target": "t", "permission": [{"action": "use", "constraint": {
            "type": "LogicalConstraint", "uid": "urn:lc:1", "operator": "xone",
            "constraint": [
                {"leftOperand": "spatial", "operator": "eq", "rightOperand": "DE"},
                {"leftOperand": "spatial", "operator": "eq", "rightOperandReference": "home:country"}
            ]
        }}]}"#;
        let policy = load(doc).unwrap();
        match policy.permissions[0].constraint.as_deref().unwrap() {
            ConstraintNode::Logical(l) => {
                assert_eq!(l.operator, LogicalOperator::Xone);
                assert_eq!(l.uid.as_deref(), Some("urn:lc:1"));
                assert!(matches!(
                    &l.constraints[1],
                    ConstraintNode::Atomic(c) if c.right_operand == RightOperand::Reference("home:country".into())
                ));
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_action_object_with_refinement() {
        let doc = r#"{"type": "Offer", "assigner": "urn:org:a", "target": "t", "permission": [{
            "action": [{"rdf:value": {"@id": "odrl:print"},
                        "refinement": [{"leftOperand": "resolution", "operator": "lteq", "rightOperand": 1200}]},
                       "display"]
        }]}"#;
        let policy = load(doc).unwrap();
        let actions = &policy.permissions[0].actions;
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].name, "odrl:print");
        assert!(actions[0].refinement.is_some());
        assert_eq!(actions[1].name, "display");
    }

    #[test]
    fn test_set_operand_and_unknown_data_type() {
        let doc = r#"{"type": "Set", "target": "t", "permission": [{"action": "use", "constraint":
            {"leftOperand": "purpose", "operator": "isAnyOf", "rightOperand": ["research", "education"]}}]}"#;
        let policy = load(doc).unwrap();
        assert!(matches!(
            policy.permissions[0].constraint.as_deref(),
            Some(ConstraintNode::Atomic(c)) if c.right_operand == RightOperand::Set(vec!["research".into(), "education".into()])
        ));

        let bad = r#"{"type": "Set", "target": "t", "permission": [{"action": "use", "constraint":
            {"leftOperand": "count", "operator": "eq", "rightOperand": 1, "dataType": "xsd:QName"}}]}"#;
        let err = load(bad).unwrap_err();
        assert!(matches!(err, OdrlError::InvalidField { ref path, .. } if path == "permission[0].constraint.dataType"));
    }

    #[test]
    fn test_duty_error_path_is_qualified() {
        let doc = r#"{"type": "Set", "target": "t", "permission": [{"action": "use", "duty": [{"uid": "d"}]}]}"#;
        let err = load(doc).unwrap_err();
        assert!(matches!(err, OdrlError::MissingField { ref path } if path == "permission[0].duty[0].action"));
    }

    #[test]
    fn test_yaml_document() {
        let yaml = r#"
type: Set
uid: urn:policy:yaml
target: urn:asset:1
inheritFrom: urn:policy:parent
permission:
  - action: read
    assignee:
      uid: urn:group:staff
      type: PartyCollection
"#;
        let policy = load(yaml).unwrap();
        assert_eq!(policy.inherit_from, vec!["urn:policy:parent".to_string()]);
        let assignee = policy.permissions[0].assignee.as_ref().unwrap();
        assert!(assignee.is_collection());
    }

    #[test]
    fn test_invalid_json() {
        let err = load("{ not json").unwrap_err();
        assert!(matches!(err, OdrlError::InvalidJson(_)));
        assert!(err.is_parse_error());
    }
}
