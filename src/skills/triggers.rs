//! Passive trigger predicates
//!
//! Conditions are a closed grammar evaluated against a flat, string-keyed
//! fact set built by the resolver for each combat event. A fact that is not
//! present never satisfies a comparison.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Combat events that can wake up passive skills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// The unit used an active skill on someone
    OnAttack,
    /// The unit was hit by a skill that can trigger counters
    OnHit,
    /// The unit defeated someone
    OnKill,
    RoundStart,
    RoundEnd,
    TurnStart,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::OnAttack => "on_attack",
            TriggerEvent::OnHit => "on_hit",
            TriggerEvent::OnKill => "on_kill",
            TriggerEvent::RoundStart => "round_start",
            TriggerEvent::RoundEnd => "round_end",
            TriggerEvent::TurnStart => "turn_start",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fact value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<f64> for FactValue {
    fn from(value: f64) -> Self {
        FactValue::Number(value)
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        FactValue::Bool(value)
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        FactValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Compare two facts; mismatched types and ordering on non-numbers are false
    pub fn apply(&self, left: &FactValue, right: &FactValue) -> bool {
        match (left, right) {
            (FactValue::Number(a), FactValue::Number(b)) => match self {
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
            },
            (FactValue::Bool(a), FactValue::Bool(b)) => match self {
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                _ => false,
            },
            (FactValue::Text(a), FactValue::Text(b)) => match self {
                CompareOp::Eq => a == b,
                CompareOp::Ne => a != b,
                _ => false,
            },
            _ => false,
        }
    }
}

/// Predicate over a [`FactSet`]
///
/// ```json
/// {"all": [
///   {"compare": {"fact": "character_hp_ratio", "op": "lt", "value": 0.5}},
///   {"fact": "is_target_adjacent"}
/// ]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
    Compare {
        fact: String,
        op: CompareOp,
        value: FactValue,
    },
    /// A boolean fact that must be true
    Fact(String),
}

impl Condition {
    pub fn compare(fact: &str, op: CompareOp, value: impl Into<FactValue>) -> Self {
        Condition::Compare {
            fact: fact.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn evaluate(&self, facts: &FactSet) -> bool {
        match self {
            Condition::All(conditions) => conditions.iter().all(|c| c.evaluate(facts)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.evaluate(facts)),
            Condition::Not(inner) => !inner.evaluate(facts),
            Condition::Compare { fact, op, value } => facts
                .get(fact)
                .map(|actual| op.apply(actual, value))
                .unwrap_or(false),
            Condition::Fact(name) => matches!(facts.get(name), Some(FactValue::Bool(true))),
        }
    }
}

/// Facts describing one combat event from one unit's point of view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactSet {
    facts: BTreeMap<String, FactValue>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FactValue>) {
        self.facts.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.facts.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.facts.get(name) {
            Some(FactValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

/// One way a passive skill can fire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub event: TriggerEvent,
    /// Extra predicate; absent means the event alone is enough
    #[serde(default)]
    pub condition: Option<Condition>,
}

impl TriggerCondition {
    pub fn on(event: TriggerEvent) -> Self {
        Self {
            event,
            condition: None,
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn matches(&self, event: TriggerEvent, facts: &FactSet) -> bool {
        self.event == event
            && self
                .condition
                .as_ref()
                .map(|c| c.evaluate(facts))
                .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> FactSet {
        let mut facts = FactSet::new();
        facts.insert("character_hp_ratio", 0.4);
        facts.insert("is_target_adjacent", true);
        facts.insert("event_type", "on_hit");
        facts
    }

    #[test]
    fn test_compare_numbers() {
        let f = facts();
        assert!(Condition::compare("character_hp_ratio", CompareOp::Lt, 0.5).evaluate(&f));
        assert!(!Condition::compare("character_hp_ratio", CompareOp::Ge, 0.5).evaluate(&f));
    }

    #[test]
    fn test_missing_fact_is_false() {
        let f = facts();
        assert!(!Condition::compare("target_hp_ratio", CompareOp::Lt, 1.0).evaluate(&f));
        assert!(!Condition::Fact("is_flanked".into()).evaluate(&f));
        assert!(Condition::Not(Box::new(Condition::Fact("is_flanked".into()))).evaluate(&f));
    }

    #[test]
    fn test_mismatched_types_are_false() {
        let f = facts();
        assert!(!Condition::compare("event_type", CompareOp::Gt, 1.0).evaluate(&f));
        assert!(!Condition::compare("character_hp_ratio", CompareOp::Eq, true).evaluate(&f));
    }

    #[test]
    fn test_all_and_any() {
        let f = facts();
        let all = Condition::All(vec![
            Condition::Fact("is_target_adjacent".into()),
            Condition::compare("event_type", CompareOp::Eq, "on_hit"),
        ]);
        assert!(all.evaluate(&f));

        let any = Condition::Any(vec![
            Condition::compare("character_hp_ratio", CompareOp::Gt, 0.9),
            Condition::Fact("missing".into()),
        ]);
        assert!(!any.evaluate(&f));
        assert!(Condition::All(vec![]).evaluate(&f));
        assert!(!Condition::Any(vec![]).evaluate(&f));
    }

    #[test]
    fn test_condition_from_json() {
        let json = r#"{"all": [
            {"compare": {"fact": "character_hp_ratio", "op": "lt", "value": 0.5}},
            {"fact": "is_target_adjacent"}
        ]}"#;
        let condition: Condition = serde_json::from_str(json).unwrap();
        assert!(condition.evaluate(&facts()));
    }

    #[test]
    fn test_trigger_matches_event() {
        let f = facts();
        let trigger = TriggerCondition::on(TriggerEvent::OnHit)
            .when(Condition::compare("character_hp_ratio", CompareOp::Le, 0.4));
        assert!(trigger.matches(TriggerEvent::OnHit, &f));
        assert!(!trigger.matches(TriggerEvent::OnAttack, &f));
        assert!(TriggerCondition::on(TriggerEvent::RoundEnd).matches(TriggerEvent::RoundEnd, &f));
    }
}
