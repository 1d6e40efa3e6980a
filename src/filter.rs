//! Cohort selection by regime and endemicity.

use serde::Serialize;

use crate::types::{RawRecord, Regime, Selection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Criteria {
    pub regime: Regime,
    /// Constrains endemicity only when present and non-empty.
    pub endemicity: Option<String>,
}

impl Criteria {
    pub fn matches(&self, record: &RawRecord) -> bool {
        if record.regime != self.regime {
            return false;
        }
        match self.endemicity.as_deref() {
            Some(e) if !e.is_empty() => record.endemicity.as_deref() == Some(e),
            _ => true,
        }
    }
}

impl From<&Selection> for Criteria {
    fn from(sel: &Selection) -> Self {
        Self {
            regime: sel.regime,
            endemicity: sel.endemicity.clone().filter(|e| !e.is_empty()),
        }
    }
}

/// Order-preserving filter. An empty result is a valid cohort.
pub fn filter(records: &[RawRecord], criteria: &Criteria) -> Vec<RawRecord> {
    records.iter().filter(|r| criteria.matches(r)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, regime: Regime, endemicity: Option<&str>) -> RawRecord {
        let mut r = RawRecord::new(id, regime);
        r.endemicity = endemicity.map(str::to_string);
        r
    }

    #[test]
    fn keeps_only_matching_regime() {
        let rows = vec![rec("A", Regime::Who, None), rec("B", Regime::NoMda, None)];
        let criteria = Criteria { regime: Regime::Who, endemicity: None };
        let out = filter(&rows, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "A");
    }

    #[test]
    fn endemicity_constrains_when_supplied() {
        let rows = vec![
            rec("A", Regime::Who, Some("high")),
            rec("B", Regime::Who, Some("low")),
            rec("C", Regime::Who, None),
            rec("D", Regime::Who, Some("high")),
        ];
        let high = Criteria { regime: Regime::Who, endemicity: Some("high".into()) };
        let ids: Vec<_> = filter(&rows, &high).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["A", "D"]);

        let blank = Criteria { regime: Regime::Who, endemicity: Some(String::new()) };
        assert_eq!(filter(&rows, &blank).len(), 4);
    }

    #[test]
    fn empty_selection_endemicity_is_unconstrained() {
        let sel = Selection {
            regime: Regime::Coverage,
            endemicity: Some(String::new()),
            country: None,
        };
        let criteria = Criteria::from(&sel);
        assert_eq!(criteria.endemicity, None);
        assert!(filter(&[rec("A", Regime::Who, None)], &criteria).is_empty());
    }
}
