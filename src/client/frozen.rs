use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::domain::entities::grid::FrozenRowsSetting;
use crate::domain::entities::page::{value_text, RowData};

/// A row's identity: its index field rendered as text, so `1` and `"1"` match.
pub type RowId = String;

pub fn row_id(row: &RowData, index: &str) -> Option<RowId> {
    match row.get(index) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value_text(value)),
    }
}

/// Which rows of each loaded page are pinned automatically.
pub enum FrozenRule {
    None,
    Leading(usize),
    Ids(Vec<RowId>),
    Predicate(Box<dyn Fn(&RowData) -> bool>),
}

impl FrozenRule {
    pub fn from_setting(setting: &FrozenRowsSetting) -> Self {
        match setting {
            FrozenRowsSetting::Enabled(false) | FrozenRowsSetting::Count(0) => FrozenRule::None,
            FrozenRowsSetting::Enabled(true) => FrozenRule::Leading(1),
            FrozenRowsSetting::Count(count) => FrozenRule::Leading(*count),
            FrozenRowsSetting::Ids(ids) => {
                FrozenRule::Ids(ids.iter().map(ToString::to_string).collect())
            }
        }
    }
}

impl fmt::Debug for FrozenRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrozenRule::None => f.write_str("None"),
            FrozenRule::Leading(count) => f.debug_tuple("Leading").field(count).finish(),
            FrozenRule::Ids(ids) => f.debug_tuple("Ids").field(ids).finish(),
            FrozenRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeOutcome {
    Frozen,
    AlreadyFrozen,
    Unfrozen,
    NotFrozen,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrozenSplit {
    pub frozen: Vec<RowData>,
    pub body: Vec<RowData>,
}

/// Tracks which rows render in the pinned region above the body.
#[derive(Debug)]
pub struct FrozenRows {
    index: String,
    rule: FrozenRule,
    explicit: Vec<RowId>,
    ruled: Vec<RowId>,
}

impl FrozenRows {
    pub fn new(index: impl Into<String>, rule: FrozenRule) -> Self {
        Self {
            index: index.into(),
            rule,
            explicit: Vec::new(),
            ruled: Vec::new(),
        }
    }

    pub fn is_frozen(&self, id: &str) -> bool {
        self.explicit.iter().chain(&self.ruled).any(|frozen| frozen == id)
    }

    /// Frozen ids, explicit freezes first.
    pub fn frozen_ids(&self) -> Vec<RowId> {
        self.explicit.iter().chain(&self.ruled).cloned().collect()
    }

    pub fn freeze(&mut self, id: impl Into<RowId>) -> FreezeOutcome {
        let id = id.into();
        if self.is_frozen(&id) {
            warn!(row = %id, "row is already frozen");
            return FreezeOutcome::AlreadyFrozen;
        }
        self.explicit.push(id);
        FreezeOutcome::Frozen
    }

    pub fn unfreeze(&mut self, id: &str) -> FreezeOutcome {
        if !self.is_frozen(id) {
            warn!(row = %id, "row is not frozen");
            return FreezeOutcome::NotFrozen;
        }
        self.explicit.retain(|frozen| frozen != id);
        self.ruled.retain(|frozen| frozen != id);
        FreezeOutcome::Unfrozen
    }

    /// Re-evaluates the rule against a freshly loaded page. Explicit freezes
    /// are kept.
    pub fn apply_rule(&mut self, rows: &[RowData]) {
        let matches: Vec<RowId> = match &self.rule {
            FrozenRule::None => Vec::new(),
            FrozenRule::Leading(count) => rows
                .iter()
                .take(*count)
                .filter_map(|row| row_id(row, &self.index))
                .collect(),
            FrozenRule::Ids(ids) => rows
                .iter()
                .filter_map(|row| row_id(row, &self.index))
                .filter(|id| ids.contains(id))
                .collect(),
            FrozenRule::Predicate(predicate) => rows
                .iter()
                .filter(|&row| predicate(row))
                .filter_map(|row| row_id(row, &self.index))
                .collect(),
        };

        self.ruled.clear();
        for id in matches {
            if !self.is_frozen(&id) {
                self.ruled.push(id);
            }
        }
    }

    /// Separates pinned rows from body rows, keeping page order in both.
    pub fn split(&self, rows: &[RowData]) -> FrozenSplit {
        let mut split = FrozenSplit::default();
        for row in rows {
            let pinned = row_id(row, &self.index).is_some_and(|id| self.is_frozen(&id));
            if pinned {
                split.frozen.push(row.clone());
            } else {
                split.body.push(row.clone());
            }
        }
        split
    }

    pub fn reset(&mut self) {
        self.explicit.clear();
        self.ruled.clear();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::entities::grid::IdValue;

    fn rows(ids: &[i64]) -> Vec<RowData> {
        ids.iter()
            .map(|id| match json!({"id": id, "Title": format!("row {id}")}) {
                Value::Object(row) => row,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn freezing_twice_is_a_reported_no_op() {
        let mut frozen = FrozenRows::new("id", FrozenRule::None);

        assert_eq!(frozen.freeze("3"), FreezeOutcome::Frozen);
        assert_eq!(frozen.freeze("3"), FreezeOutcome::AlreadyFrozen);
        assert_eq!(frozen.frozen_ids(), vec!["3".to_string()]);

        assert_eq!(frozen.unfreeze("3"), FreezeOutcome::Unfrozen);
        assert_eq!(frozen.unfreeze("3"), FreezeOutcome::NotFrozen);
        assert!(frozen.frozen_ids().is_empty());
    }

    #[test]
    fn leading_rule_follows_the_loaded_page() {
        let mut frozen = FrozenRows::new("id", FrozenRule::Leading(2));

        frozen.apply_rule(&rows(&[1, 2, 3]));
        assert_eq!(frozen.frozen_ids(), vec!["1".to_string(), "2".to_string()]);

        frozen.apply_rule(&rows(&[4, 5, 6]));
        assert_eq!(frozen.frozen_ids(), vec!["4".to_string(), "5".to_string()]);
    }

    #[test]
    fn id_rule_matches_numbers_and_text_alike() {
        let rule = FrozenRule::from_setting(&FrozenRowsSetting::Ids(vec![
            IdValue::Number(2),
            IdValue::Text("9".into()),
        ]));
        let mut frozen = FrozenRows::new("id", rule);

        frozen.apply_rule(&rows(&[1, 2, 3]));
        let split = frozen.split(&rows(&[1, 2, 3]));

        assert_eq!(split.frozen, rows(&[2]));
        assert_eq!(split.body, rows(&[1, 3]));
    }

    #[test]
    fn predicate_rule_and_explicit_freezes_combine() {
        let rule = FrozenRule::Predicate(Box::new(|row: &RowData| {
            row.get("id").and_then(Value::as_i64).is_some_and(|id| id % 2 == 0)
        }));
        let mut frozen = FrozenRows::new("id", rule);
        frozen.freeze("1");

        frozen.apply_rule(&rows(&[1, 2, 3, 4]));
        assert_eq!(frozen.freeze("4"), FreezeOutcome::AlreadyFrozen);

        let split = frozen.split(&rows(&[1, 2, 3, 4]));
        assert_eq!(split.frozen, rows(&[1, 2, 4]));
        assert_eq!(split.body, rows(&[3]));

        frozen.reset();
        assert!(frozen.split(&rows(&[1, 2])).frozen.is_empty());
    }

    #[test]
    fn true_setting_pins_the_first_row() {
        assert!(matches!(
            FrozenRule::from_setting(&FrozenRowsSetting::Enabled(true)),
            FrozenRule::Leading(1)
        ));
        assert!(matches!(
            FrozenRule::from_setting(&FrozenRowsSetting::Enabled(false)),
            FrozenRule::None
        ));
    }
}
