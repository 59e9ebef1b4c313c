use crate::domain::entities::column::FieldPath;
use crate::domain::entities::page::{value_text, Record};
use crate::usecase::ports::collection::ViewPolicy;

/// Every record is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ViewPolicy for AllowAll {
    fn can_view(&self, _record: &Record) -> bool {
        true
    }
}

/// Hides records whose `field` equals one of `values` (case-insensitive).
#[derive(Debug, Clone)]
pub struct HiddenValues {
    field: FieldPath,
    values: Vec<String>,
}

impl HiddenValues {
    pub fn new(field: FieldPath, values: Vec<String>) -> Self {
        let values = values.into_iter().map(|value| value.to_lowercase()).collect();
        Self { field, values }
    }
}

impl ViewPolicy for HiddenValues {
    fn can_view(&self, record: &Record) -> bool {
        let Some(value) = record.get(&self.field) else {
            return true;
        };
        let value = value_text(value).to_lowercase();
        !self.values.iter().any(|hidden| *hidden == value)
    }

    fn required_fields(&self) -> Vec<FieldPath> {
        vec![self.field.clone()]
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn hidden_values_match_case_insensitively() {
        let status = FieldPath::Local("Status".into());
        let policy = HiddenValues::new(status.clone(), vec!["Archived".into()]);

        let mut archived = Record::new();
        archived.insert(&status, json!("ARCHIVED"));
        let mut active = Record::new();
        active.insert(&status, json!("ACTIVE"));

        assert!(!policy.can_view(&archived));
        assert!(policy.can_view(&active));
        assert!(policy.can_view(&Record::new()));
        assert_eq!(policy.required_fields(), vec![status]);
    }
}
