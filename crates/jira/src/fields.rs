use common::config::FieldIds;
use serde_json::Value;

use crate::models::IssueFields;

/// Typed access to Jira custom fields. The purpose-to-field-id mapping is
/// resolved once from configuration; every lookup-and-cast lives here.
#[derive(Debug, Clone)]
pub struct FieldMap {
    ids: FieldIds,
}

impl FieldMap {
    pub fn new(ids: FieldIds) -> Self {
        Self { ids }
    }

    pub fn story_points(&self, fields: &IssueFields) -> Option<f64> {
        fields.custom.get(&self.ids.story_points)?.as_f64()
    }

    pub fn epic_key(&self, fields: &IssueFields) -> Option<String> {
        fields
            .custom
            .get(&self.ids.epic_link)?
            .as_str()
            .map(str::to_string)
    }

    pub fn qa_assignees(&self, fields: &IssueFields) -> Vec<String> {
        let Some(id) = self.ids.qa_assignee.as_deref() else {
            return Vec::new();
        };
        match fields.custom.get(id) {
            Some(Value::Array(entries)) => entries.iter().filter_map(display_name).collect(),
            Some(value) => display_name(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

fn display_name(value: &Value) -> Option<String> {
    if let Some(name) = value.get("displayName").and_then(Value::as_str) {
        return Some(name.to_string());
    }
    value.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_with(custom: serde_json::Value) -> IssueFields {
        let raw = serde_json::json!({ "summary": "x" });
        let mut fields: IssueFields = serde_json::from_value(raw).unwrap();
        if let Value::Object(map) = custom {
            fields.custom = map;
        }
        fields
    }

    fn map() -> FieldMap {
        FieldMap::new(FieldIds {
            story_points: "customfield_10016".into(),
            epic_link: "customfield_10014".into(),
            qa_assignee: Some("customfield_11000".into()),
        })
    }

    #[test]
    fn story_points_cast_from_number() {
        let fields = fields_with(serde_json::json!({"customfield_10016": 3.5}));
        assert_eq!(map().story_points(&fields), Some(3.5));
    }

    #[test]
    fn story_points_absent_is_none() {
        let fields = fields_with(serde_json::json!({}));
        assert_eq!(map().story_points(&fields), None);
    }

    #[test]
    fn qa_assignees_from_user_list() {
        let fields = fields_with(serde_json::json!({
            "customfield_11000": [{"displayName": "QA One"}, {"displayName": "QA Two"}]
        }));
        assert_eq!(map().qa_assignees(&fields), vec!["QA One", "QA Two"]);
    }

    #[test]
    fn qa_assignees_empty_without_configured_field() {
        let map = FieldMap::new(FieldIds {
            story_points: "a".into(),
            epic_link: "b".into(),
            qa_assignee: None,
        });
        let fields = fields_with(serde_json::json!({"c": [{"displayName": "QA"}]}));
        assert!(map.qa_assignees(&fields).is_empty());
    }
}
