//! Typed access to one raw generator entry.
//!
//! `null` is treated the same as an absent key. A present value of the
//! wrong type is always a [`SkillMapError::MalformedPlan`] naming the entry.

use serde_json::{Map, Value};
use skillmap_db::models::SkillResource;

use crate::error::SkillMapError;

type Result<T> = std::result::Result<T, SkillMapError>;

pub(super) struct Entry<'a> {
    id: &'a str,
    attrs: &'a Map<String, Value>,
}

impl<'a> Entry<'a> {
    pub(super) fn new(id: &'a str, value: &'a Value) -> Result<Self> {
        match value {
            Value::Object(attrs) => Ok(Self { id, attrs }),
            other => Err(SkillMapError::malformed(
                id,
                format!("expected an object, found {}", kind_of(other)),
            )),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.attrs.get(key).filter(|v| !v.is_null())
    }

    fn wrong_type(&self, key: &str, expected: &str, found: &Value) -> SkillMapError {
        SkillMapError::malformed(
            self.id,
            format!("field `{key}` must be {expected}, found {}", kind_of(found)),
        )
    }

    pub(super) fn required_str(&self, key: &str) -> Result<String> {
        self.optional_str(key)?.ok_or_else(|| {
            SkillMapError::malformed(self.id, format!("missing required field `{key}`"))
        })
    }

    pub(super) fn optional_str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.wrong_type(key, "a string", other)),
        }
    }

    /// A finite, non-negative number of hours.
    pub(super) fn required_hours(&self, key: &str) -> Result<f64> {
        let value = self.get(key).ok_or_else(|| {
            SkillMapError::malformed(self.id, format!("missing required field `{key}`"))
        })?;
        let hours = value
            .as_f64()
            .ok_or_else(|| self.wrong_type(key, "a number", value))?;
        if !hours.is_finite() || hours < 0.0 {
            return Err(SkillMapError::malformed(
                self.id,
                format!("field `{key}` must be a non-negative number, found {hours}"),
            ));
        }
        Ok(hours)
    }

    /// An integer, possibly written with a zero fraction (`3.0`).
    pub(super) fn integer(&self, key: &str) -> Result<Option<i64>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        if let Some(n) = value.as_i64() {
            return Ok(Some(n));
        }
        match value.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Some(f as i64))
            }
            _ => Err(self.wrong_type(key, "an integer", value)),
        }
    }

    pub(super) fn string_list(&self, key: &str) -> Result<Vec<String>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.wrong_type(key, "a list of strings", value))?;
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(self.wrong_type(key, "a list of strings", other)),
            })
            .collect()
    }

    pub(super) fn resources(&self) -> Result<Vec<SkillResource>> {
        let Some(value) = self.get("resources") else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.wrong_type("resources", "a list", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let key = format!("resources[{i}]");
                let resource = Entry::new(self.id, item).map_err(|_| {
                    self.wrong_type(&key, "an object", item)
                })?;
                Ok(SkillResource {
                    kind: resource.required_str("type")?,
                    name: resource.required_str("name")?,
                    url: resource.optional_str("url")?,
                    description: resource.optional_str("description")?,
                })
            })
            .collect()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn malformed_id(err: SkillMapError) -> String {
        match err {
            SkillMapError::MalformedPlan { id, .. } => id,
            other => panic!("expected MalformedPlan, got {other:?}"),
        }
    }

    #[test]
    fn non_object_entry() {
        let value = json!("just a string");
        let err = Entry::new("x", &value).err().unwrap();
        assert_eq!(malformed_id(err), "x");
    }

    #[test]
    fn null_counts_as_absent() {
        let value = json!({"parent_id": null, "children": null});
        let entry = Entry::new("n", &value).unwrap();
        assert_eq!(entry.optional_str("parent_id").unwrap(), None);
        assert!(entry.string_list("children").unwrap().is_empty());
        assert!(entry.required_str("parent_id").is_err());
    }

    #[test]
    fn hours_must_be_non_negative_number() {
        let value = json!({"a": 2, "b": -1.0, "c": "10"});
        let entry = Entry::new("n", &value).unwrap();
        assert_eq!(entry.required_hours("a").unwrap(), 2.0);
        assert!(entry.required_hours("b").is_err());
        assert!(entry.required_hours("c").is_err());
        assert!(entry.required_hours("missing").is_err());
    }

    #[test]
    fn integers_accept_whole_floats() {
        let value = json!({"a": 3, "b": 4.0, "c": 4.5, "d": "5"});
        let entry = Entry::new("n", &value).unwrap();
        assert_eq!(entry.integer("a").unwrap(), Some(3));
        assert_eq!(entry.integer("b").unwrap(), Some(4));
        assert!(entry.integer("c").is_err());
        assert!(entry.integer("d").is_err());
        assert_eq!(entry.integer("missing").unwrap(), None);
    }

    #[test]
    fn string_list_rejects_mixed_items() {
        let value = json!({"children": ["a", 2]});
        let entry = Entry::new("root", &value).unwrap();
        assert_eq!(malformed_id(entry.string_list("children").err().unwrap()), "root");
    }

    #[test]
    fn resources_require_type_and_name() {
        let value = json!({"resources": [
            {"type": "book", "name": "SICP", "url": "https://example.org"},
            {"type": "video"}
        ]});
        let entry = Entry::new("n", &value).unwrap();
        assert!(entry.resources().is_err());

        let value = json!({"resources": [{"type": "book", "name": "SICP"}]});
        let entry = Entry::new("n", &value).unwrap();
        let resources = entry.resources().unwrap();
        assert_eq!(resources[0].kind, "book");
        assert!(resources[0].url.is_none());
    }
}
