use serde_json::{Map, Value};

/// One parsed record, column name to raw value.
pub type ImportRow = Map<String, Value>;

/// A record whose keys are canonical for lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRow(Map<String, Value>);

/// A row is flat when no value is an object or an array.
pub fn is_flat(row: &ImportRow) -> bool {
    row.values().all(|v| !v.is_object() && !v.is_array())
}

/// Lower-case column name without whitespace or underscores, so
/// "Subject Name", "subject_name" and "subjectName" all read `subjectname`.
pub fn canonical_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Flat rows get canonical keys and trimmed string values; rows with nested
/// values only get lower-case keys. Lookups are canonical either way.
pub fn normalize_row(row: ImportRow) -> NormalizedRow {
    let flat = is_flat(&row);
    let normalized = row
        .into_iter()
        .map(|(key, value)| {
            if flat {
                let value = match value {
                    Value::String(s) => Value::String(s.trim().to_string()),
                    other => other,
                };
                (canonical_key(&key), value)
            } else {
                (key.to_lowercase(), value)
            }
        })
        .collect();

    NormalizedRow(normalized)
}

impl NormalizedRow {
    /// Value of the column whose canonical name is `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).or_else(|| {
            self.0
                .iter()
                .find(|(column, _)| canonical_key(column) == key)
                .map(|(_, value)| value)
        })
    }

    /// Text content of a column. Numbers and booleans are rendered, empty
    /// and null values count as missing.
    pub fn text(&self, key: &str) -> Option<String> {
        let text = match self.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if text.is_empty() { None } else { Some(text) }
    }

    /// List column: a JSON array, a JSON array encoded in a string, or a
    /// comma-separated string. Blank items are dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        let items: Vec<String> = match self.get(key) {
            Some(Value::Array(values)) => values.iter().filter_map(value_text).collect(),
            Some(Value::String(s)) => {
                let s = s.trim();
                match serde_json::from_str::<Vec<Value>>(s) {
                    Ok(values) if s.starts_with('[') => {
                        values.iter().filter_map(value_text).collect()
                    }
                    _ => s.split(',').map(|item| item.trim().to_string()).collect(),
                }
            }
            Some(other) => value_text(other).into_iter().collect(),
            None => Vec::new(),
        };
        items.into_iter().filter(|item| !item.is_empty()).collect()
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// `"true"`/`"false"` in any case, or a JSON boolean.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> ImportRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn canonical_keys_ignore_case_spaces_and_underscores() {
        assert_eq!(canonical_key("  Question Text "), "questiontext");
        assert_eq!(canonical_key("subject_name"), "subjectname");
        assert_eq!(canonical_key("correctOptionIndex"), "correctoptionindex");
    }

    #[test]
    fn flat_rows_get_canonical_keys_and_trimmed_values() {
        let normalized = normalize_row(row(json!({
            "  Title ": "  Algebra Final ",
            "Subject Name": "Math",
            "duration_in_minutes": 60
        })));

        assert_eq!(normalized.text("title").as_deref(), Some("Algebra Final"));
        assert_eq!(normalized.get("subjectname"), Some(&json!("Math")));
        assert_eq!(normalized.integer("durationinminutes"), Some(60));
        assert_eq!(normalized.0.len(), 3);
        assert!(normalized.0.contains_key("subjectname"));
    }

    #[test]
    fn nested_rows_only_lowercase_keys() {
        let normalized = normalize_row(row(json!({
            " Options ": ["a", "b"],
            "Question_Text": "  What?  "
        })));

        assert!(normalized.0.contains_key(" options "));
        assert!(normalized.0.contains_key("question_text"));
        assert_eq!(normalized.get("options"), Some(&json!(["a", "b"])));
        assert_eq!(normalized.get("questiontext"), Some(&json!("  What?  ")));
    }

    #[test]
    fn list_accepts_arrays_json_strings_and_commas() {
        let normalized = normalize_row(row(json!({
            "a": "q1, q2 ,,q3",
            "b": "[\"x\", \"y\"]",
            "c": ""
        })));
        assert_eq!(normalized.list("a"), vec!["q1", "q2", "q3"]);
        assert_eq!(normalized.list("b"), vec!["x", "y"]);
        assert!(normalized.list("c").is_empty());
        assert!(normalized.list("missing").is_empty());

        let nested = normalize_row(row(json!({ "Tags": ["t1", 2, ""] })));
        assert_eq!(nested.list("tags"), vec!["t1", "2"]);
    }

    #[test]
    fn flag_and_integer_parsing() {
        let normalized = normalize_row(row(json!({
            "published": "TRUE",
            "draft": "no",
            "minutes": "45",
            "float": 30.0
        })));
        assert_eq!(normalized.flag("published"), Some(true));
        assert_eq!(normalized.flag("draft"), None);
        assert_eq!(normalized.integer("minutes"), Some(45));
        assert_eq!(normalized.integer("float"), Some(30));
    }
}
