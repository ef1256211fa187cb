use serde::{Deserialize, Serialize};

/// A single contact record, in the JSON shape shared by the remote service and the local cache.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub category: String,
    pub country: String,
    pub birthday: String,
    pub address: String,
    pub city: String,
    pub notes: String,
    pub image_url: String,
    pub labels: Vec<String>,
    pub favorite: bool,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Splits labels typed into the form: comma separated, trimmed, blanks dropped.
pub fn parse_form_labels(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_with_missing_fields() {
        let c: Contact = serde_json::from_str(
            r#"{"id":"7","firstName":"Ann","lastName":"Lee","imageUrl":"x.png","labels":["a"]}"#,
        )
        .unwrap();
        assert_eq!(c.id, "7");
        assert_eq!(c.first_name, "Ann");
        assert_eq!(c.image_url, "x.png");
        assert_eq!(c.labels, vec!["a".to_string()]);
        assert_eq!(c.phone, "");
        assert!(!c.favorite);
    }

    #[test]
    fn serializes_camel_case() {
        let c = Contact {
            id: "1".into(),
            first_name: "Jo".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["firstName"], "Jo");
        assert_eq!(json["favorite"], false);
        assert!(json.get("first_name").is_none());
    }

    #[test]
    fn form_labels_drop_blank_entries() {
        assert_eq!(parse_form_labels(" work, ,family ,,"), vec!["work", "family"]);
        assert!(parse_form_labels("   ").is_empty());
    }
}
