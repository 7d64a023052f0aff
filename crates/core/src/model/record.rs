use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, string_or_number};

/// One raw lesson row as supplied by the content source.
///
/// Every field falls back to an empty string when missing so a partially
/// filled row still produces a lesson. `id` and `orderKey` accept either a
/// string or a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonRecord {
    pub id: LessonId,
    #[serde(deserialize_with = "string_or_default")]
    pub area: String,
    #[serde(deserialize_with = "string_or_default")]
    pub module: String,
    #[serde(deserialize_with = "string_or_default")]
    pub subject: String,
    #[serde(deserialize_with = "string_or_number")]
    pub order_key: String,
    #[serde(deserialize_with = "string_or_default")]
    pub video_ref: String,
    #[serde(deserialize_with = "string_or_default")]
    pub text_content: String,
    #[serde(deserialize_with = "string_or_default")]
    pub cover_ref: String,
}

fn string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl LessonRecord {
    /// Ordering key parsed as an integer; non-numeric or missing keys sort as `0`.
    #[must_use]
    pub fn order(&self) -> i64 {
        self.order_key.trim().parse::<i64>().unwrap_or(0)
    }

    /// Cover reference, if the row supplies one.
    #[must_use]
    pub fn cover(&self) -> Option<&str> {
        let cover = self.cover_ref.trim();
        if cover.is_empty() { None } else { Some(cover) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_empty() {
        let record: LessonRecord = serde_json::from_str(r#"{"id": 7, "subject": "Intro"}"#).unwrap();
        assert_eq!(record.id, LessonId::new("7"));
        assert_eq!(record.subject, "Intro");
        assert_eq!(record.area, "");
        assert_eq!(record.module, "");
        assert_eq!(record.order(), 0);
        assert!(record.cover().is_none());
    }

    #[test]
    fn order_key_accepts_strings_and_numbers() {
        let a: LessonRecord = serde_json::from_str(r#"{"id": "a", "orderKey": "12"}"#).unwrap();
        let b: LessonRecord = serde_json::from_str(r#"{"id": "b", "orderKey": 3}"#).unwrap();
        let c: LessonRecord = serde_json::from_str(r#"{"id": "c", "orderKey": "x1"}"#).unwrap();
        let d: LessonRecord = serde_json::from_str(r#"{"id": "d", "orderKey": null}"#).unwrap();
        assert_eq!(a.order(), 12);
        assert_eq!(b.order(), 3);
        assert_eq!(c.order(), 0);
        assert_eq!(d.order(), 0);
    }

    #[test]
    fn null_text_fields_are_empty() {
        let record: LessonRecord =
            serde_json::from_str(r#"{"id": "n", "area": null, "coverRef": "  "}"#).unwrap();
        assert_eq!(record.area, "");
        assert!(record.cover().is_none());
    }
}
