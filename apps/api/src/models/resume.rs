use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::parsing::models::ResumeRecord;

/// A persisted résumé. Append-only once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResume {
    pub id: Uuid,
    pub record: ResumeRecord,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
}

/// Row shape of `parsed_resumes`. The record lives in a `jsonb` column.
#[derive(Debug, Clone, FromRow)]
pub struct ParsedResumeRow {
    pub id: Uuid,
    pub record: Value,
    pub raw_text: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ParsedResumeRow> for StoredResume {
    type Error = serde_json::Error;

    fn try_from(row: ParsedResumeRow) -> Result<Self, Self::Error> {
        Ok(StoredResume {
            id: row.id,
            record: serde_json::from_value(row.record)?,
            raw_text: row.raw_text,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::models::ExperienceLevel;

    #[test]
    fn test_row_decodes_record_json() {
        let row = ParsedResumeRow {
            id: Uuid::new_v4(),
            record: serde_json::json!({
                "name": "Jane Doe",
                "skills": ["Rust"],
                "experience_level": "Senior"
            }),
            raw_text: "Jane Doe SKILLS Rust".to_string(),
            created_at: Utc::now(),
        };
        let stored = StoredResume::try_from(row).unwrap();
        assert_eq!(stored.record.name, "Jane Doe");
        assert_eq!(stored.record.experience_level, ExperienceLevel::Senior);
        assert!(stored.record.education.is_empty());
    }

    #[test]
    fn test_row_with_bad_record_fails() {
        let row = ParsedResumeRow {
            id: Uuid::new_v4(),
            record: serde_json::json!({"skills": "not a list"}),
            raw_text: String::new(),
            created_at: Utc::now(),
        };
        assert!(StoredResume::try_from(row).is_err());
    }
}
