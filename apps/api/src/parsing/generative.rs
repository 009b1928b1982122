//! Generative parser. Asks a text model for the full `ResumeRecord` schema,
//! then repairs the answer in place.
//!
//! Repair policy (every fix is recorded as a `FieldRepair`):
//! - missing or null keys take the type's empty value
//! - scalars of the wrong JSON type are coerced (numbers to strings, a comma
//!   separated string to a list)
//! - `ats_feedback.score` is rounded and clamped into 0 to 100; a value that is
//!   not numeric at all becomes 0
//! - an `experience_level` outside the five bands is replaced by the band
//!   inferred from the work history, or `Unknown`
//! - skills are re-bucketed against the Skills section of the source text
//!
//! Only unparseable JSON (or JSON that is not an object) fails the parse.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::extraction::ExtractedText;
use crate::llm_client::{strip_json_fences, TextGenerator};
use crate::parsing::experience::infer_level;
use crate::parsing::models::{
    AtsFeedback, Certification, Education, ExperienceLevel, Project, ResumeRecord, WorkExperience,
};
use crate::parsing::prompts::RESUME_PARSE_PROMPT;
use crate::parsing::sections::reconcile_skills;
use crate::parsing::{FieldRepair, ParseError, ParseOutcome, ParserStrategy, ResumeParser};

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

pub struct GenerativeParser {
    generator: Arc<dyn TextGenerator>,
    temperature: f32,
}

impl GenerativeParser {
    pub fn new(generator: Arc<dyn TextGenerator>, temperature: f32) -> Self {
        Self {
            generator,
            temperature,
        }
    }
}

#[async_trait]
impl ResumeParser for GenerativeParser {
    fn strategy(&self) -> ParserStrategy {
        ParserStrategy::Generative
    }

    async fn parse(&self, text: &ExtractedText) -> Result<ParseOutcome, ParseError> {
        let prompt = RESUME_PARSE_PROMPT.replace("{resume_text}", text.as_str());
        let response = self
            .generator
            .generate(&prompt, self.temperature)
            .await
            .map_err(|e| ParseError::Generation(e.to_string()))?;

        let outcome = normalize_response(&response, text.as_str(), Utc::now().date_naive())?;
        debug!(
            repairs = outcome.repairs.len(),
            skills = outcome.record.skills.len(),
            "generative parse normalized"
        );
        Ok(outcome)
    }
}

/// Turns raw model output into a schema-complete record.
pub fn normalize_response(
    response: &str,
    source_text: &str,
    today: NaiveDate,
) -> Result<ParseOutcome, ParseError> {
    let value: Value = serde_json::from_str(strip_json_fences(response))
        .map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let root = match value {
        Value::Object(root) => root,
        other => {
            return Err(ParseError::InvalidJson(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            )))
        }
    };

    let mut n = Normalizer::default();

    let mut record = ResumeRecord {
        name: n.string(&root, "name", "name"),
        location: n.string(&root, "location", "location"),
        summary: n.string(&root, "summary", "summary"),
        skills: n.string_list(&root, "skills", "skills"),
        extra_skills: n.string_list(&root, "extra_skills", "extra_skills"),
        work_experience: n.object_list(&root, "work_experience", |n, obj, path| WorkExperience {
            title: n.string(obj, "title", &format!("{path}.title")),
            company: n.string(obj, "company", &format!("{path}.company")),
            duration: n.string(obj, "duration", &format!("{path}.duration")),
            location: n.string(obj, "location", &format!("{path}.location")),
            highlights: n.string_list(obj, "highlights", &format!("{path}.highlights")),
        }),
        projects: n.object_list(&root, "projects", |n, obj, path| Project {
            name: n.string(obj, "name", &format!("{path}.name")),
            duration: n.string(obj, "duration", &format!("{path}.duration")),
            technologies: n.string_list(obj, "technologies", &format!("{path}.technologies")),
            description: n.string(obj, "description", &format!("{path}.description")),
        }),
        certifications: n.object_list(&root, "certifications", |n, obj, path| Certification {
            name: n.string(obj, "name", &format!("{path}.name")),
            issuer: n.string(obj, "issuer", &format!("{path}.issuer")),
            year: n.string(obj, "year", &format!("{path}.year")),
        }),
        education: n.object_list(&root, "education", |n, obj, path| Education {
            degree: n.string(obj, "degree", &format!("{path}.degree")),
            institution: n.string(obj, "institution", &format!("{path}.institution")),
            year: n.string(obj, "year", &format!("{path}.year")),
        }),
        experience_level: ExperienceLevel::Unknown,
        recommended_roles: n.string_list(&root, "recommended_roles", "recommended_roles"),
        ats_feedback: AtsFeedback::default(),
    };

    record.ats_feedback = n.ats_feedback(&root);
    record.experience_level = n.experience_level(&root, &record.work_experience, today);

    let buckets = reconcile_skills(
        source_text,
        std::mem::take(&mut record.skills),
        std::mem::take(&mut record.extra_skills),
    );
    record.skills = buckets.skills;
    record.extra_skills = buckets.extra_skills;
    n.repairs
        .extend(buckets.moves.into_iter().map(|m| FieldRepair::MovedSkill {
            term: m.term,
            to: m.to,
        }));

    Ok(ParseOutcome {
        record,
        repairs: n.repairs,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Default)]
struct Normalizer {
    repairs: Vec<FieldRepair>,
}

impl Normalizer {
    fn defaulted(&mut self, field: &str) {
        self.repairs.push(FieldRepair::Defaulted {
            field: field.to_string(),
        });
    }

    fn coerced(&mut self, field: &str) {
        self.repairs.push(FieldRepair::Coerced {
            field: field.to_string(),
        });
    }

    fn string(&mut self, obj: &Map<String, Value>, key: &str, field: &str) -> String {
        match obj.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(num)) => {
                self.coerced(field);
                num.to_string()
            }
            Some(Value::Bool(b)) => {
                self.coerced(field);
                b.to_string()
            }
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                self.coerced(field);
                String::new()
            }
            Some(Value::Null) | None => {
                self.defaulted(field);
                String::new()
            }
        }
    }

    fn string_list(&mut self, obj: &Map<String, Value>, key: &str, field: &str) -> Vec<String> {
        match obj.get(key) {
            Some(Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                        Value::Number(num) => {
                            self.coerced(field);
                            out.push(num.to_string());
                        }
                        Value::String(_) | Value::Null => {}
                        _ => self.coerced(field),
                    }
                }
                out
            }
            Some(Value::String(s)) => {
                self.coerced(field);
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            }
            Some(Value::Null) | None => {
                self.defaulted(field);
                Vec::new()
            }
            Some(_) => {
                self.coerced(field);
                Vec::new()
            }
        }
    }

    fn object_list<T>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        mut build: impl FnMut(&mut Self, &Map<String, Value>, &str) -> T,
    ) -> Vec<T> {
        match obj.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| match item {
                    Value::Object(entry) => Some(build(self, entry, &format!("{key}[{i}]"))),
                    _ => {
                        self.coerced(&format!("{key}[{i}]"));
                        None
                    }
                })
                .collect(),
            Some(Value::Null) | None => {
                self.defaulted(key);
                Vec::new()
            }
            Some(_) => {
                self.coerced(key);
                Vec::new()
            }
        }
    }

    fn ats_feedback(&mut self, root: &Map<String, Value>) -> AtsFeedback {
        let feedback = match root.get("ats_feedback") {
            Some(Value::Object(obj)) => obj,
            Some(Value::Null) | None => {
                self.defaulted("ats_feedback");
                return AtsFeedback::default();
            }
            Some(_) => {
                self.coerced("ats_feedback");
                return AtsFeedback::default();
            }
        };

        AtsFeedback {
            score: self.score(feedback.get("score")),
            summary: self.string(feedback, "summary", "ats_feedback.summary"),
            strengths: self.string_list(feedback, "strengths", "ats_feedback.strengths"),
            improvements: self.string_list(feedback, "improvements", "ats_feedback.improvements"),
        }
    }

    fn score(&mut self, value: Option<&Value>) -> u8 {
        const FIELD: &str = "ats_feedback.score";
        let raw = match value {
            Some(Value::Number(num)) => num.as_f64(),
            Some(Value::String(s)) => {
                let parsed = s.trim().trim_end_matches('%').trim().parse::<f64>().ok();
                if parsed.is_some() {
                    self.coerced(FIELD);
                }
                parsed
            }
            Some(_) | None => None,
        };

        let Some(raw) = raw.filter(|r| r.is_finite()) else {
            self.defaulted(FIELD);
            return 0;
        };

        let clamped = raw.round().clamp(0.0, f64::from(AtsFeedback::MAX_SCORE)) as u8;
        if raw != f64::from(clamped) {
            self.repairs.push(FieldRepair::Clamped {
                field: FIELD.to_string(),
                from: raw,
                to: clamped,
            });
        }
        clamped
    }

    fn experience_level(
        &mut self,
        root: &Map<String, Value>,
        work: &[WorkExperience],
        today: NaiveDate,
    ) -> ExperienceLevel {
        const FIELD: &str = "experience_level";
        let label = match root.get(FIELD) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        if let Some(level) = ExperienceLevel::from_label(&label) {
            return level;
        }

        let level = infer_level(work, today).unwrap_or(ExperienceLevel::Unknown);
        self.repairs.push(FieldRepair::Remapped {
            field: FIELD.to_string(),
            from: label,
            to: level,
        });
        level
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::llm_client::LlmError;

    const SOURCE: &str = "Jane Doe Berlin Skills: Python, SQL Experience: Data Engineer at Acme Corp \
        2019 - 2023 built Kafka pipelines on AWS Education: BSc Computer Science, TU Berlin";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn full_response() -> Value {
        json!({
            "name": "Jane Doe",
            "location": "Berlin",
            "summary": "Data engineer",
            "skills": ["Python", "SQL"],
            "extra_skills": ["Kafka", "AWS"],
            "work_experience": [{
                "title": "Data Engineer",
                "company": "Acme Corp",
                "duration": "2019 - 2023",
                "location": "Berlin",
                "highlights": ["built Kafka pipelines"]
            }],
            "projects": [],
            "certifications": [],
            "education": [{"degree": "BSc Computer Science", "institution": "TU Berlin", "year": "2018"}],
            "experience_level": "Mid-Level",
            "recommended_roles": ["Data Engineer"],
            "ats_feedback": {"score": 78, "summary": "Solid", "strengths": ["clear"], "improvements": []}
        })
    }

    fn normalize(value: &Value) -> ParseOutcome {
        normalize_response(&value.to_string(), SOURCE, today()).unwrap()
    }

    #[test]
    fn test_well_formed_response_needs_no_repairs() {
        let outcome = normalize(&full_response());
        assert!(outcome.repairs.is_empty(), "repairs: {:?}", outcome.repairs);
        assert_eq!(outcome.record.skills, vec!["Python", "SQL"]);
        assert_eq!(outcome.record.extra_skills, vec!["Kafka", "AWS"]);
        assert_eq!(outcome.record.experience_level, ExperienceLevel::MidLevel);
        assert_eq!(outcome.record.ats_feedback.score, 78);
        assert_eq!(outcome.record.work_experience[0].company, "Acme Corp");
    }

    #[test]
    fn test_fenced_response_is_accepted() {
        let fenced = format!("```json\n{}\n```", full_response());
        let outcome = normalize_response(&fenced, SOURCE, today()).unwrap();
        assert_eq!(outcome.record.name, "Jane Doe");
    }

    #[test]
    fn test_truncated_json_is_invalid_json() {
        let truncated = r#"{"name": "Jane Doe", "skills": ["Python""#;
        let err = normalize_response(truncated, SOURCE, today()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_prose_response_is_invalid_json() {
        let err = normalize_response("Sure! Here is the resume.", SOURCE, today()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_non_object_json_is_invalid_json() {
        let err = normalize_response("[1, 2, 3]", SOURCE, today()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidJson(msg) if msg.contains("array")));
    }

    #[test]
    fn test_empty_object_yields_defaults() {
        let outcome = normalize_response("{}", "no sections here", today()).unwrap();
        let record = outcome.record;
        assert_eq!(record.name, "");
        assert!(record.skills.is_empty());
        assert!(record.work_experience.is_empty());
        assert_eq!(record.ats_feedback, AtsFeedback::default());
        assert_eq!(record.experience_level, ExperienceLevel::Unknown);
        assert!(outcome
            .repairs
            .contains(&FieldRepair::Defaulted { field: "name".to_string() }));
        assert!(outcome
            .repairs
            .contains(&FieldRepair::Defaulted { field: "ats_feedback".to_string() }));
    }

    #[test]
    fn test_missing_nested_keys_are_defaulted() {
        let mut value = full_response();
        value["work_experience"] = json!([{"company": "Acme Corp"}]);
        let outcome = normalize(&value);
        let job = &outcome.record.work_experience[0];
        assert_eq!(job.company, "Acme Corp");
        assert_eq!(job.title, "");
        assert!(job.highlights.is_empty());
        assert!(outcome.repairs.contains(&FieldRepair::Defaulted {
            field: "work_experience[0].title".to_string()
        }));
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let mut value = full_response();
        value["favourite_colour"] = json!("green");
        let outcome = normalize(&value);
        assert!(outcome.repairs.is_empty());
    }

    #[test]
    fn test_score_clamped_high_and_low() {
        for (raw, expected) in [(json!(150), 100u8), (json!(-5), 0u8), (json!(99.6), 100u8)] {
            let mut value = full_response();
            value["ats_feedback"]["score"] = raw;
            let outcome = normalize(&value);
            assert_eq!(outcome.record.ats_feedback.score, expected);
            assert!(outcome
                .repairs
                .iter()
                .any(|r| matches!(r, FieldRepair::Clamped { to, .. } if *to == expected)));
        }
    }

    #[test]
    fn test_score_numeric_string_is_coerced() {
        let mut value = full_response();
        value["ats_feedback"]["score"] = json!("85%");
        assert_eq!(normalize(&value).record.ats_feedback.score, 85);
    }

    #[test]
    fn test_score_non_numeric_defaults_to_zero() {
        for raw in [json!("excellent"), json!("NaN"), json!(true), json!([80]), json!(null)] {
            let mut value = full_response();
            value["ats_feedback"]["score"] = raw.clone();
            let outcome = normalize(&value);
            assert_eq!(outcome.record.ats_feedback.score, 0, "score {raw}");
            assert_eq!(outcome.record.ats_feedback.summary, "Solid");
            assert!(outcome.repairs.contains(&FieldRepair::Defaulted {
                field: "ats_feedback.score".to_string()
            }));
        }
    }

    #[test]
    fn test_invalid_level_is_inferred_from_history() {
        let mut value = full_response();
        value["experience_level"] = json!("Rockstar");
        let outcome = normalize(&value);
        assert_eq!(outcome.record.experience_level, ExperienceLevel::MidLevel);
        assert!(outcome.repairs.contains(&FieldRepair::Remapped {
            field: "experience_level".to_string(),
            from: "Rockstar".to_string(),
            to: ExperienceLevel::MidLevel,
        }));
    }

    #[test]
    fn test_invalid_level_without_history_is_unknown() {
        let mut value = full_response();
        value["experience_level"] = json!("Rockstar");
        value["work_experience"] = json!([]);
        assert_eq!(normalize(&value).record.experience_level, ExperienceLevel::Unknown);
    }

    #[test]
    fn test_skills_are_rebucketed_against_source() {
        let mut value = full_response();
        value["skills"] = json!(["Python", "Kafka"]);
        value["extra_skills"] = json!(["SQL", "python"]);
        let outcome = normalize(&value);
        assert_eq!(outcome.record.skills, vec!["Python", "SQL"]);
        assert_eq!(outcome.record.extra_skills, vec!["Kafka"]);
    }

    #[test]
    fn test_comma_string_skills_are_split() {
        let mut value = full_response();
        value["skills"] = json!("Python, SQL");
        let outcome = normalize(&value);
        assert_eq!(outcome.record.skills, vec!["Python", "SQL"]);
        assert!(outcome
            .repairs
            .contains(&FieldRepair::Coerced { field: "skills".to_string() }));
    }

    #[test]
    fn test_numeric_year_is_stringified() {
        let mut value = full_response();
        value["education"][0]["year"] = json!(2018);
        assert_eq!(normalize(&value).record.education[0].year, "2018");
    }

    struct ScriptedGenerator {
        response: Result<String, u16>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str, _temperature: f32) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::Api {
                    status: *status,
                    message: "overloaded".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_parser_sends_text_in_prompt() {
        let generator = Arc::new(ScriptedGenerator {
            response: Ok(full_response().to_string()),
            prompts: Mutex::new(Vec::new()),
        });
        let parser = GenerativeParser::new(generator.clone(), DEFAULT_TEMPERATURE);
        let outcome = parser.parse(&ExtractedText::from_raw(SOURCE)).await.unwrap();
        assert_eq!(outcome.record.name, "Jane Doe");
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Skills: Python, SQL"));
        assert!(!prompts[0].contains("{resume_text}"));
    }

    #[tokio::test]
    async fn test_provider_failure_is_generation_error() {
        let parser = GenerativeParser::new(
            Arc::new(ScriptedGenerator {
                response: Err(529),
                prompts: Mutex::new(Vec::new()),
            }),
            DEFAULT_TEMPERATURE,
        );
        let err = parser
            .parse(&ExtractedText::from_raw(SOURCE))
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::Generation(msg) if msg.contains("529")));
    }
}
