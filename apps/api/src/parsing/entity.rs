//! Entity parser, the degraded-mode strategy.
//!
//! Runs an `EntityRecognizer` over the text and buckets what it finds:
//! organisations become work-experience entries, institutions and degrees
//! become education entries, skills are split between `skills` and
//! `extra_skills` by whether they sit in the Skills section. Terms listed in
//! the Skills section count as skills even when the recognizer misses them.
//!
//! Outside that section, recall is limited to what the recognizer knows.
//! This parser never sets
//! `experience_level` (always `Unknown`), `recommended_roles` or
//! `ats_feedback`.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::extraction::ExtractedText;
use crate::parsing::models::{Education, ResumeRecord, WorkExperience};
use crate::parsing::sections::{
    contains_term, reconcile_skills, skills_section, skills_section_text, split_terms,
};
use crate::parsing::{FieldRepair, ParseError, ParseOutcome, ParserStrategy, ResumeParser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLabel {
    Organization,
    Institution,
    Degree,
    Skill,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub text: String,
    pub label: EntityLabel,
    /// Byte offset of the span in the source text.
    pub start: usize,
}

/// Tags spans of text with entity labels.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Vec<Entity>;
}

const SKILL_LEXICON: &[&str] = &[
    "Python", "Rust", "Go", "Java", "JavaScript", "TypeScript", "C++", "C#", "Ruby", "PHP",
    "Kotlin", "Swift", "Scala", "SQL", "PostgreSQL", "MySQL", "MongoDB", "Redis", "Kafka",
    "Spark", "Hadoop", "Airflow", "dbt", "Snowflake", "AWS", "GCP", "Azure", "Docker",
    "Kubernetes", "Terraform", "Ansible", "Linux", "Git", "React", "Angular", "Vue",
    "Node.js", "Django", "Flask", "FastAPI", "Spring", "GraphQL", "REST", "gRPC",
    "TensorFlow", "PyTorch", "scikit-learn", "Pandas", "NumPy", "Machine Learning",
    "Deep Learning", "NLP", "Tableau", "Excel", "Jira", "Agile", "Scrum", "CI/CD",
];

static ORGANIZATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[A-Z][A-Za-z0-9&\-]*\s+){0,2}[A-Z][A-Za-z0-9&\-]*\s+(?:Inc|LLC|Ltd|Corp|Corporation|Company|Technologies|Labs|Systems|Solutions|Group|GmbH)\b\.?",
    )
    .expect("valid organization regex")
});

static INSTITUTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?:University|College|Institute|School) of(?: [A-Z][A-Za-z]+){1,4}|(?:[A-Z][A-Za-z.]+ ){1,4}(?:University|College|Institute of Technology|Institute|Polytechnic))\b",
    )
    .expect("valid institution regex")
});

static DEGREE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?:Bachelor|Master)(?:'s)?(?: of [A-Z][a-z]+(?: [A-Z][a-z]+)?)?|Ph\.?D\b|MBA\b|B\.?Sc\b|M\.?Sc\b|B\.?Tech\b|M\.?Tech\b|B\.S\.|M\.S\.|B\.A\.|M\.A\.)",
    )
    .expect("valid degree regex")
});

/// Built-in recognizer: a skill lexicon plus capitalisation patterns for
/// organisations, institutions and degrees.
pub struct LexiconRecognizer {
    skills: Vec<String>,
}

impl Default for LexiconRecognizer {
    fn default() -> Self {
        Self::with_skills(SKILL_LEXICON.iter().map(|s| s.to_string()))
    }
}

impl LexiconRecognizer {
    pub fn with_skills(skills: impl IntoIterator<Item = String>) -> Self {
        Self {
            skills: skills.into_iter().collect(),
        }
    }
}

impl EntityRecognizer for LexiconRecognizer {
    fn recognize(&self, text: &str) -> Vec<Entity> {
        let mut entities = Vec::new();

        let patterns: [(&Regex, EntityLabel); 3] = [
            (&*ORGANIZATION, EntityLabel::Organization),
            (&*INSTITUTION, EntityLabel::Institution),
            (&*DEGREE, EntityLabel::Degree),
        ];
        for (pattern, label) in patterns {
            entities.extend(pattern.find_iter(text).map(|m| Entity {
                text: m.as_str().trim().to_string(),
                label,
                start: m.start(),
            }));
        }

        let lower = text.to_lowercase();
        for skill in &self.skills {
            let needle = skill.to_lowercase();
            if contains_term(&lower, &needle) {
                if let Some(start) = lower.find(&needle) {
                    entities.push(Entity {
                        text: skill.clone(),
                        label: EntityLabel::Skill,
                        start,
                    });
                }
            }
        }

        entities.sort_by_key(|e| e.start);
        entities
    }
}

pub struct EntityParser {
    recognizer: Arc<dyn EntityRecognizer>,
}

impl EntityParser {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self { recognizer }
    }
}

#[async_trait]
impl ResumeParser for EntityParser {
    fn strategy(&self) -> ParserStrategy {
        ParserStrategy::Entity
    }

    async fn parse(&self, text: &ExtractedText) -> Result<ParseOutcome, ParseError> {
        if text.is_empty() {
            return Err(ParseError::MissingRequiredField("resume text".to_string()));
        }

        let entities = self.recognizer.recognize(text.as_str());
        if entities.is_empty() {
            return Err(ParseError::MissingRequiredField(
                "no organisation, education or skill entities recognised".to_string(),
            ));
        }

        let outcome = bucket_entities(text.as_str(), &entities);
        debug!(
            entities = entities.len(),
            jobs = outcome.record.work_experience.len(),
            skills = outcome.record.skills.len(),
            "entity parse complete"
        );
        Ok(outcome)
    }
}

fn bucket_entities(text: &str, entities: &[Entity]) -> ParseOutcome {
    let mut record = ResumeRecord::default();
    let mut skills = Vec::new();
    let mut extra_skills = Vec::new();
    let section = skills_section_text(text);

    let mut degrees = Vec::new();
    let mut institutions = Vec::new();

    for entity in entities {
        match entity.label {
            EntityLabel::Organization => {
                if !record
                    .work_experience
                    .iter()
                    .any(|w| w.company.eq_ignore_ascii_case(&entity.text))
                {
                    record.work_experience.push(WorkExperience {
                        company: entity.text.clone(),
                        ..Default::default()
                    });
                }
            }
            EntityLabel::Institution => institutions.push(entity.text.clone()),
            EntityLabel::Degree => degrees.push(entity.text.clone()),
            EntityLabel::Skill => match &section {
                Some(body) if contains_term(body, &entity.text.to_lowercase()) => {
                    skills.push(entity.text.clone())
                }
                _ => extra_skills.push(entity.text.clone()),
            },
        }
    }

    if let Some(body) = skills_section(text) {
        skills.extend(split_terms(&body));
    }

    // Pair degrees with institutions in reading order.
    let pairs = degrees.len().max(institutions.len());
    for i in 0..pairs {
        record.education.push(Education {
            degree: degrees.get(i).cloned().unwrap_or_default(),
            institution: institutions.get(i).cloned().unwrap_or_default(),
            year: String::new(),
        });
    }

    let buckets = reconcile_skills(text, skills, extra_skills);
    record.skills = buckets.skills;
    record.extra_skills = buckets.extra_skills;
    let repairs = buckets
        .moves
        .into_iter()
        .map(|m| FieldRepair::MovedSkill {
            term: m.term,
            to: m.to,
        })
        .collect();

    ParseOutcome { record, repairs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::models::ExperienceLevel;

    const RESUME: &str = "John Smith Skills: Python, SQL, Docker Experience: Backend Engineer \
        at Globex Corp 2018 - 2022 shipped Kafka and Kubernetes services. Analyst at Initech LLC \
        Education: Bachelor of Science, Stanford University";

    fn parser() -> EntityParser {
        EntityParser::new(Arc::new(LexiconRecognizer::default()))
    }

    #[test]
    fn test_recognizer_labels() {
        let entities = LexiconRecognizer::default().recognize(RESUME);
        let find = |label| {
            entities
                .iter()
                .filter(|e| e.label == label)
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(find(EntityLabel::Organization), vec!["Globex Corp", "Initech LLC"]);
        assert_eq!(find(EntityLabel::Institution), vec!["Stanford University"]);
        assert_eq!(find(EntityLabel::Degree), vec!["Bachelor of Science"]);
        assert!(find(EntityLabel::Skill).contains(&"Kafka"));
    }

    #[test]
    fn test_recognizer_ignores_substrings() {
        let entities = LexiconRecognizer::default().recognize("Worked with PostgreSQL daily");
        let skills: Vec<&str> = entities
            .iter()
            .filter(|e| e.label == EntityLabel::Skill)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(skills, vec!["PostgreSQL"]);
    }

    #[tokio::test]
    async fn test_entities_are_bucketed() {
        let outcome = parser()
            .parse(&ExtractedText::from_raw(RESUME))
            .await
            .unwrap();
        let record = outcome.record;

        assert_eq!(record.skills, vec!["Python", "SQL", "Docker"]);
        assert!(record.extra_skills.contains(&"Kafka".to_string()));
        assert!(record.extra_skills.contains(&"Kubernetes".to_string()));
        assert!(!record.extra_skills.iter().any(|s| record.skills.contains(s)));

        let companies: Vec<&str> = record
            .work_experience
            .iter()
            .map(|w| w.company.as_str())
            .collect();
        assert_eq!(companies, vec!["Globex Corp", "Initech LLC"]);
        assert_eq!(record.education[0].institution, "Stanford University");
        assert_eq!(record.education[0].degree, "Bachelor of Science");
    }

    #[tokio::test]
    async fn test_degraded_fields_stay_empty() {
        let record = parser()
            .parse(&ExtractedText::from_raw(RESUME))
            .await
            .unwrap()
            .record;
        assert_eq!(record.experience_level, ExperienceLevel::Unknown);
        assert!(record.recommended_roles.is_empty());
        assert!(record.ats_feedback.is_empty());
    }

    #[tokio::test]
    async fn test_no_entities_is_missing_field() {
        let err = parser()
            .parse(&ExtractedText::from_raw("lorem ipsum dolor sit amet"))
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingRequiredField(_)));
    }

    #[tokio::test]
    async fn test_empty_text_is_missing_field() {
        let err = parser()
            .parse(&ExtractedText::from_raw("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingRequiredField(_)));
    }

    #[tokio::test]
    async fn test_custom_recognizer_is_used() {
        struct FixedRecognizer;
        impl EntityRecognizer for FixedRecognizer {
            fn recognize(&self, _text: &str) -> Vec<Entity> {
                vec![Entity {
                    text: "Umbrella Corp".to_string(),
                    label: EntityLabel::Organization,
                    start: 0,
                }]
            }
        }

        let outcome = EntityParser::new(Arc::new(FixedRecognizer))
            .parse(&ExtractedText::from_raw("anything"))
            .await
            .unwrap();
        assert_eq!(outcome.record.work_experience[0].company, "Umbrella Corp");
    }

    #[tokio::test]
    async fn test_listed_skills_outside_lexicon_are_kept() {
        let text = "Ana Lima SKILLS Python, Stakeholder Management, Figma \
            WORK HISTORY Designer at Globex Corp using Kafka";
        let record = parser()
            .parse(&ExtractedText::from_raw(text))
            .await
            .unwrap()
            .record;
        assert_eq!(record.skills, vec!["Python", "Stakeholder Management", "Figma"]);
        assert_eq!(record.extra_skills, vec!["Kafka"]);
    }
}
