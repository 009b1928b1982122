use serde::{Deserialize, Serialize};

/// Structured résumé produced by a `ResumeParser`.
///
/// Every field has a safe empty default; the generative parser relies on this
/// to repair partial model output instead of rejecting it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeRecord {
    pub name: String,
    pub location: String,
    pub summary: String,
    /// Terms listed in a dedicated Skills section.
    pub skills: Vec<String>,
    /// Terms found anywhere else. Never overlaps `skills`.
    pub extra_skills: Vec<String>,
    pub work_experience: Vec<WorkExperience>,
    pub projects: Vec<Project>,
    pub certifications: Vec<Certification>,
    pub education: Vec<Education>,
    pub experience_level: ExperienceLevel,
    pub recommended_roles: Vec<String>,
    pub ats_feedback: AtsFeedback,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperience {
    pub title: String,
    pub company: String,
    pub duration: String,
    pub location: String,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub duration: String,
    pub technologies: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    pub name: String,
    pub issuer: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

/// ATS compliance feedback. `score` is always within 0 to 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtsFeedback {
    pub score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

impl AtsFeedback {
    pub const MAX_SCORE: u8 = 100;

    pub fn is_empty(&self) -> bool {
        self.score == 0
            && self.summary.is_empty()
            && self.strengths.is_empty()
            && self.improvements.is_empty()
    }
}

/// Seniority band. `Unknown` is reported when no band can be established.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "Entry-Level")]
    EntryLevel,
    Junior,
    #[serde(rename = "Mid-Level")]
    MidLevel,
    Senior,
    #[serde(rename = "Lead/Principal")]
    LeadPrincipal,
    #[default]
    Unknown,
}

impl ExperienceLevel {
    /// Upper bounds (exclusive, in years) of the first four bands.
    const BAND_CEILINGS: [(f64, ExperienceLevel); 4] = [
        (1.0, ExperienceLevel::EntryLevel),
        (3.0, ExperienceLevel::Junior),
        (6.0, ExperienceLevel::MidLevel),
        (12.0, ExperienceLevel::Senior),
    ];

    /// Maps total years of experience to a band. Monotonic non-decreasing.
    pub fn from_years(years: f64) -> Self {
        let years = if years.is_finite() { years.max(0.0) } else { 0.0 };
        Self::BAND_CEILINGS
            .iter()
            .find(|(ceiling, _)| years < *ceiling)
            .map(|(_, level)| *level)
            .unwrap_or(ExperienceLevel::LeadPrincipal)
    }

    /// Accepts the canonical labels plus common spellings ("mid level",
    /// "Lead", "principal", "entry"). Anything else is not a band.
    pub fn from_label(label: &str) -> Option<Self> {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "entrylevel" | "entry" => Some(Self::EntryLevel),
            "junior" => Some(Self::Junior),
            "midlevel" | "mid" | "intermediate" => Some(Self::MidLevel),
            "senior" => Some(Self::Senior),
            "leadprincipal" | "lead" | "principal" => Some(Self::LeadPrincipal),
            _ => None,
        }
    }

    /// Position in the seniority ordering; `None` for `Unknown`.
    #[cfg(test)]
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::EntryLevel => Some(0),
            Self::Junior => Some(1),
            Self::MidLevel => Some(2),
            Self::Senior => Some(3),
            Self::LeadPrincipal => Some(4),
            Self::Unknown => None,
        }
    }
}
