// Résumé parsing prompt templates.

pub const RESUME_PARSE_PROMPT: &str = r#"Extract structured data from the resume text below and score it for ATS compliance.

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly this structure, every key present):
{
  "name": "string",
  "location": "string",
  "summary": "string",
  "skills": ["string"],
  "extra_skills": ["string"],
  "work_experience": [
    {"title": "string", "company": "string", "duration": "string", "location": "string", "highlights": ["string"]}
  ],
  "projects": [
    {"name": "string", "duration": "string", "technologies": ["string"], "description": "string"}
  ],
  "certifications": [{"name": "string", "issuer": "string", "year": "string"}],
  "education": [{"degree": "string", "institution": "string", "year": "string"}],
  "experience_level": "Entry-Level" | "Junior" | "Mid-Level" | "Senior" | "Lead/Principal",
  "recommended_roles": ["string"],
  "ats_feedback": {
    "score": 0-100,
    "summary": "string",
    "strengths": ["string"],
    "improvements": ["string"]
  }
}

RULES:
1. "skills" holds ONLY terms listed under a dedicated Skills heading.
2. "extra_skills" holds technologies and tools mentioned anywhere else. Never repeat a term from "skills".
3. "duration" keeps the dates as written, e.g. "Jan 2019 - Present" or "2018 - 2021".
4. "experience_level" follows total years of work: <1 Entry-Level, 1-3 Junior, 3-6 Mid-Level, 6-12 Senior, 12+ Lead/Principal.
5. "ats_feedback.score" is an integer between 0 and 100 rating keyword density and structure.
6. Use "" or [] for anything the resume does not state. Do NOT invent details.
7. Return ONLY the JSON object. No other text, no code fences."#;
