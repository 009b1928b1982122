//! Section recovery over flattened résumé text, and skill bucketing.
//!
//! Extraction collapses line breaks, so a heading is recognised by keyword:
//! it must either be followed by `:` or be written in upper case
//! ("SKILLS Python, SQL"). Lower-case prose such as "4 years experience" is
//! never a heading.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Summary,
    Skills,
    Experience,
    Education,
    Projects,
    Certifications,
    /// Recognised so it ends the section before it; its body is unused.
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub kind: SectionKind,
    pub body: &'a str,
}

// Longer headings first so "Technical Skills" wins over "Skills".
static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(technical skills|core skills|key skills|technical expertise|core competencies|skills|work experience|professional experience|employment history|work history|career history|professional background|experience|employment|education|projects|certifications|certificates|summary|profile|objective|achievements|awards|publications|interests|references)\b(\s*:)?",
    )
    .expect("valid heading regex")
});

fn heading_kind(keyword: &str) -> SectionKind {
    let keyword = keyword.to_ascii_lowercase();
    if keyword.contains("skills")
        || keyword.contains("expertise")
        || keyword.contains("competencies")
    {
        SectionKind::Skills
    } else if keyword.contains("experience")
        || keyword.contains("history")
        || keyword.contains("background")
        || keyword == "employment"
    {
        SectionKind::Experience
    } else if keyword == "education" {
        SectionKind::Education
    } else if keyword == "projects" {
        SectionKind::Projects
    } else if keyword.starts_with("certif") {
        SectionKind::Certifications
    } else if matches!(keyword.as_str(), "summary" | "profile" | "objective") {
        SectionKind::Summary
    } else {
        SectionKind::Other
    }
}

/// Splits text into the sections introduced by recognised headings.
/// Text before the first heading belongs to no section.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    let headings: Vec<(usize, usize, SectionKind)> = HEADING
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let keyword = caps.get(1)?;
            let has_colon = caps.get(2).is_some();
            let is_upper = keyword
                .as_str()
                .chars()
                .all(|c| !c.is_alphabetic() || c.is_uppercase());
            (has_colon || is_upper).then(|| (whole.start(), whole.end(), heading_kind(keyword.as_str())))
        })
        .collect();

    headings
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start, kind))| {
            let body_end = headings
                .get(i + 1)
                .map(|&(next_start, _, _)| next_start)
                .unwrap_or(text.len());
            Section {
                kind,
                body: text[body_start..body_end].trim(),
            }
        })
        .collect()
}

/// Concatenated list portions of every Skills section, if any exist.
pub fn skills_section(text: &str) -> Option<String> {
    let bodies: Vec<&str> = split_sections(text)
        .into_iter()
        .filter(|s| s.kind == SectionKind::Skills)
        .map(|s| list_prefix(s.body))
        .collect();
    (!bodies.is_empty()).then(|| bodies.join(", "))
}

/// `skills_section`, lower-cased for `contains_term`.
pub fn skills_section_text(text: &str) -> Option<String> {
    skills_section(text).map(|body| body.to_lowercase())
}

const TERM_DELIMITERS: [char; 8] = [',', ';', '|', '/', '•', '·', '●', '▪'];

/// Longest fragment, in words, that still reads as a term.
const MAX_TERM_WORDS: usize = 4;

/// Delimited fragments of `body` with their byte offsets.
fn fragments(body: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in body.char_indices() {
        if TERM_DELIMITERS.contains(&c) {
            out.push((start, &body[start..i]));
            start = i + c.len_utf8();
        }
    }
    out.push((start, &body[start..]));
    out
}

/// The part of a Skills body that still reads as a list. A delimited list
/// that runs into prose (typically an unrecognised heading and what follows
/// it) ends at the first word of the overlong fragment. An undelimited body
/// is kept whole.
fn list_prefix(body: &str) -> &str {
    let fragments = fragments(body);
    if fragments.len() < 2 {
        return body;
    }
    for (start, fragment) in fragments {
        if fragment.split_whitespace().count() > MAX_TERM_WORDS {
            let lead = fragment.len() - fragment.trim_start().len();
            let word = fragment.split_whitespace().next().unwrap_or_default();
            return body[..start + lead + word.len()].trim_end();
        }
    }
    body
}

/// Splits a skills list on `,` `;` `|` `/` and bullet glyphs. Fragments that
/// read like sentences (more than four words) are dropped.
pub fn split_terms(body: &str) -> Vec<String> {
    fragments(body)
        .into_iter()
        .map(|(_, t)| t.trim().trim_end_matches('.').trim())
        .filter(|t| !t.is_empty() && t.split_whitespace().count() <= MAX_TERM_WORDS)
        .map(str::to_string)
        .collect()
}

/// Case-insensitive whole-term containment. `needle` and `haystack` must
/// already be lower-cased.
pub fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillBucket {
    Skills,
    ExtraSkills,
}

/// A term that changed bucket during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillMove {
    pub term: String,
    pub to: SkillBucket,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillBuckets {
    pub skills: Vec<String>,
    pub extra_skills: Vec<String>,
    pub moves: Vec<SkillMove>,
}

/// Puts every candidate term into exactly one bucket.
///
/// With a Skills section present, membership in that section decides. Without
/// one, the strategy's own `skills` list stands. In both cases a term never
/// appears twice, and a Skills-section term is never duplicated into
/// `extra_skills`.
pub fn reconcile_skills(text: &str, skills: Vec<String>, extra_skills: Vec<String>) -> SkillBuckets {
    let section = skills_section_text(text);
    let mut buckets = SkillBuckets::default();
    let mut seen: Vec<String> = Vec::new();

    let candidates = skills
        .into_iter()
        .map(|t| (t, SkillBucket::Skills))
        .chain(extra_skills.into_iter().map(|t| (t, SkillBucket::ExtraSkills)));

    for (term, proposed) in candidates {
        let term = term.trim().to_string();
        let key = term.to_lowercase();
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key.clone());

        let bucket = match &section {
            Some(body) if contains_term(body, &key) => SkillBucket::Skills,
            Some(_) => SkillBucket::ExtraSkills,
            None => proposed,
        };
        if bucket != proposed {
            buckets.moves.push(SkillMove {
                term: term.clone(),
                to: bucket,
            });
        }
        match bucket {
            SkillBucket::Skills => buckets.skills.push(term),
            SkillBucket::ExtraSkills => buckets.extra_skills.push(term),
        }
    }

    buckets
}
