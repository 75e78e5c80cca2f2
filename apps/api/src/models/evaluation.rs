use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity of a rule violation. Serialized lowercase; parsed in any case,
/// since the detector does not always keep to the lowercase form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "major" => Ok(Severity::Major),
            "minor" => Ok(Severity::Minor),
            _ => Err(format!("unknown severity '{value}'")),
        }
    }
}

/// A rule breach reported by the violation detector.
///
/// Immutable once produced; the only permitted change is attaching a fix
/// note via [`Violation::with_fix_applied`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub severity: Severity,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "fabricated", default)]
    pub offending_text: String,
    #[serde(default)]
    pub evidence_checked: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_applied: Option<String>,
}

impl Violation {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    /// Returns a copy carrying a note about the automated fix that addressed it.
    pub fn with_fix_applied(&self, note: impl Into<String>) -> Violation {
        Violation {
            fix_applied: Some(note.into()),
            ..self.clone()
        }
    }
}

/// A number or phrase that undermines credibility (e.g. "7 clusters").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakQuantificationIssue {
    #[serde(default)]
    pub location: String,
    #[serde(rename = "weak_number", default)]
    pub weak_phrase: String,
    #[serde(default)]
    pub suggested: String,
    #[serde(default)]
    pub fixed: bool,
}

/// How the draft lines up against the brief's requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JdMatch {
    #[serde(default)]
    pub matched: Vec<String>,
    #[serde(default)]
    pub unmatched: Vec<String>,
    #[serde(default)]
    pub fabrications_to_match: Vec<String>,
}

/// Raw output of one detector pass (the evaluation-result shape).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    #[serde(default)]
    pub resume_violations: Vec<Violation>,
    #[serde(default)]
    pub weak_quantifications: Vec<WeakQuantificationIssue>,
    #[serde(default)]
    pub accuracy_violations: Vec<Violation>,
    #[serde(default)]
    pub cover_letter_violations: Vec<Violation>,
    #[serde(default)]
    pub verified_metrics: Vec<String>,
    #[serde(default)]
    pub company_dates_correct: bool,
    #[serde(default)]
    pub role_titles_correct: bool,
    #[serde(default)]
    pub years_exp_correct: bool,
    #[serde(default)]
    pub jd_match: JdMatch,
    #[serde(default)]
    pub lessons_learned: Vec<String>,
}

impl DetectionReport {
    /// Violations across every section. Weak-quantification issues are not counted.
    pub fn total_violations(&self) -> usize {
        self.resume_violations.len()
            + self.accuracy_violations.len()
            + self.cover_letter_violations.len()
    }

    pub fn all_violations(&self) -> impl Iterator<Item = &Violation> {
        self.resume_violations
            .iter()
            .chain(self.accuracy_violations.iter())
            .chain(self.cover_letter_violations.iter())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scores
// ────────────────────────────────────────────────────────────────────────────

/// A category score together with the violations that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationScore {
    pub score: u32,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeakQuantificationScore {
    pub score: u32,
    #[serde(default)]
    pub issues: Vec<WeakQuantificationIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyScore {
    pub score: u32,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub verified_metrics: Vec<String>,
    pub company_dates_correct: bool,
    pub role_titles_correct: bool,
    pub years_exp_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneScore {
    pub score: u32,
    #[serde(default)]
    pub feedback: Vec<String>,
}

/// Primary-document section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeScore {
    pub total: u32,
    pub anti_fabrication: ViolationScore,
    pub weak_quantifications: WeakQuantificationScore,
    pub accuracy: AccuracyScore,
}

/// Secondary-document section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetterScore {
    pub total: u32,
    pub domain_claims: ViolationScore,
    pub tone: ToneScore,
}

/// Every numeric field is in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub resume: ResumeScore,
    pub cover_letter: CoverLetterScore,
    pub overall: u32,
}

impl Scores {
    /// Every violation behind these scores, in section order.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.resume
            .anti_fabrication
            .violations
            .iter()
            .chain(self.resume.accuracy.violations.iter())
            .chain(self.cover_letter.domain_claims.violations.iter())
    }

    pub fn critical_violation_count(&self) -> usize {
        self.violations().filter(|v| v.is_critical()).count()
    }
}

/// Severity floors an overall score fell below. Reported only; scores are not adjusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorReport {
    /// Critical violations present and overall below the critical floor.
    pub below_critical_floor: bool,
    /// Major violations present and overall below the major floor.
    pub below_major_floor: bool,
}

impl FloorReport {
    pub fn any(&self) -> bool {
        self.below_critical_floor || self.below_major_floor
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluation record
// ────────────────────────────────────────────────────────────────────────────

/// The application a document set was tailored for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub company: String,
    pub role: String,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.company, self.role)
    }
}

/// One full audit result, persisted once per attempt and never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub attempt_id: Uuid,
    pub company: String,
    pub role: String,
    pub generated_at: DateTime<Utc>,
    pub evaluated_at: DateTime<Utc>,
    pub scores: Scores,
    #[serde(rename = "jd_requirements", default)]
    pub jd_match: JdMatch,
    #[serde(rename = "lessons_learned", default)]
    pub lessons: Vec<String>,
    #[serde(default)]
    pub rag_context: String,
    #[serde(default)]
    pub version: String,
}

impl Evaluation {
    pub fn target(&self) -> Target {
        Target {
            company: self.company.clone(),
            role: self.role.clone(),
        }
    }
}
