//! Scorer: turns a detector report into category, section and overall scores.
//!
//! Pure: the same report and catalog always produce the same `Scores`.
//!
//! Resume (primary document):
//!   anti_fabrication  = 100 − Σ weight(anti_fabrication violations)
//!   weak_quantifications = 100 − 5 × issues
//!   accuracy          = 100 − Σ weight(accuracy violations) − flag penalties + min(verified, 10)
//!   total             = category-weighted blend (50 / 30 / 20)
//! Cover letter (secondary document):
//!   domain_claims     = 100 − Σ weight(any known rule)
//!   total             = domain_claims
//! overall             = 0.7 × resume + 0.3 × cover letter
//!
//! Every score is clamped to [0, 100] before it is blended.

use crate::models::evaluation::{
    AccuracyScore, CoverLetterScore, DetectionReport, FloorReport, ResumeScore, Scores, Severity,
    Target, ToneScore, Violation, ViolationScore, WeakQuantificationIssue,
    WeakQuantificationScore,
};
use crate::scoring::rules::{
    RuleCatalog, RuleCategory, COMPANY_DATE_MISMATCH, CRITICAL_SCORE_FLOOR, MAJOR_SCORE_FLOOR,
    ROLE_TITLE_MISMATCH, WEAK_QUANTIFICATIONS, YEARS_EXPERIENCE_WRONG,
};

/// Overall scores below this produce a "below threshold" lesson.
pub const ACCEPTABLE_SCORE: u32 = 70;

/// Cap on the accuracy bonus earned from independently verified metrics.
pub const MAX_VERIFIED_BONUS: usize = 10;

const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    catalog: RuleCatalog,
}

impl Scorer {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self { catalog }
    }

    /// Computes all scores from one detector report.
    pub fn score(&self, report: &DetectionReport) -> Scores {
        let anti_fabrication = self.category_score(
            &report.resume_violations,
            RuleCategory::AntiFabrication,
        );
        let weak = self.weak_quantification_score(&report.weak_quantifications);
        let accuracy = self.accuracy_score(report);

        let weights = self.catalog.category_weights();
        let resume_total = blend(&[
            (anti_fabrication, weights.get(RuleCategory::AntiFabrication)),
            (accuracy, weights.get(RuleCategory::Accuracy)),
            (weak, weights.get(RuleCategory::Quality)),
        ]);

        let domain = self.domain_claims_score(&report.cover_letter_violations);
        let cover_letter_total = domain;

        let sections = self.catalog.section_weights();
        let overall = blend(&[
            (resume_total, sections.resume),
            (cover_letter_total, sections.cover_letter),
        ]);

        Scores {
            resume: ResumeScore {
                total: resume_total,
                anti_fabrication: ViolationScore {
                    score: anti_fabrication,
                    violations: report.resume_violations.clone(),
                },
                weak_quantifications: WeakQuantificationScore {
                    score: weak,
                    issues: report.weak_quantifications.clone(),
                },
                accuracy: AccuracyScore {
                    score: accuracy,
                    violations: report.accuracy_violations.clone(),
                    verified_metrics: report.verified_metrics.clone(),
                    company_dates_correct: report.company_dates_correct,
                    role_titles_correct: report.role_titles_correct,
                    years_exp_correct: report.years_exp_correct,
                },
            },
            cover_letter: CoverLetterScore {
                total: cover_letter_total,
                domain_claims: ViolationScore {
                    score: domain,
                    violations: report.cover_letter_violations.clone(),
                },
                // Tone is not audited yet; recorded as full marks.
                tone: ToneScore {
                    score: 100,
                    feedback: Vec::new(),
                },
            },
            overall,
        }
    }

    /// Checks the overall score against the floor for each severity present.
    pub fn floor_report(&self, scores: &Scores) -> FloorReport {
        let has = |severity: Severity| scores.violations().any(|v| v.severity == severity);
        FloorReport {
            below_critical_floor: has(Severity::Critical) && scores.overall < CRITICAL_SCORE_FLOOR,
            below_major_floor: has(Severity::Major) && scores.overall < MAJOR_SCORE_FLOOR,
        }
    }

    /// 100 minus the weight of every violation whose rule is in `category`.
    /// Unknown rules are ignored.
    fn category_score(&self, violations: &[Violation], category: RuleCategory) -> u32 {
        let deducted: i64 = violations
            .iter()
            .filter_map(|v| self.catalog.get(&v.rule))
            .filter(|rule| rule.category == category)
            .map(|rule| rule.weight as i64)
            .sum();
        clamp_score(MAX_SCORE - deducted)
    }

    fn weak_quantification_score(&self, issues: &[WeakQuantificationIssue]) -> u32 {
        let per_issue = self.catalog.weight_of(WEAK_QUANTIFICATIONS) as i64;
        clamp_score(MAX_SCORE - per_issue * issues.len() as i64)
    }

    fn accuracy_score(&self, report: &DetectionReport) -> u32 {
        let mut score = MAX_SCORE;

        score -= report
            .accuracy_violations
            .iter()
            .filter_map(|v| self.catalog.get(&v.rule))
            .filter(|rule| rule.category == RuleCategory::Accuracy)
            .map(|rule| rule.weight as i64)
            .sum::<i64>();

        for (correct, rule) in [
            (report.company_dates_correct, COMPANY_DATE_MISMATCH),
            (report.role_titles_correct, ROLE_TITLE_MISMATCH),
            (report.years_exp_correct, YEARS_EXPERIENCE_WRONG),
        ] {
            if !correct {
                score -= self.catalog.weight_of(rule) as i64;
            }
        }

        score += report.verified_metrics.len().min(MAX_VERIFIED_BONUS) as i64;

        clamp_score(score)
    }

    /// Cover-letter claims are penalised by any known rule, whatever its category.
    fn domain_claims_score(&self, violations: &[Violation]) -> u32 {
        let deducted: i64 = violations
            .iter()
            .filter_map(|v| self.catalog.get(&v.rule))
            .map(|rule| rule.weight as i64)
            .sum();
        clamp_score(MAX_SCORE - deducted)
    }

    /// Lessons derived from the scores alone (detector lessons are merged by the caller).
    pub fn extract_lessons(&self, scores: &Scores) -> Vec<String> {
        let mut lessons = Vec::new();

        for v in scores
            .resume
            .anti_fabrication
            .violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
        {
            lessons.push(format!(
                "Fabrication detected: {} - {}",
                v.rule, v.offending_text
            ));
        }

        for v in scores
            .resume
            .accuracy
            .violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
        {
            lessons.push(format!(
                "Accuracy error detected: {} - {}",
                v.rule, v.offending_text
            ));
        }

        if !scores.resume.weak_quantifications.issues.is_empty() {
            lessons.push("Weak quantifications found that undermine credibility".to_string());
        }

        if !scores.cover_letter.domain_claims.violations.is_empty() {
            lessons.push(
                "Cover letter made domain claims not supported by achievements".to_string(),
            );
        }

        if scores.overall < ACCEPTABLE_SCORE {
            lessons.push(
                "Overall quality below acceptable threshold - multiple issues detected"
                    .to_string(),
            );
        }

        lessons
    }

    /// Serializes an evaluation for later substring search by the retriever.
    /// Output order follows input order only; identical input gives identical text.
    pub fn build_rag_text(&self, target: &Target, scores: &Scores, lessons: &[String]) -> String {
        let mut text = format!(
            "Application: {} - {}\nOverall Score: {}/100\n",
            target.company, target.role, scores.overall
        );

        if !lessons.is_empty() {
            text.push_str("\nKey Issues:\n");
            for lesson in lessons {
                text.push_str(&format!("- {lesson}\n"));
            }
        }

        push_violation_block(
            &mut text,
            "Fabrication Patterns to Avoid",
            &scores.resume.anti_fabrication.violations,
        );
        push_violation_block(
            &mut text,
            "Accuracy Errors to Avoid",
            &scores.resume.accuracy.violations,
        );
        push_violation_block(
            &mut text,
            "Cover Letter Claims to Avoid",
            &scores.cover_letter.domain_claims.violations,
        );

        text
    }
}

fn push_violation_block(text: &mut String, heading: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    text.push_str(&format!("\n{heading}:\n"));
    for v in violations {
        text.push_str(&format!("- {}: {}\n", v.rule, v.offending_text));
    }
}

fn clamp_score(score: i64) -> u32 {
    score.clamp(0, MAX_SCORE) as u32
}

/// Weighted blend of already-clamped scores, truncated to an integer.
fn blend(parts: &[(u32, f64)]) -> u32 {
    let total: f64 = parts.iter().map(|(score, w)| *score as f64 * w).sum();
    // Absorb float error so e.g. 84.99999999 from exact inputs truncates to 85.
    ((total + 1e-9).floor() as i64).clamp(0, MAX_SCORE) as u32
}
