//! Fixer: deterministic, pattern-based correction of known violation shapes.
//!
//! Three libraries of (label, matcher, replacement) patterns:
//! - temporal: "N years of experience building <tool that is younger than N>"
//! - domain expert: "**<Domain> Expert**" positioning rewritten to infrastructure framing
//! - wording: fixed phrase substitutions, always run against both drafts
//!
//! Temporal and domain-expert libraries only run when a violation triggers them.
//! Each library is applied once per triggering violation, in order; a pattern
//! that does not match is a no-op. There is no fixed-point iteration.
//!
//! Inputs are never mutated; `apply_fixes` returns new drafts.

use regex::Regex;
use tracing::{debug, warn};

use crate::models::evaluation::{DetectionReport, Violation};

/// One search-and-replace rule. Replacement templates use `${n}` group syntax.
#[derive(Debug, Clone)]
pub struct FixPattern {
    pub label: String,
    matcher: Regex,
    replacement: String,
}

impl FixPattern {
    pub fn new(label: &str, pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.to_string(),
            matcher: Regex::new(pattern)?,
            replacement: replacement.to_string(),
        })
    }

    /// Returns the rewritten text, or `None` when the pattern does not match.
    fn apply(&self, text: &str) -> Option<String> {
        if !self.matcher.is_match(text) {
            return None;
        }
        Some(
            self.matcher
                .replace_all(text, self.replacement.as_str())
                .into_owned(),
        )
    }
}

/// An ordered list of patterns applied in sequence to the same text.
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    patterns: Vec<FixPattern>,
}

impl PatternLibrary {
    /// Compiles `(label, pattern, replacement)` triples. A pattern that fails to
    /// compile is logged and left out; the rest of the library still works.
    fn compile(library: &str, table: &[(&str, &str, &str)]) -> Self {
        let patterns = table
            .iter()
            .filter_map(|(label, pattern, replacement)| {
                match FixPattern::new(label, pattern, replacement) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        warn!("Dropping {} fix pattern '{}': {}", library, label, e);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Applies every matching pattern in order. The flag is true if any fired.
    fn apply(&self, text: &str) -> (String, bool) {
        let mut current = text.to_string();
        let mut fired = false;
        for pattern in &self.patterns {
            if let Some(next) = pattern.apply(&current) {
                debug!("Applied fix pattern: {}", pattern.label);
                current = next;
                fired = true;
            }
        }
        (current, fired)
    }
}

/// The two violation-triggered pattern categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixCategory {
    Temporal,
    DomainExpert,
}

impl FixCategory {
    fn is_triggered_by(&self, violation: &Violation) -> bool {
        match self {
            FixCategory::Temporal => violation.rule.contains("TEMPORAL"),
            FixCategory::DomainExpert => {
                violation.rule.contains("DOMAIN") || violation.offending_text.contains("Expert")
            }
        }
    }

    fn label(&self, violation: &Violation) -> String {
        match self {
            FixCategory::Temporal => {
                format!("Fixed temporal impossibility: {}", violation.offending_text)
            }
            FixCategory::DomainExpert => {
                format!("Fixed domain expert claim: {}", violation.offending_text)
            }
        }
    }
}

/// Result of one fixer pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixOutcome {
    pub primary: String,
    pub secondary: String,
    /// One label per violation whose fix attempt changed a draft.
    pub applied: Vec<String>,
    /// Copies of those violations carrying the applied label.
    pub resolved: Vec<Violation>,
}

pub struct Fixer {
    temporal: PatternLibrary,
    domain_expert: PatternLibrary,
    wording: PatternLibrary,
}

impl Fixer {
    pub fn new(
        temporal: PatternLibrary,
        domain_expert: PatternLibrary,
        wording: PatternLibrary,
    ) -> Self {
        Self {
            temporal,
            domain_expert,
            wording,
        }
    }

    /// The production pattern libraries.
    pub fn standard() -> Self {
        let fixer = Self::new(
            PatternLibrary::compile("temporal", TEMPORAL_PATTERNS),
            PatternLibrary::compile("domain expert", DOMAIN_EXPERT_PATTERNS),
            PatternLibrary::compile("wording", WORDING_PATTERNS),
        );
        debug!(
            "Fix patterns loaded: {} temporal, {} domain expert, {} wording",
            fixer.temporal.len(),
            fixer.domain_expert.len(),
            fixer.wording.len()
        );
        fixer
    }

    fn library(&self, category: FixCategory) -> &PatternLibrary {
        match category {
            FixCategory::Temporal => &self.temporal,
            FixCategory::DomainExpert => &self.domain_expert,
        }
    }

    /// Applies violation-triggered fixes and wording fixes to both drafts.
    ///
    /// Primary draft: temporal and domain-expert libraries, triggered by resume
    /// and accuracy violations. Secondary draft: domain-expert library,
    /// triggered by cover-letter violations. Wording library: both drafts.
    pub fn apply_fixes(&self, primary: &str, secondary: &str, report: &DetectionReport) -> FixOutcome {
        let mut outcome = FixOutcome::default();

        let primary_violations: Vec<&Violation> = report
            .resume_violations
            .iter()
            .chain(report.accuracy_violations.iter())
            .collect();

        let mut fixed_primary = primary.to_string();
        for category in [FixCategory::Temporal, FixCategory::DomainExpert] {
            fixed_primary = self.fix_for(
                category,
                fixed_primary,
                &primary_violations,
                &mut outcome,
            );
        }

        let secondary_violations: Vec<&Violation> =
            report.cover_letter_violations.iter().collect();
        let fixed_secondary = self.fix_for(
            FixCategory::DomainExpert,
            secondary.to_string(),
            &secondary_violations,
            &mut outcome,
        );

        outcome.primary = self.wording.apply(&fixed_primary).0;
        outcome.secondary = self.wording.apply(&fixed_secondary).0;
        outcome
    }

    fn fix_for(
        &self,
        category: FixCategory,
        mut text: String,
        violations: &[&Violation],
        outcome: &mut FixOutcome,
    ) -> String {
        let library = self.library(category);
        for violation in violations.iter().filter(|v| category.is_triggered_by(v)) {
            let (next, fired) = library.apply(&text);
            if fired {
                let label = category.label(violation);
                outcome.resolved.push(violation.with_fix_applied(label.clone()));
                outcome.applied.push(label);
                text = next;
            }
        }
        text
    }
}

impl Default for Fixer {
    fn default() -> Self {
        Self::standard()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pattern tables
// ────────────────────────────────────────────────────────────────────────────

/// Headline claims like "**Title with 25+ years of experience** building Kubernetes ..."
/// are reframed so the years attach to a durable discipline and the tool becomes expertise.
const TEMPORAL_PATTERNS: &[(&str, &str, &str)] = &[
    (
        "Temporal - building platform engineering",
        r"(?i)(\*\*[^*]+with )(\d+\+? years of experience)\*\* (?:building|architecting) ((?:enterprise-scale |scalable |production )?)platform engineering([,\n])",
        "${1}${2} in software engineering and infrastructure** with deep expertise in ${3}platform engineering${4}",
    ),
    (
        "Temporal - building AWS/cloud",
        r"(?i)(\*\*[^*]+with )(\d+\+? years of experience)\*\* (?:building|architecting) (AWS|Azure|GCP|multi-cloud|cloud-native) ([^,\n]+)",
        "${1}${2} in distributed systems and platform engineering** with deep expertise in ${3} ${4}",
    ),
    (
        "Temporal - building Kubernetes",
        r"(?i)(\*\*[^*]+with )(\d+\+? years of experience)\*\* (?:building|architecting) (Kubernetes|K8s|containerized|container-native) ([^,\n]+)",
        "${1}${2} in platform engineering and distributed systems** with extensive ${3} ${4}",
    ),
    (
        "Temporal - SRE/DevOps",
        r"(?i)(\*\*[^*]+with )(\d+\+? years of experience)\*\* (?:in|of|building|architecting) (site reliability engineering|SRE|DevOps) ([^,\n]+)",
        "${1}${2} in operational excellence and infrastructure automation** with deep ${3} expertise ${4}",
    ),
    (
        "Temporal - AI-powered",
        r"(?i)(\*\*[^*]+with )(\d+\+? years of experience)\*\* (?:building|architecting|in) (AI-powered|AI-driven|machine learning) ([^,\n]+)",
        "${1}${2} in system architecture and automation** with expertise in ${3} ${4}",
    ),
    (
        "Temporal - DeFi/Blockchain",
        r"(?i)(\*\*[^*]+with )(\d+\+? years of experience)\*\* (?:building|architecting) (distributed DeFi|DeFi|blockchain|cryptocurrency) ([^,\n]+)",
        "${1}${2} in distributed systems and platform engineering** with deep expertise building infrastructure for ${3} ${4}",
    ),
    (
        "Temporal - general tech prefix",
        r"(?i)(\*\*[^*]+with )(\d+\+? years of experience)\*\* (?:building|architecting|developing) (enterprise-grade|scalable|production) ([^\n]*?) (AWS|Kubernetes|SRE|AI|DeFi|cloud-native|blockchain) ([^,\n]+)",
        "${1}${2} in ${3} ${4} systems** with expertise in ${5} ${6}",
    ),
];

const DOMAIN_EXPERT_PATTERNS: &[(&str, &str, &str)] = &[
    (
        "Crypto Expert specializing → Infrastructure Architect",
        r"(?i)\*\*([^*]*?)(DeFi|Cryptocurrency|Crypto)([^*]*?) Expert\*\* specializing in ([^\n]+)",
        "**Multi-Cloud Infrastructure Architect** specializing in Kubernetes platforms supporting cryptocurrency trading systems, blockchain infrastructure, and ${4}",
    ),
    (
        "Crypto Expert → Infrastructure Architect",
        r"(?i)\*\*([^*]*?)(DeFi|Cryptocurrency|Crypto)([^*]*?) Expert\*\*",
        "**Multi-Cloud Infrastructure Architect**",
    ),
    (
        "Industry Expert → Infrastructure Architect",
        r"(?i)\*\*([^*]*?)(Climate|Gaming|Healthcare|Real Estate|Satellite|Geospatial)([^*]*?) Expert\*\*",
        "**Infrastructure Architect** with experience in ${2} platforms",
    ),
];

const WORDING_PATTERNS: &[(&str, &str, &str)] = &[
    (
        "Targeted resume wording",
        r"This is a targeted resume highlighting",
        "The resume submitted for this role highlights",
    ),
    (
        "Weak quantification - continents",
        r"(?i)(across|spanning) 5 continents",
        "${1} North America, South America, Europe, Africa, and India",
    ),
    (
        "Weak quantification - clusters",
        r"(?i)(\d+\+? (?:WAF )?(?:security )?(?:events|logs) daily (?:across|over) )7 distributed clusters",
        "${1}multi-cluster distributed infrastructure",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluation::Severity;

    fn violation(rule: &str, text: &str) -> Violation {
        Violation {
            rule: rule.to_string(),
            severity: Severity::Major,
            location: "resume.md:1".to_string(),
            offending_text: text.to_string(),
            evidence_checked: String::new(),
            suggested_fix: None,
            fix_applied: None,
        }
    }

    const TEMPORAL_HEADLINE: &str =
        "**Platform Engineer with 25+ years of experience** building Kubernetes platforms at scale, across fintech\n";

    #[test]
    fn test_standard_libraries_compile() {
        let fixer = Fixer::standard();
        assert_eq!(fixer.temporal.len(), TEMPORAL_PATTERNS.len());
        assert_eq!(fixer.domain_expert.len(), DOMAIN_EXPERT_PATTERNS.len());
        assert_eq!(fixer.wording.len(), WORDING_PATTERNS.len());
    }

    #[test]
    fn test_temporal_fix_reframes_headline() {
        let mut report = DetectionReport::default();
        report.accuracy_violations = vec![violation(
            "TEMPORAL_IMPOSSIBILITY",
            "25+ years of experience building Kubernetes",
        )];

        let outcome = Fixer::standard().apply_fixes(TEMPORAL_HEADLINE, "", &report);
        assert_eq!(
            outcome.primary,
            "**Platform Engineer with 25+ years of experience in platform engineering and distributed systems** with extensive Kubernetes platforms at scale, across fintech\n"
        );
        assert_eq!(
            outcome.applied,
            vec!["Fixed temporal impossibility: 25+ years of experience building Kubernetes"]
        );
        assert_eq!(outcome.resolved.len(), 1);
        assert_eq!(
            outcome.resolved[0].fix_applied.as_deref(),
            Some(outcome.applied[0].as_str())
        );
    }

    #[test]
    fn test_temporal_fix_is_stable_on_rerun() {
        let mut report = DetectionReport::default();
        report.resume_violations = vec![violation("TEMPORAL_IMPOSSIBILITY", "25+ years")];
        let fixer = Fixer::standard();

        let first = fixer.apply_fixes(TEMPORAL_HEADLINE, "", &report);
        let second = fixer.apply_fixes(&first.primary, "", &report);
        assert_eq!(second.primary, first.primary);
        assert!(second.applied.is_empty());
    }

    #[test]
    fn test_general_tech_prefix_headline_is_reframed_once() {
        let headline =
            "**Staff Engineer with 25+ years of experience** developing scalable payment Kubernetes platforms, across fintech\n";
        let mut report = DetectionReport::default();
        report.resume_violations = vec![violation("TEMPORAL_IMPOSSIBILITY", "25+ years")];
        let fixer = Fixer::standard();

        let first = fixer.apply_fixes(headline, "", &report);
        assert_eq!(
            first.primary,
            "**Staff Engineer with 25+ years of experience in scalable payment systems** with expertise in Kubernetes platforms, across fintech\n"
        );
        assert_eq!(first.applied.len(), 1);

        let second = fixer.apply_fixes(&first.primary, "", &report);
        assert_eq!(second.primary, first.primary);
        assert!(second.applied.is_empty());
    }

    #[test]
    fn test_patterns_not_attempted_without_trigger() {
        let mut report = DetectionReport::default();
        report.resume_violations = vec![violation("SKILL_FABRICATION", "Haskell")];

        let outcome = Fixer::standard().apply_fixes(TEMPORAL_HEADLINE, "", &report);
        assert_eq!(outcome.primary, TEMPORAL_HEADLINE);
        assert!(outcome.applied.is_empty());
        assert!(outcome.resolved.is_empty());
    }

    #[test]
    fn test_domain_expert_triggered_by_offending_text() {
        let primary = "**DeFi Infrastructure Expert** specializing in high-throughput trading\n";
        let mut report = DetectionReport::default();
        report.resume_violations = vec![violation(
            "FORBIDDEN_INDUSTRY_CLAIMS",
            "DeFi Infrastructure Expert",
        )];

        let outcome = Fixer::standard().apply_fixes(primary, "", &report);
        assert_eq!(
            outcome.primary,
            "**Multi-Cloud Infrastructure Architect** specializing in Kubernetes platforms supporting cryptocurrency trading systems, blockchain infrastructure, and high-throughput trading\n"
        );
        assert_eq!(
            outcome.applied,
            vec!["Fixed domain expert claim: DeFi Infrastructure Expert"]
        );

        let again = Fixer::standard().apply_fixes(&outcome.primary, "", &report);
        assert_eq!(again.primary, outcome.primary);
    }

    #[test]
    fn test_one_label_per_violation_not_per_pattern() {
        let primary = "**Climate Tech Expert** and **Gaming Systems Expert**";
        let mut report = DetectionReport::default();
        report.resume_violations = vec![
            violation("FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS", "Climate Tech Expert"),
            violation("FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS", "Gaming Systems Expert"),
        ];

        let outcome = Fixer::standard().apply_fixes(primary, "", &report);
        assert_eq!(
            outcome.primary,
            "**Infrastructure Architect** with experience in Climate platforms and **Infrastructure Architect** with experience in Gaming platforms"
        );
        // The first violation's pass rewrote both headlines; the second found nothing left.
        assert_eq!(outcome.applied.len(), 1);
    }

    #[test]
    fn test_cover_letter_domain_claims_are_fixed() {
        let secondary = "As a **Geospatial Data Expert**, I would thrive here.";
        let mut report = DetectionReport::default();
        report.cover_letter_violations = vec![violation(
            "FORBIDDEN_TECHNICAL_DOMAIN_CLAIMS",
            "Geospatial Data Expert",
        )];

        let outcome = Fixer::standard().apply_fixes("# Resume", secondary, &report);
        assert_eq!(
            outcome.secondary,
            "As a **Infrastructure Architect** with experience in Geospatial platforms, I would thrive here."
        );
        assert_eq!(outcome.primary, "# Resume");
        assert_eq!(outcome.resolved.len(), 1);
    }

    #[test]
    fn test_wording_patterns_always_run_on_both_drafts() {
        let primary = "Processed 500000+ security events daily across 7 distributed clusters";
        let secondary = "This is a targeted resume highlighting work spanning 5 continents.";

        let outcome = Fixer::standard().apply_fixes(primary, secondary, &DetectionReport::default());
        assert_eq!(
            outcome.primary,
            "Processed 500000+ security events daily across multi-cluster distributed infrastructure"
        );
        assert_eq!(
            outcome.secondary,
            "The resume submitted for this role highlights work spanning North America, South America, Europe, Africa, and India."
        );
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_no_matches_returns_inputs_unchanged() {
        let mut report = DetectionReport::default();
        report.resume_violations = vec![violation("TEMPORAL_IMPOSSIBILITY", "30 years of Rust")];

        let outcome = Fixer::standard().apply_fixes("plain resume", "plain letter", &report);
        assert_eq!(outcome.primary, "plain resume");
        assert_eq!(outcome.secondary, "plain letter");
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_bad_pattern_is_dropped_from_library() {
        let library = PatternLibrary::compile(
            "test",
            &[("broken", r"(unclosed", "x"), ("ok", r"foo", "bar")],
        );
        assert_eq!(library.len(), 1);
        assert_eq!(library.apply("foo foo"), ("bar bar".to_string(), true));
    }
}
