//! Heuristic classifiers used by the index. Pure string → enum functions.

use crate::models::index::{Industry, RoleLevel};

/// Rough industry from a company name. First match wins, in this order:
/// bank/capital, tech/soft, cloud/aws, pay.
pub fn infer_industry(company: &str) -> Industry {
    let lower = company.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["bank", "capital"]) {
        Industry::Fintech
    } else if has(&["tech", "soft"]) {
        Industry::Technology
    } else if has(&["cloud", "aws"]) {
        Industry::Cloud
    } else if has(&["pay"]) {
        Industry::Payments
    } else {
        Industry::Unknown
    }
}

/// Seniority band from a role title.
///
/// Abbreviations (`cto`, `vp`, `sr`) only match as whole words: "Director"
/// contains "cto" and is not a CTO.
pub fn infer_role_level(role: &str) -> RoleLevel {
    let lower = role.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has_word = |w: &str| words.contains(&w);

    if lower.contains("chief") || has_word("cto") {
        RoleLevel::Cto
    } else if has_word("vp") || lower.contains("vice president") {
        RoleLevel::Vp
    } else if lower.contains("director") {
        RoleLevel::Director
    } else if lower.contains("senior") || lower.contains("principal") || has_word("sr") {
        RoleLevel::SeniorIc
    } else {
        // lead / staff and everything unrecognised
        RoleLevel::Ic
    }
}
