use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::Profile;

pub const SUBJECT_WEIGHT: f64 = 50.0;
pub const SCHEDULE_WEIGHT: f64 = 20.0;
pub const LEARNING_STYLE_WEIGHT: f64 = 20.0;
pub const MAJOR_WEIGHT: f64 = 5.0;
pub const YEAR_WEIGHT: f64 = 5.0;

/// Signals compared by the compatibility heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFactor {
    SubjectOverlap,
    Schedule,
    LearningStyle,
    Major,
    YearOfStudy,
}

/// Contribution of a single factor before rounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub factor: MatchFactor,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub components: Vec<ScoreComponent>,
    pub total: u8,
}

/// Compatibility of `candidate` for `viewer` on a 0..=100 scale.
///
/// Symmetric in its arguments; empty fields contribute nothing.
pub fn score(viewer: &Profile, candidate: &Profile) -> u8 {
    breakdown(viewer, candidate).total
}

pub fn breakdown(viewer: &Profile, candidate: &Profile) -> ScoreBreakdown {
    let components = vec![
        ScoreComponent {
            factor: MatchFactor::SubjectOverlap,
            points: subject_fraction(&viewer.current_subjects, &candidate.current_subjects)
                * SUBJECT_WEIGHT,
        },
        ScoreComponent {
            factor: MatchFactor::Schedule,
            points: award(
                both_set_and_equal(&viewer.preferred_schedule, &candidate.preferred_schedule),
                SCHEDULE_WEIGHT,
            ),
        },
        ScoreComponent {
            factor: MatchFactor::LearningStyle,
            points: award(
                both_set_and_equal(&viewer.learning_style, &candidate.learning_style),
                LEARNING_STYLE_WEIGHT,
            ),
        },
        ScoreComponent {
            factor: MatchFactor::Major,
            points: award(majors_match(&viewer.major, &candidate.major), MAJOR_WEIGHT),
        },
        ScoreComponent {
            factor: MatchFactor::YearOfStudy,
            points: award(
                years_match(&viewer.years_of_study, &candidate.years_of_study),
                YEAR_WEIGHT,
            ),
        },
    ];

    let raw: f64 = components.iter().map(|component| component.points).sum();
    // Round first, then clamp.
    let total = raw.round().clamp(0.0, 100.0) as u8;

    ScoreBreakdown { components, total }
}

fn award(hit: bool, weight: f64) -> f64 {
    if hit {
        weight
    } else {
        0.0
    }
}

fn subject_fraction(left: &[String], right: &[String]) -> f64 {
    let left: BTreeSet<&str> = left.iter().map(String::as_str).collect();
    let right: BTreeSet<&str> = right.iter().map(String::as_str).collect();

    let overlap = left.intersection(&right).count();
    let denominator = left.len().max(right.len()).max(1);
    overlap as f64 / denominator as f64
}

fn both_set_and_equal<T: PartialEq>(left: &Option<T>, right: &Option<T>) -> bool {
    matches!((left, right), (Some(a), Some(b)) if a == b)
}

fn majors_match(left: &str, right: &str) -> bool {
    !left.is_empty()
        && !right.is_empty()
        && left.trim().to_lowercase() == right.trim().to_lowercase()
}

fn years_match(left: &str, right: &str) -> bool {
    !left.is_empty() && !right.is_empty() && left == right
}

/// A candidate annotated with its compatibility for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub profile: Profile,
    pub match_percent: u8,
}

/// Presentation order: highest score first, ties by ascending name (code-point order),
/// then by uid so equal names never depend on draw order.
pub fn presentation_order(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.match_percent
        .cmp(&a.match_percent)
        .then_with(|| a.profile.name.cmp(&b.profile.name))
        .then_with(|| a.profile.uid.cmp(&b.profile.uid))
}

/// Score every candidate against `viewer` and sort for display.
pub fn rank(viewer: &Profile, candidates: Vec<Profile>) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|profile| ScoredCandidate {
            match_percent: score(viewer, &profile),
            profile,
        })
        .collect();
    scored.sort_by(presentation_order);
    scored
}
