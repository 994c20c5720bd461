//! Partial filter data produced by interpreting one utterance.

use serde::{Deserialize, Serialize};

use crate::filters::{AccessFlags, EvidenceFlags};

/// What a single utterance asserted. Absent fields leave the base untouched
/// when merged; flags that are `false` count as "not mentioned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedFragment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    pub disciplines: Vec<String>,
    pub study_types: Vec<String>,
    pub methods: Vec<String>,
    pub languages: Vec<String>,
    pub venues: Vec<String>,
    pub providers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geography: Option<String>,
    pub access: AccessFlags,
    pub evidence: EvidenceFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "nl", skip_serializing_if = "Option::is_none")]
    pub natural_language_text: Option<String>,
}

impl ParsedFragment {
    /// A fragment that asserts nothing beyond the utterance itself.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            natural_language_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// True when the fragment asserts no constraint.
    pub fn is_empty(&self) -> bool {
        let text = self.natural_language_text.clone();
        *self == Self { natural_language_text: text, ..Self::default() }
    }

    /// Field-wise union, equivalent to merging `self` and then `other`.
    ///
    /// Set fields concatenate (`self` first), flags OR, and `other`'s scalars
    /// win where present. `other`'s keyword placement wins over `self`'s, and a
    /// start year in `other` drops an end year of `self` that it would invert.
    pub fn union(&self, other: &Self) -> Self {
        let cat = |a: &[String], b: &[String]| -> Vec<String> {
            a.iter().chain(b).cloned().collect()
        };
        let without = |a: &[String], removed: &[String]| -> Vec<String> {
            a.iter()
                .filter(|k| !removed.iter().any(|r| r.trim() == k.trim()))
                .cloned()
                .collect()
        };
        let end_year = match (other.start_year, other.end_year) {
            (_, Some(end)) => Some(end),
            (Some(start), None) => self.end_year.filter(|end| *end >= start),
            (None, None) => self.end_year,
        };
        Self {
            start_year: other.start_year.or(self.start_year),
            end_year,
            include_keywords: cat(
                &without(&self.include_keywords, &other.exclude_keywords),
                &other.include_keywords,
            ),
            exclude_keywords: cat(
                &without(&self.exclude_keywords, &other.include_keywords),
                &other.exclude_keywords,
            ),
            disciplines: cat(&self.disciplines, &other.disciplines),
            study_types: cat(&self.study_types, &other.study_types),
            methods: cat(&self.methods, &other.methods),
            languages: cat(&self.languages, &other.languages),
            venues: cat(&self.venues, &other.venues),
            providers: cat(&self.providers, &other.providers),
            population: other.population.clone().or_else(|| self.population.clone()),
            geography: other.geography.clone().or_else(|| self.geography.clone()),
            access: self.access.union(other.access),
            evidence: self.evidence.union(other.evidence),
            limit: other.limit.or(self.limit),
            natural_language_text: other
                .natural_language_text
                .clone()
                .or_else(|| self.natural_language_text.clone()),
        }
    }
}
