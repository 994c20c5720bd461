//! Folding a parsed utterance into an existing filter set.
//!
//! Refinement is additive: scalars present in the fragment replace the base,
//! sets are unioned, flags are OR-ed. Nothing the fragment does not mention is
//! dropped, except a year bound that a later-applied bound would invert.

use tracing::debug;

use crate::filters::{FilterField, FilterSet, TimeRange, clean_terms, clean_text};
use crate::fragment::ParsedFragment;

/// Merge `fragment` into `base`, producing a new filter set.
///
/// A keyword the fragment places in include (or exclude) is first removed from
/// the opposing set. If the fragment names the same keyword on both sides,
/// include wins.
pub fn merge(base: &FilterSet, fragment: &ParsedFragment) -> FilterSet {
    let mut out = base.clone();

    out.time_range = merge_range(base.time_range, fragment);

    if let Some(population) = clean_text(fragment.population.clone()) {
        out.population = Some(population);
    }
    if let Some(geography) = clean_text(fragment.geography.clone()) {
        out.geography = Some(geography);
    }
    if let Some(limit) = fragment.limit.filter(|l| *l > 0) {
        out.limit = limit;
    }

    for keyword in clean_terms(fragment.exclude_keywords.iter().cloned()) {
        out.include_keywords.shift_remove(&keyword);
        out.exclude_keywords.insert(keyword);
    }
    for keyword in clean_terms(fragment.include_keywords.iter().cloned()) {
        out.exclude_keywords.shift_remove(&keyword);
        out.include_keywords.insert(keyword);
    }

    let unions = [
        (FilterField::Disciplines, &fragment.disciplines),
        (FilterField::StudyTypes, &fragment.study_types),
        (FilterField::Methods, &fragment.methods),
        (FilterField::Languages, &fragment.languages),
        (FilterField::Venues, &fragment.venues),
        (FilterField::Providers, &fragment.providers),
    ];
    for (field, items) in unions {
        if let Some(terms) = out.terms_mut(field) {
            terms.extend(clean_terms(items.iter().cloned()));
        }
    }

    out.access = base.access.union(fragment.access);
    out.evidence = base.evidence.union(fragment.evidence);

    if let Some(text) = clean_text(fragment.natural_language_text.clone()) {
        out.natural_language_text = Some(text);
    }

    out
}

/// Apply the fragment's start, then its end; each drops an opposite bound it
/// would invert, so an inverted fragment range keeps only its end.
fn merge_range(base: TimeRange, fragment: &ParsedFragment) -> TimeRange {
    let mut range = base;
    if let Some(start) = fragment.start_year {
        range = range.with_start(start);
    }
    if let Some(end) = fragment.end_year {
        let next = range.with_end(end);
        if next.start != range.start {
            debug!(?range, end, "end year drops start year");
        }
        range = next;
    }
    range
}
