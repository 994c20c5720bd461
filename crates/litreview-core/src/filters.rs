//! Canonical structured representation of a literature-search query.
//!
//! A [`FilterSet`] is a plain value: every update produces a new set. Raw
//! objects coming from a view or a saved query are accepted leniently (unknown
//! keys ignored, invalid values dropped) so the model never refuses to load.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result cap applied when no explicit limit is set.
pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown filter field: {0}")]
    UnknownField(String),
    #[error("value does not fit filter field {field}")]
    ValueMismatch { field: FilterField },
}

/// Publication year bounds. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    #[serde(rename = "startYear", skip_serializing_if = "Option::is_none")]
    pub start: Option<i32>,
    #[serde(rename = "endYear", skip_serializing_if = "Option::is_none")]
    pub end: Option<i32>,
}

impl TimeRange {
    pub fn new(start: Option<i32>, end: Option<i32>) -> Self {
        Self { start, end }
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn is_valid(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    /// Drop the whole range if its bounds are inverted.
    pub fn sanitized(self) -> Self {
        if self.is_valid() { self } else { Self::default() }
    }

    /// Set the lower bound; an upper bound below it is dropped.
    pub fn with_start(self, start: i32) -> Self {
        let end = self.end.filter(|end| *end >= start);
        Self { start: Some(start), end }
    }

    /// Set the upper bound; a lower bound above it is dropped.
    pub fn with_end(self, end: i32) -> Self {
        let start = self.start.filter(|start| *start <= end);
        Self { start, end: Some(end) }
    }
}

/// Access constraints on returned papers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessFlags {
    pub peer_reviewed: bool,
    pub preprints: bool,
    pub open_access: bool,
}

impl AccessFlags {
    pub const NAMES: [&'static str; 3] = ["peerReviewed", "preprints", "openAccess"];

    pub fn union(self, other: Self) -> Self {
        Self {
            peer_reviewed: self.peer_reviewed || other.peer_reviewed,
            preprints: self.preprints || other.preprints,
            open_access: self.open_access || other.open_access,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "peerReviewed" => Some(&mut self.peer_reviewed),
            "preprints" => Some(&mut self.preprints),
            "openAccess" => Some(&mut self.open_access),
            _ => None,
        }
    }

    /// Names of the flags currently set, in declaration order.
    pub fn active(&self) -> Vec<&'static str> {
        let values = [self.peer_reviewed, self.preprints, self.open_access];
        Self::NAMES
            .iter()
            .zip(values)
            .filter_map(|(name, on)| on.then_some(*name))
            .collect()
    }
}

/// Open-science evidence constraints on returned papers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceFlags {
    pub prereg: bool,
    pub data: bool,
    pub code: bool,
    pub ethics: bool,
}

impl EvidenceFlags {
    pub const NAMES: [&'static str; 4] = ["prereg", "data", "code", "ethics"];

    pub fn union(self, other: Self) -> Self {
        Self {
            prereg: self.prereg || other.prereg,
            data: self.data || other.data,
            code: self.code || other.code,
            ethics: self.ethics || other.ethics,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn flag_mut(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "prereg" => Some(&mut self.prereg),
            "data" => Some(&mut self.data),
            "code" => Some(&mut self.code),
            "ethics" => Some(&mut self.ethics),
            _ => None,
        }
    }

    pub fn active(&self) -> Vec<&'static str> {
        let values = [self.prereg, self.data, self.code, self.ethics];
        Self::NAMES
            .iter()
            .zip(values)
            .filter_map(|(name, on)| on.then_some(*name))
            .collect()
    }
}

/// The closed set of addressable fields of a [`FilterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    TimeRange,
    StartYear,
    EndYear,
    IncludeKeywords,
    ExcludeKeywords,
    Disciplines,
    StudyTypes,
    Methods,
    Languages,
    Venues,
    Providers,
    Population,
    Geography,
    Access,
    Evidence,
    Limit,
}

impl FilterField {
    pub const ALL: [FilterField; 16] = [
        Self::TimeRange,
        Self::StartYear,
        Self::EndYear,
        Self::IncludeKeywords,
        Self::ExcludeKeywords,
        Self::Disciplines,
        Self::StudyTypes,
        Self::Methods,
        Self::Languages,
        Self::Venues,
        Self::Providers,
        Self::Population,
        Self::Geography,
        Self::Access,
        Self::Evidence,
        Self::Limit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TimeRange => "timeRange",
            Self::StartYear => "startYear",
            Self::EndYear => "endYear",
            Self::IncludeKeywords => "includeKeywords",
            Self::ExcludeKeywords => "excludeKeywords",
            Self::Disciplines => "disciplines",
            Self::StudyTypes => "studyTypes",
            Self::Methods => "methods",
            Self::Languages => "languages",
            Self::Venues => "venues",
            Self::Providers => "providers",
            Self::Population => "population",
            Self::Geography => "geography",
            Self::Access => "access",
            Self::Evidence => "evidence",
            Self::Limit => "limit",
        }
    }

    pub fn is_set_valued(self) -> bool {
        matches!(
            self,
            Self::IncludeKeywords
                | Self::ExcludeKeywords
                | Self::Disciplines
                | Self::StudyTypes
                | Self::Methods
                | Self::Languages
                | Self::Venues
                | Self::Providers
        )
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterField {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FilterError::UnknownField(s.to_string()))
    }
}

/// A replacement value for one field, used by [`FilterSet::with_field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Year(Option<i32>),
    Range(TimeRange),
    Terms(Vec<String>),
    Text(Option<String>),
    Access(AccessFlags),
    Evidence(EvidenceFlags),
    Limit(u32),
}

/// One active constraint, as listed for display and removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub field: FilterField,
    pub value: String,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.value)
    }
}

/// The canonical query state.
///
/// Set-valued fields keep insertion order for display; equality compares them
/// as sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "serde_json::Value")]
pub struct FilterSet {
    #[serde(flatten)]
    pub time_range: TimeRange,
    pub include_keywords: IndexSet<String>,
    pub exclude_keywords: IndexSet<String>,
    pub disciplines: IndexSet<String>,
    pub study_types: IndexSet<String>,
    pub methods: IndexSet<String>,
    pub languages: IndexSet<String>,
    pub venues: IndexSet<String>,
    pub providers: IndexSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geography: Option<String>,
    pub access: AccessFlags,
    pub evidence: EvidenceFlags,
    pub limit: u32,
    #[serde(rename = "nl", skip_serializing_if = "Option::is_none")]
    pub natural_language_text: Option<String>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            include_keywords: IndexSet::new(),
            exclude_keywords: IndexSet::new(),
            disciplines: IndexSet::new(),
            study_types: IndexSet::new(),
            methods: IndexSet::new(),
            languages: IndexSet::new(),
            venues: IndexSet::new(),
            providers: IndexSet::new(),
            population: None,
            geography: None,
            access: AccessFlags::default(),
            evidence: EvidenceFlags::default(),
            limit: DEFAULT_LIMIT,
            natural_language_text: None,
        }
    }
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an arbitrary JSON value. Each field is read on its own, so a
    /// mistyped field is dropped without losing the others. Non-object input
    /// yields an empty set.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => RawFilterSet::from_map(&map).into(),
            _ => {
                tracing::debug!("ignoring non-object filter set");
                Self::default()
            }
        }
    }

    /// True when no constraint is active (the utterance text is not a constraint).
    pub fn is_empty(&self) -> bool {
        self.constraints().is_empty()
    }

    pub fn terms(&self, field: FilterField) -> Option<&IndexSet<String>> {
        match field {
            FilterField::IncludeKeywords => Some(&self.include_keywords),
            FilterField::ExcludeKeywords => Some(&self.exclude_keywords),
            FilterField::Disciplines => Some(&self.disciplines),
            FilterField::StudyTypes => Some(&self.study_types),
            FilterField::Methods => Some(&self.methods),
            FilterField::Languages => Some(&self.languages),
            FilterField::Venues => Some(&self.venues),
            FilterField::Providers => Some(&self.providers),
            _ => None,
        }
    }

    pub(crate) fn terms_mut(&mut self, field: FilterField) -> Option<&mut IndexSet<String>> {
        match field {
            FilterField::IncludeKeywords => Some(&mut self.include_keywords),
            FilterField::ExcludeKeywords => Some(&mut self.exclude_keywords),
            FilterField::Disciplines => Some(&mut self.disciplines),
            FilterField::StudyTypes => Some(&mut self.study_types),
            FilterField::Methods => Some(&mut self.methods),
            FilterField::Languages => Some(&mut self.languages),
            FilterField::Venues => Some(&mut self.venues),
            FilterField::Providers => Some(&mut self.providers),
            _ => None,
        }
    }

    /// Return a copy with one field replaced.
    ///
    /// Writing a year bound that inverts the range drops the opposing bound.
    /// Writing a keyword set removes its members from the opposing keyword set.
    pub fn with_field(&self, field: FilterField, value: FieldValue) -> Result<Self, FilterError> {
        let mut next = self.clone();
        match (field, value) {
            (FilterField::TimeRange, FieldValue::Range(range)) => {
                next.time_range = range.sanitized();
            }
            (FilterField::StartYear, FieldValue::Year(year)) => {
                next.time_range = match year {
                    Some(year) => next.time_range.with_start(year),
                    None => TimeRange::new(None, next.time_range.end),
                };
            }
            (FilterField::EndYear, FieldValue::Year(year)) => {
                next.time_range = match year {
                    Some(year) => next.time_range.with_end(year),
                    None => TimeRange::new(next.time_range.start, None),
                };
            }
            (FilterField::Population, FieldValue::Text(text)) => {
                next.population = clean_text(text);
            }
            (FilterField::Geography, FieldValue::Text(text)) => {
                next.geography = clean_text(text);
            }
            (FilterField::Access, FieldValue::Access(flags)) => next.access = flags,
            (FilterField::Evidence, FieldValue::Evidence(flags)) => next.evidence = flags,
            (FilterField::Limit, FieldValue::Limit(limit)) => {
                next.limit = if limit > 0 { limit } else { DEFAULT_LIMIT };
            }
            (field, FieldValue::Terms(items)) if field.is_set_valued() => {
                let items = clean_terms(items);
                match field {
                    FilterField::IncludeKeywords => {
                        next.exclude_keywords.retain(|k| !items.contains(k));
                    }
                    FilterField::ExcludeKeywords => {
                        next.include_keywords.retain(|k| !items.contains(k));
                    }
                    _ => {}
                }
                if let Some(slot) = next.terms_mut(field) {
                    *slot = items;
                }
            }
            (field, _) => return Err(FilterError::ValueMismatch { field }),
        }
        Ok(next)
    }

    /// Return a copy with one constraint removed.
    ///
    /// For set-valued fields `value` names the member to drop (no value clears
    /// the set); for flag groups it names the flag (no value clears the group).
    /// Scalars are cleared. Removing something absent is a no-op.
    pub fn without(&self, field: FilterField, value: Option<&str>) -> Self {
        let mut next = self.clone();
        match field {
            FilterField::TimeRange => next.time_range = TimeRange::default(),
            FilterField::StartYear => next.time_range.start = None,
            FilterField::EndYear => next.time_range.end = None,
            FilterField::Population => next.population = None,
            FilterField::Geography => next.geography = None,
            FilterField::Limit => next.limit = DEFAULT_LIMIT,
            FilterField::Access => match value {
                Some(name) => {
                    if let Some(flag) = next.access.flag_mut(name) {
                        *flag = false;
                    }
                }
                None => next.access = AccessFlags::default(),
            },
            FilterField::Evidence => match value {
                Some(name) => {
                    if let Some(flag) = next.evidence.flag_mut(name) {
                        *flag = false;
                    }
                }
                None => next.evidence = EvidenceFlags::default(),
            },
            set_field => {
                if let Some(terms) = next.terms_mut(set_field) {
                    match value {
                        Some(member) => {
                            terms.shift_remove(member);
                        }
                        None => terms.clear(),
                    }
                }
            }
        }
        next
    }

    /// Active constraints in display order: one per set member, per set flag,
    /// per present scalar.
    pub fn constraints(&self) -> Vec<Constraint> {
        let mut out = Vec::new();
        let mut push = |field: FilterField, value: String| out.push(Constraint { field, value });

        if let Some(start) = self.time_range.start {
            push(FilterField::StartYear, start.to_string());
        }
        if let Some(end) = self.time_range.end {
            push(FilterField::EndYear, end.to_string());
        }
        for field in FilterField::ALL.into_iter().filter(|f| f.is_set_valued()) {
            for term in self.terms(field).into_iter().flatten() {
                push(field, term.clone());
            }
        }
        if let Some(population) = &self.population {
            push(FilterField::Population, population.clone());
        }
        if let Some(geography) = &self.geography {
            push(FilterField::Geography, geography.clone());
        }
        for name in self.access.active() {
            push(FilterField::Access, name.to_string());
        }
        for name in self.evidence.active() {
            push(FilterField::Evidence, name.to_string());
        }
        if self.limit != DEFAULT_LIMIT {
            push(FilterField::Limit, self.limit.to_string());
        }
        out
    }
}

impl From<serde_json::Value> for FilterSet {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

/// Lenient wire form: every key optional, unknown keys ignored.
#[derive(Debug, Default)]
struct RawFilterSet {
    start_year: Option<i64>,
    end_year: Option<i64>,
    include_keywords: Option<Vec<String>>,
    exclude_keywords: Option<Vec<String>>,
    disciplines: Option<Vec<String>>,
    study_types: Option<Vec<String>>,
    methods: Option<Vec<String>>,
    languages: Option<Vec<String>>,
    venues: Option<Vec<String>>,
    providers: Option<Vec<String>>,
    population: Option<String>,
    geography: Option<String>,
    access: AccessFlags,
    evidence: EvidenceFlags,
    limit: Option<i64>,
    nl: Option<String>,
}

impl RawFilterSet {
    fn from_map(map: &JsonMap) -> Self {
        Self {
            start_year: field(map, "startYear"),
            end_year: field(map, "endYear"),
            include_keywords: field(map, "includeKeywords"),
            exclude_keywords: field(map, "excludeKeywords"),
            disciplines: field(map, "disciplines"),
            study_types: field(map, "studyTypes"),
            methods: field(map, "methods"),
            languages: field(map, "languages"),
            venues: field(map, "venues"),
            providers: field(map, "providers"),
            population: field(map, "population"),
            geography: field(map, "geography"),
            access: flags(map, "access", AccessFlags::flag_mut),
            evidence: flags(map, "evidence", EvidenceFlags::flag_mut),
            limit: field(map, "limit"),
            nl: field(map, "nl"),
        }
    }
}

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Read one key, dropping it if it does not have the expected shape.
fn field<T: serde::de::DeserializeOwned>(map: &JsonMap, key: &str) -> Option<T> {
    let value = map.get(key).filter(|v| !v.is_null())?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            tracing::debug!(field = key, %error, "dropping invalid filter field");
            None
        }
    }
}

/// Read a flag object one flag at a time; non-boolean or unknown flags are dropped.
fn flags<F: Default>(
    map: &JsonMap,
    key: &str,
    flag_mut: for<'a> fn(&'a mut F, &str) -> Option<&'a mut bool>,
) -> F {
    let mut out = F::default();
    let Some(value) = map.get(key).filter(|v| !v.is_null()) else {
        return out;
    };
    let Some(object) = value.as_object() else {
        tracing::debug!(field = key, "dropping non-object flag field");
        return out;
    };
    for (name, value) in object {
        match (flag_mut(&mut out, name), value.as_bool()) {
            (Some(flag), Some(on)) => *flag = on,
            _ => tracing::debug!(field = key, flag = %name, "dropping invalid flag"),
        }
    }
    out
}

impl From<RawFilterSet> for FilterSet {
    fn from(raw: RawFilterSet) -> Self {
        let year = |y: Option<i64>| y.and_then(|y| i32::try_from(y).ok());
        let time_range = TimeRange::new(year(raw.start_year), year(raw.end_year));
        if !time_range.is_valid() {
            tracing::debug!(?time_range, "dropping inverted time range");
        }

        let include_keywords = clean_terms(raw.include_keywords.unwrap_or_default());
        let mut exclude_keywords = clean_terms(raw.exclude_keywords.unwrap_or_default());
        exclude_keywords.retain(|k| !include_keywords.contains(k));

        let limit = raw
            .limit
            .and_then(|l| u32::try_from(l).ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT);

        Self {
            time_range: time_range.sanitized(),
            include_keywords,
            exclude_keywords,
            disciplines: clean_terms(raw.disciplines.unwrap_or_default()),
            study_types: clean_terms(raw.study_types.unwrap_or_default()),
            methods: clean_terms(raw.methods.unwrap_or_default()),
            languages: clean_terms(raw.languages.unwrap_or_default()),
            venues: clean_terms(raw.venues.unwrap_or_default()),
            providers: clean_terms(raw.providers.unwrap_or_default()),
            population: clean_text(raw.population),
            geography: clean_text(raw.geography),
            access: raw.access,
            evidence: raw.evidence,
            limit,
            natural_language_text: clean_text(raw.nl),
        }
    }
}

/// Trim members and drop empties, collapsing duplicates in first-seen order.
pub(crate) fn clean_terms<I>(items: I) -> IndexSet<String>
where
    I: IntoIterator<Item = String>,
{
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

pub(crate) fn clean_text(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn venues(set: &FilterSet) -> Vec<&str> {
        set.venues.iter().map(String::as_str).collect()
    }

    #[test]
    fn default_limit_is_twenty() {
        assert_eq!(FilterSet::new().limit, 20);
        assert!(FilterSet::new().is_empty());
    }

    #[test]
    fn raw_object_ignores_unknown_keys() {
        let set = FilterSet::from_json(json!({
            "venues": ["Nature"],
            "sortOrder": "desc",
            "somethingElse": {"nested": true}
        }));
        assert_eq!(venues(&set), ["Nature"]);
    }

    #[test]
    fn raw_object_drops_non_positive_limit() {
        assert_eq!(FilterSet::from_json(json!({"limit": 0})).limit, DEFAULT_LIMIT);
        assert_eq!(FilterSet::from_json(json!({"limit": -5})).limit, DEFAULT_LIMIT);
        assert_eq!(FilterSet::from_json(json!({"limit": 50})).limit, 50);
    }

    #[test]
    fn raw_object_drops_inverted_time_range() {
        let set = FilterSet::from_json(json!({"startYear": 2022, "endYear": 2018}));
        assert!(set.time_range.is_open());

        let set = FilterSet::from_json(json!({"startYear": 2018, "endYear": 2022}));
        assert_eq!(set.time_range, TimeRange::new(Some(2018), Some(2022)));
    }

    #[test]
    fn raw_object_resolves_keyword_overlap_to_include() {
        let set = FilterSet::from_json(json!({
            "includeKeywords": ["mice", "fasting"],
            "excludeKeywords": ["mice", "rats"]
        }));
        assert!(set.include_keywords.contains("mice"));
        assert!(!set.exclude_keywords.contains("mice"));
        assert!(set.exclude_keywords.contains("rats"));
    }

    #[test]
    fn raw_object_trims_and_collapses_terms() {
        let set = FilterSet::from_json(json!({"venues": [" Nature ", "Nature", "", "Science"]}));
        assert_eq!(venues(&set), ["Nature", "Science"]);
    }

    #[test]
    fn mistyped_field_is_dropped_alone() {
        let set = FilterSet::from_json(json!({
            "venues": ["Nature"],
            "startYear": 2020,
            "limit": "50",
            "endYear": 2023.5,
            "methods": "RCT",
            "access": {"openAccess": "yes", "peerReviewed": true},
            "evidence": [true]
        }));
        assert_eq!(venues(&set), ["Nature"]);
        assert_eq!(set.time_range, TimeRange::new(Some(2020), None));
        assert_eq!(set.limit, DEFAULT_LIMIT);
        assert!(set.methods.is_empty());
        assert!(set.access.peer_reviewed);
        assert!(!set.access.open_access);
        assert!(set.evidence.is_empty());
    }

    #[test]
    fn deserialize_is_as_lenient_as_from_json() {
        let set: FilterSet =
            serde_json::from_str(r#"{"venues": ["BMJ"], "limit": "many", "population": null}"#)
                .unwrap();
        assert_eq!(venues(&set), ["BMJ"]);
        assert_eq!(set.limit, DEFAULT_LIMIT);
        assert!(set.population.is_none());
    }

    #[test]
    fn non_object_input_is_empty() {
        assert_eq!(FilterSet::from_json(json!("nonsense")), FilterSet::new());
    }

    #[test]
    fn json_roundtrip_keeps_camel_case_keys() {
        let set = FilterSet::new()
            .with_field(FilterField::StartYear, FieldValue::Year(Some(2020)))
            .unwrap()
            .with_field(FilterField::Venues, FieldValue::Terms(vec!["JAMA".into()]))
            .unwrap();
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["startYear"], 2020);
        assert_eq!(value["venues"], json!(["JAMA"]));
        assert!(value.get("endYear").is_none());

        let parsed: FilterSet = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, set);
    }

    #[test]
    fn with_field_leaves_source_untouched() {
        let base = FilterSet::new();
        let next = base
            .with_field(FilterField::Population, FieldValue::Text(Some("adults".into())))
            .unwrap();
        assert_eq!(base.population, None);
        assert_eq!(next.population.as_deref(), Some("adults"));
    }

    #[test]
    fn with_field_rejects_mismatched_value() {
        let err = FilterSet::new()
            .with_field(FilterField::Venues, FieldValue::Limit(5))
            .unwrap_err();
        assert_eq!(err, FilterError::ValueMismatch { field: FilterField::Venues });
    }

    #[test]
    fn with_field_start_year_drops_earlier_end() {
        let set = FilterSet::new()
            .with_field(FilterField::EndYear, FieldValue::Year(Some(2015)))
            .unwrap()
            .with_field(FilterField::StartYear, FieldValue::Year(Some(2020)))
            .unwrap();
        assert_eq!(set.time_range, TimeRange::new(Some(2020), None));
    }

    #[test]
    fn with_field_exclude_pulls_member_from_include() {
        let set = FilterSet::new()
            .with_field(FilterField::IncludeKeywords, FieldValue::Terms(vec!["rats".into()]))
            .unwrap()
            .with_field(FilterField::ExcludeKeywords, FieldValue::Terms(vec!["rats".into()]))
            .unwrap();
        assert!(set.include_keywords.is_empty());
        assert!(set.exclude_keywords.contains("rats"));
    }

    #[test]
    fn without_removes_single_member() {
        let set = FilterSet::new()
            .with_field(
                FilterField::Venues,
                FieldValue::Terms(vec!["Nature".into(), "Science".into()]),
            )
            .unwrap();
        let next = set.without(FilterField::Venues, Some("Nature"));
        assert_eq!(venues(&next), ["Science"]);
    }

    #[test]
    fn without_absent_member_is_noop() {
        let set = FilterSet::new();
        assert_eq!(set.without(FilterField::Venues, Some("Nature")), set);
        assert_eq!(set.without(FilterField::Access, Some("bogus")), set);
    }

    #[test]
    fn without_clears_single_flag() {
        let set = FilterSet::new()
            .with_field(
                FilterField::Access,
                FieldValue::Access(AccessFlags { open_access: true, peer_reviewed: true, ..Default::default() }),
            )
            .unwrap();
        let next = set.without(FilterField::Access, Some("openAccess"));
        assert!(!next.access.open_access);
        assert!(next.access.peer_reviewed);
    }

    #[test]
    fn constraints_follow_insertion_order() {
        let set = FilterSet::new()
            .with_field(
                FilterField::Venues,
                FieldValue::Terms(vec!["Science".into(), "Nature".into()]),
            )
            .unwrap()
            .with_field(FilterField::Limit, FieldValue::Limit(50))
            .unwrap();
        let labels: Vec<String> = set.constraints().iter().map(ToString::to_string).collect();
        assert_eq!(labels, ["venues: Science", "venues: Nature", "limit: 50"]);
    }

    #[test]
    fn field_names_parse_case_insensitively() {
        assert_eq!("venues".parse::<FilterField>().unwrap(), FilterField::Venues);
        assert_eq!("StudyTypes".parse::<FilterField>().unwrap(), FilterField::StudyTypes);
        assert!("colour".parse::<FilterField>().is_err());
    }
}
