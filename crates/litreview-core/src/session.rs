//! Conversational refinement over a single owned filter set.

use thiserror::Error;
use tracing::debug;

use crate::filters::{FilterField, FilterSet};
use crate::fragment::ParsedFragment;
use crate::merge::merge;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("search input is empty")]
    EmptyInput,
}

/// Interprets one utterance into a [`ParsedFragment`].
///
/// Implementations are expected to be pure.
pub trait QueryParser {
    fn parse(&self, text: &str) -> ParsedFragment;

    /// The words of `text` to send as the search query once `parse` has taken
    /// what it understood. Defaults to the whole text.
    fn search_terms(&self, text: &str) -> String {
        text.to_string()
    }
}

impl<F> QueryParser for F
where
    F: Fn(&str) -> ParsedFragment,
{
    fn parse(&self, text: &str) -> ParsedFragment {
        self(text)
    }
}

/// How the consuming view should treat the search a mutation triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Fresh search: the view shows a full loading state.
    Blocking,
    /// Refinement: previous results stay on screen while the update runs.
    Background,
}

/// A search to submit after a successful session mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIntent {
    pub filters: FilterSet,
    pub mode: SubmitMode,
    /// Search terms of the latest utterance that had any.
    pub query: Option<String>,
}

/// Query state shared between the session and the views that render it.
///
/// Views read it through [`RefinementSession::context`]; all writes go through
/// session operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContext {
    filters: FilterSet,
    advanced_open: bool,
}

impl QueryContext {
    pub fn new(filters: FilterSet) -> Self {
        Self {
            filters,
            advanced_open: false,
        }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn advanced_open(&self) -> bool {
        self.advanced_open
    }
}

/// Owns the active [`FilterSet`] and the ordered log of utterances applied to it.
pub struct RefinementSession<P> {
    parser: P,
    context: QueryContext,
    history: Vec<String>,
    query: Option<String>,
}

impl<P: QueryParser> RefinementSession<P> {
    pub fn new(parser: P) -> Self {
        Self::with_context(parser, QueryContext::default())
    }

    pub fn with_context(parser: P, context: QueryContext) -> Self {
        Self {
            parser,
            context,
            history: Vec::new(),
            query: None,
        }
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    pub fn filters(&self) -> &FilterSet {
        &self.context.filters
    }

    /// Utterances applied since the last fresh search or clear, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn toggle_advanced(&mut self) -> bool {
        self.context.advanced_open = !self.context.advanced_open;
        self.context.advanced_open
    }

    /// Start a fresh search from `utterance`, merged over the structured
    /// filters already set.
    pub fn search(&mut self, utterance: &str) -> Result<SearchIntent, SessionError> {
        let text = non_empty(utterance)?;
        self.history.clear();
        self.query = None;
        Ok(self.absorb(text, SubmitMode::Blocking))
    }

    /// Narrow or adjust the current query with another utterance.
    pub fn refine(&mut self, utterance: &str) -> Result<SearchIntent, SessionError> {
        let text = non_empty(utterance)?;
        Ok(self.absorb(text, SubmitMode::Background))
    }

    /// Merge structured input (e.g. from an advanced-filter panel).
    pub fn apply(&mut self, fragment: &ParsedFragment) -> SearchIntent {
        self.replace(merge(&self.context.filters, fragment), SubmitMode::Background)
    }

    /// Drop one constraint. Removing something that is not set is a no-op,
    /// but still yields a search so the view stays in sync.
    pub fn remove_constraint(&mut self, field: FilterField, value: Option<&str>) -> SearchIntent {
        debug!(%field, ?value, "removing constraint");
        let next = self.context.filters.without(field, value);
        self.replace(next, SubmitMode::Background)
    }

    /// Reset to an empty filter set, discarding the utterance text and log.
    pub fn clear_all(&mut self) -> SearchIntent {
        self.history.clear();
        self.query = None;
        self.replace(FilterSet::new(), SubmitMode::Background)
    }

    fn absorb(&mut self, text: &str, mode: SubmitMode) -> SearchIntent {
        let mut fragment = self.parser.parse(text);
        fragment.natural_language_text = Some(text.to_string());
        self.history.push(text.to_string());
        let terms = self.parser.search_terms(text);
        if !terms.trim().is_empty() {
            self.query = Some(terms.trim().to_string());
        }
        let merged = merge(&self.context.filters, &fragment);
        debug!(utterance = text, constraints = merged.constraints().len(), "merged utterance");
        self.replace(merged, mode)
    }

    fn replace(&mut self, filters: FilterSet, mode: SubmitMode) -> SearchIntent {
        self.context.filters = filters;
        SearchIntent {
            filters: self.context.filters.clone(),
            mode,
            query: self.query.clone(),
        }
    }
}

fn non_empty(utterance: &str) -> Result<&str, SessionError> {
    let text = utterance.trim();
    if text.is_empty() {
        return Err(SessionError::EmptyInput);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn venue_parser(text: &str) -> ParsedFragment {
        let mut fragment = ParsedFragment::default();
        if let Some(rest) = text.strip_prefix("venue ") {
            fragment.venues = rest.split(',').map(|v| v.trim().to_string()).collect();
        }
        if let Some(rest) = text.strip_prefix("since ") {
            fragment.start_year = rest.trim().parse().ok();
        }
        fragment
    }

    #[test]
    fn empty_refinement_is_rejected_without_parsing() {
        let calls = Cell::new(0);
        let parser = |text: &str| {
            calls.set(calls.get() + 1);
            venue_parser(text)
        };
        let mut session = RefinementSession::new(parser);
        session.refine("venue Nature").unwrap();
        let before = session.filters().clone();

        assert_eq!(session.refine("   ").unwrap_err(), SessionError::EmptyInput);
        assert_eq!(session.search("").unwrap_err(), SessionError::EmptyInput);
        assert_eq!(session.filters(), &before);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn refine_is_background_and_search_is_blocking() {
        let mut session = RefinementSession::new(venue_parser);
        assert_eq!(session.search("fasting").unwrap().mode, SubmitMode::Blocking);
        assert_eq!(session.refine("since 2020").unwrap().mode, SubmitMode::Background);
    }

    #[test]
    fn refinements_accumulate() {
        let mut session = RefinementSession::new(venue_parser);
        session.search("venue Nature").unwrap();
        let intent = session.refine("since 2020").unwrap();
        assert!(intent.filters.venues.contains("Nature"));
        assert_eq!(intent.filters.time_range.start, Some(2020));
        assert_eq!(intent.filters.natural_language_text.as_deref(), Some("since 2020"));
        assert_eq!(session.history(), ["venue Nature", "since 2020"]);
    }

    #[test]
    fn remove_venue_member() {
        let mut session = RefinementSession::new(venue_parser);
        session.refine("venue Nature, Science").unwrap();
        let intent = session.remove_constraint(FilterField::Venues, Some("Nature"));
        let venues: Vec<&str> = intent.filters.venues.iter().map(String::as_str).collect();
        assert_eq!(venues, ["Science"]);
    }

    #[test]
    fn remove_from_empty_venues_is_noop() {
        let mut session = RefinementSession::new(venue_parser);
        let intent = session.remove_constraint(FilterField::Venues, Some("Nature"));
        assert_eq!(intent.filters, FilterSet::new());
    }

    #[test]
    fn remove_scalar_clears_it() {
        let mut session = RefinementSession::new(venue_parser);
        session.refine("since 2019").unwrap();
        let intent = session.remove_constraint(FilterField::StartYear, None);
        assert!(intent.filters.time_range.is_open());
    }

    #[test]
    fn clear_all_discards_text_and_log() {
        let mut session = RefinementSession::new(venue_parser);
        session.refine("venue Nature").unwrap();
        let intent = session.clear_all();
        assert_eq!(intent.filters, FilterSet::new());
        assert!(intent.filters.natural_language_text.is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn fresh_search_restarts_log() {
        let mut session = RefinementSession::new(venue_parser);
        session.refine("venue Nature").unwrap();
        session.search("since 2001").unwrap();
        assert_eq!(session.history(), ["since 2001"]);
        assert!(session.filters().venues.contains("Nature"));
    }

    #[test]
    fn query_follows_latest_utterance_with_search_terms() {
        struct KeepsFirstWord;
        impl QueryParser for KeepsFirstWord {
            fn parse(&self, _text: &str) -> ParsedFragment {
                ParsedFragment::default()
            }
            fn search_terms(&self, text: &str) -> String {
                text.split_whitespace().next().filter(|w| !w.starts_with('-')).unwrap_or("").to_string()
            }
        }

        let mut session = RefinementSession::new(KeepsFirstWord);
        assert_eq!(session.search("sleep apnea").unwrap().query.as_deref(), Some("sleep"));
        assert_eq!(session.refine("-x").unwrap().query.as_deref(), Some("sleep"));
        assert_eq!(session.refine("memory too").unwrap().query.as_deref(), Some("memory"));
        assert_eq!(session.search("-x").unwrap().query, None);
        session.refine("fasting").unwrap();
        assert_eq!(session.clear_all().query, None);
    }

    #[test]
    fn default_search_terms_are_the_utterance() {
        let mut session = RefinementSession::new(venue_parser);
        let intent = session.search("  venue Nature ").unwrap();
        assert_eq!(intent.query.as_deref(), Some("venue Nature"));
    }

    #[test]
    fn context_is_read_only_outside_the_session() {
        let start = FilterSet::from_json(serde_json::json!({"venues": ["BMJ"]}));
        let mut session = RefinementSession::with_context(venue_parser, QueryContext::new(start));
        assert!(!session.context().advanced_open());
        assert!(session.toggle_advanced());
        assert!(session.context().advanced_open());
        assert!(session.context().filters().venues.contains("BMJ"));
    }
}
