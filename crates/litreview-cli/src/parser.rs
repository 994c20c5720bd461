//! `key:value` directive syntax for typed queries.
//!
//! `sleep memory since:2018 venue:Nature,Science +oa geo:"sub-saharan africa"`
//! yields a fragment with a start year, two venues, and the open-access flag.
//! Words that are not directives are the search terms: `sleep memory` here.

use litreview_core::{ParsedFragment, QueryParser};

/// Parser for the directive syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectiveParser;

impl QueryParser for DirectiveParser {
    fn parse(&self, text: &str) -> ParsedFragment {
        parse_directives(text)
    }

    fn search_terms(&self, text: &str) -> String {
        split_directives(text).1.join(" ")
    }
}

pub fn parse_directives(text: &str) -> ParsedFragment {
    split_directives(text).0
}

/// Separate recognised directives from the remaining words.
fn split_directives(text: &str) -> (ParsedFragment, Vec<String>) {
    let mut fragment = ParsedFragment::default();
    let mut words = Vec::new();
    for token in tokenize(text) {
        let consumed = match token.strip_prefix('+') {
            Some(flag) => set_flag(&mut fragment, flag),
            None => match token.split_once(':') {
                Some((key, value)) => apply_directive(&mut fragment, key, value),
                None => false,
            },
        };
        if !consumed {
            words.push(token);
        }
    }
    (fragment, words)
}

/// Directive keys in help order.
pub const DIRECTIVES: &[(&str, &str)] = &[
    ("since:YEAR", "earliest publication year"),
    ("until:YEAR", "latest publication year"),
    ("include:A,B", "required keywords"),
    ("exclude:A,B", "excluded keywords"),
    ("venue:A,B", "journals or conferences"),
    ("discipline:A,B", "fields of study"),
    ("type:A,B", "study types"),
    ("method:A,B", "methods"),
    ("lang:A,B", "languages"),
    ("provider:A,B", "data providers"),
    ("population:TEXT", "study population"),
    ("geo:TEXT", "geography"),
    ("limit:N", "maximum number of results"),
    ("+FLAG", "peer-reviewed, preprints, oa, prereg, data, code, ethics"),
];

/// Returns false for an unknown key. A known key with a bad value is consumed.
fn apply_directive(fragment: &mut ParsedFragment, key: &str, value: &str) -> bool {
    let value = value.trim();
    let key = key.to_ascii_lowercase();
    if !DIRECTIVE_KEYS.contains(&key.as_str()) {
        return false;
    }
    if value.is_empty() {
        return true;
    }
    match key.as_str() {
        "since" | "from" => fragment.start_year = value.parse::<i32>().ok().or(fragment.start_year),
        "until" | "to" => fragment.end_year = value.parse::<i32>().ok().or(fragment.end_year),
        "include" => fragment.include_keywords.extend(list(value)),
        "exclude" => fragment.exclude_keywords.extend(list(value)),
        "venue" => fragment.venues.extend(list(value)),
        "discipline" => fragment.disciplines.extend(list(value)),
        "type" => fragment.study_types.extend(list(value)),
        "method" => fragment.methods.extend(list(value)),
        "lang" => fragment.languages.extend(list(value)),
        "provider" => fragment.providers.extend(list(value)),
        "population" => fragment.population = Some(value.to_string()),
        "geo" => fragment.geography = Some(value.to_string()),
        "limit" => fragment.limit = value.parse::<u32>().ok().filter(|n| *n > 0).or(fragment.limit),
        _ => {}
    }
    true
}

const DIRECTIVE_KEYS: &[&str] = &[
    "since", "from", "until", "to", "include", "exclude", "venue", "discipline", "type",
    "method", "lang", "provider", "population", "geo", "limit",
];

fn set_flag(fragment: &mut ParsedFragment, name: &str) -> bool {
    let flag = match name.to_ascii_lowercase().as_str() {
        "peer-reviewed" => &mut fragment.access.peer_reviewed,
        "preprints" => &mut fragment.access.preprints,
        "oa" => &mut fragment.access.open_access,
        "prereg" => &mut fragment.evidence.prereg,
        "data" => &mut fragment.evidence.data,
        "code" => &mut fragment.evidence.code,
        "ethics" => &mut fragment.evidence.ethics,
        _ => return false,
    };
    *flag = true;
    true
}

fn list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Split on whitespace; double quotes group words and are removed.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in text.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
