//! Line commands of the interactive session.

use litreview_core::{ExportFormat, FilterField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Plain text: the first one starts a search, later ones refine it.
    Utterance(String),
    /// `:new TEXT` starts over from this utterance.
    Fresh(String),
    /// `:set DIRECTIVES` applies structured filters without new text.
    Set(String),
    Remove {
        field: FilterField,
        value: Option<String>,
    },
    Clear,
    Filters,
    Advanced,
    Abstracts,
    Export(ExportFormat),
    Related(String),
    Ask(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
TEXT                      search, then refine with each further line
:new TEXT                 start a fresh search
:set DIRECTIVES           apply structured filters (see directives below)
:remove FIELD [VALUE]     drop a constraint, e.g. `:remove venues Nature`
:clear                    drop every constraint
:filters                  show the current query
:advanced                 toggle showing the query after every search
:abstracts                show abstracts of the current results
:export FORMAT            markdown, bibtex, ris, json, csv or pdf
:related PAPER_ID         papers related to one result
:ask QUESTION             ask about the current results
:help                     this text
:quit                     leave";

/// Parse one line. Blank lines yield `None`.
pub fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Some(Input::Utterance(line.to_string())));
    };
    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let needs_arg = |what: &str| -> Result<String, String> {
        if rest.is_empty() {
            Err(format!(":{name} needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let input = match name.to_ascii_lowercase().as_str() {
        "new" => Input::Fresh(needs_arg("a query")?),
        "set" => Input::Set(needs_arg("directives")?),
        "remove" | "rm" => {
            let (field, value) = match rest.split_once(char::is_whitespace) {
                Some((field, value)) => (field, Some(value.trim().to_string())),
                None => (rest, None),
            };
            if field.is_empty() {
                return Err(":remove needs a field".to_string());
            }
            let field = field.parse::<FilterField>().map_err(|e| e.to_string())?;
            Input::Remove { field, value }
        }
        "clear" => Input::Clear,
        "filters" | "f" => Input::Filters,
        "advanced" => Input::Advanced,
        "abstracts" => Input::Abstracts,
        "export" => Input::Export(needs_arg("a format")?.parse()?),
        "related" => Input::Related(needs_arg("a paper id")?),
        "ask" => Input::Ask(needs_arg("a question")?),
        "help" | "h" | "?" => Input::Help,
        "quit" | "q" | "exit" => Input::Quit,
        other => return Err(format!("unknown command :{other} (try :help)")),
    };
    Ok(Some(input))
}
