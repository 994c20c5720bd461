//! Output encodings offered for a result set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filters::FilterSet;
use crate::search::SearchResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Bibtex,
    Ris,
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 6] = [
        Self::Markdown,
        Self::Bibtex,
        Self::Ris,
        Self::Json,
        Self::Csv,
        Self::Pdf,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Bibtex => "bibtex",
            Self::Ris => "ris",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Bibtex => "bib",
            Self::Ris => "ris",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.key() == s || f.extension() == s)
            .ok_or_else(|| format!("unknown export format: {s}"))
    }
}

/// Body of an export call: the query that produced the results plus the results.
#[derive(Debug, Serialize)]
pub struct ExportRequest<'a> {
    pub format: ExportFormat,
    pub query: &'a FilterSet,
    pub results: &'a SearchResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_by_key_or_extension() {
        assert_eq!("bibtex".parse::<ExportFormat>().unwrap(), ExportFormat::Bibtex);
        assert_eq!("bib".parse::<ExportFormat>().unwrap(), ExportFormat::Bibtex);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("docx".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn wire_name_matches_key() {
        for format in ExportFormat::ALL {
            let value = serde_json::to_value(format).unwrap();
            assert_eq!(value, format.key());
        }
    }
}
