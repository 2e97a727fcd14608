use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ScraperError, ScraperResult};

/// How a matched prefix/number/suffix is rendered into the canonical code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeFormat {
    /// `DB-0010`, `DB-0010-B`: number zero-padded to `width`, parts joined by `-`.
    Padded { width: usize },
    /// `DB10`: prefix and number concatenated, leading zeros dropped.
    Compact,
}

/// A code family, e.g. `DBS`, and the regex recognising it in free text.
///
/// Capture group 1 is the numeric id and must participate in the match;
/// group 2, when the pattern has one, is an optional alphabetic suffix.
#[derive(Debug, Clone)]
pub struct CodePattern {
    prefix: String,
    regex: Regex,
}

impl CodePattern {
    pub fn new(prefix: &str, pattern: &str) -> ScraperResult<Self> {
        let regex = Regex::new(pattern).map_err(|source| ScraperError::PatternError {
            pattern: pattern.to_string(),
            source,
        })?;
        if regex.captures_len() < 2 {
            return Err(ScraperError::ExtractionError(format!(
                "code pattern `{}` has no numeric capture group",
                pattern
            )));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            regex,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCode {
    pub prefix: String,
    pub number: String,
    pub suffix: Option<String>,
    pub canonical: String,
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Turns product names into canonical codes.
///
/// Patterns are evaluated strictly in the order given and the first one that
/// matches wins. Families sharing a lead token (`DB` vs `DBS`/`DBM`/`DBL`)
/// must be written so the generic pattern cannot swallow the specific one
/// (`DB-?(\d+)` needs a digit right after `DB`), or be listed after it.
#[derive(Debug, Clone)]
pub struct CodeExtractor {
    patterns: Vec<CodePattern>,
    format: CodeFormat,
}

impl CodeExtractor {
    pub fn new(patterns: Vec<CodePattern>, format: CodeFormat) -> Self {
        Self { patterns, format }
    }

    pub fn format(&self) -> CodeFormat {
        self.format
    }

    pub fn patterns(&self) -> &[CodePattern] {
        &self.patterns
    }

    /// Returns `None` for names outside the tracked families; that is the
    /// common case on a mixed catalog, not an error.
    pub fn extract(&self, name: &str) -> Option<ProductCode> {
        self.patterns.iter().find_map(|pattern| {
            let caps = pattern.regex.captures(name)?;
            let number = caps.get(1)?.as_str();
            let suffix = caps
                .get(2)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            Some(self.render(&pattern.prefix, number, suffix))
        })
    }

    fn render(&self, prefix: &str, digits: &str, suffix: Option<String>) -> ProductCode {
        let (number, canonical) = match self.format {
            CodeFormat::Padded { width } => {
                let number = format!("{:0>width$}", digits, width = width);
                let canonical = match &suffix {
                    Some(s) => format!("{}-{}-{}", prefix, number, s),
                    None => format!("{}-{}", prefix, number),
                };
                (number, canonical)
            }
            CodeFormat::Compact => {
                let trimmed = digits.trim_start_matches('0');
                let number = if trimmed.is_empty() { "0" } else { trimmed }.to_string();
                let canonical = format!(
                    "{}{}{}",
                    prefix,
                    number,
                    suffix.as_deref().unwrap_or_default()
                );
                (number, canonical)
            }
        };

        ProductCode {
            prefix: prefix.to_string(),
            number,
            suffix,
            canonical,
        }
    }
}
