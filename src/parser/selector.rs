use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::{ScraperError, ScraperResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    /// `::text`: the element's own first non-blank text node.
    OwnText,
    /// `::attr(name)`
    Attr(String),
    /// No pseudo-element: all descendant text, whitespace-trimmed.
    AllText,
}

/// A CSS selector with an optional scrapy-style extraction suffix, e.g.
/// `a.next::attr(href)` or `h3.name::text`.
#[derive(Clone)]
pub struct FieldSelector {
    source: String,
    css: Selector,
    target: Target,
}

impl FieldSelector {
    pub fn parse(source: &str) -> ScraperResult<Self> {
        let invalid = |reason: String| ScraperError::SelectorError {
            selector: source.to_string(),
            reason,
        };

        let (css, target) = match source.rsplit_once("::") {
            Some((css, "text")) => (css, Target::OwnText),
            Some((css, suffix)) if suffix.starts_with("attr(") && suffix.ends_with(')') => {
                let name = suffix["attr(".len()..suffix.len() - 1].trim();
                if name.is_empty() {
                    return Err(invalid("empty attribute name".to_string()));
                }
                (css, Target::Attr(name.to_string()))
            }
            Some((_, suffix)) => {
                return Err(invalid(format!("unsupported pseudo-element ::{}", suffix)))
            }
            None => (source, Target::AllText),
        };

        let css = Selector::parse(css.trim()).map_err(|e| invalid(format!("{:?}", e)))?;

        Ok(Self {
            source: source.to_string(),
            css,
            target,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matching elements, for container selectors such as product tiles.
    pub fn elements<'a>(&'a self, scope: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        scope.select(&self.css)
    }

    pub fn first(&self, scope: ElementRef<'_>) -> Option<String> {
        scope
            .select(&self.css)
            .find_map(|element| self.value_of(element))
    }

    pub fn first_in(&self, document: &Html) -> Option<String> {
        self.first(document.root_element())
    }

    fn value_of(&self, element: ElementRef<'_>) -> Option<String> {
        let value = match &self.target {
            Target::Attr(name) => element.value().attr(name).map(str::to_string),
            Target::OwnText => element.children().find_map(|child| match child.value() {
                Node::Text(text) if !text.trim().is_empty() => Some(text.to_string()),
                _ => None,
            }),
            Target::AllText => Some(element.text().collect::<String>()),
        }?;

        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

impl fmt::Debug for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldSelector").field(&self.source).finish()
    }
}

impl PartialEq for FieldSelector {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl<'de> Deserialize<'de> for FieldSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        FieldSelector::parse(&source).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for FieldSelector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}
