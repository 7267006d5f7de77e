/*!
 * Text transformations applied while copying: property filtering and
 * ordered replacements
 */

use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::error::Result;

/// Replace `${key}` and `@key@` tokens with property values.
///
/// Tokens naming an unknown property are left as they are.
pub fn filter_properties(text: &str, properties: &HashMap<String, String>) -> Result<String> {
    let tokens = Regex::new(r"\$\{([^}\s]+)\}|@([A-Za-z0-9_.\-]+)@")?;
    let filtered = tokens.replace_all(text, |caps: &Captures| {
        let key = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or("");
        match properties.get(key) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    });
    Ok(filtered.into_owned())
}

#[derive(Debug, Clone)]
enum Pattern {
    Literal(String),
    Regex(Regex),
}

/// One search-and-replace step
#[derive(Debug, Clone)]
pub struct Replacement {
    pattern: Pattern,
    to: String,
}

impl Replacement {
    /// Replace every occurrence of `from`
    pub fn literal(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            pattern: Pattern::Literal(from.into()),
            to: to.into(),
        }
    }

    /// Replace every match of `pattern`; `to` may refer to groups as `$1` or `${name}`
    pub fn regex(pattern: &str, to: impl Into<String>) -> Result<Self> {
        Ok(Self {
            pattern: Pattern::Regex(Regex::new(pattern)?),
            to: to.into(),
        })
    }

    /// Parse a `FROM=TO` command-line argument
    pub fn parse(arg: &str, regex: bool) -> Result<Self> {
        let (from, to) = arg.split_once('=').ok_or_else(|| {
            crate::error::ArtshipError::Config(format!("Replacement must look like FROM=TO: {}", arg))
        })?;
        if regex {
            Self::regex(from, to)
        } else {
            Ok(Self::literal(from, to))
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Pattern::Literal(from) if from.is_empty() => text.to_string(),
            Pattern::Literal(from) => text.replace(from.as_str(), &self.to),
            Pattern::Regex(regex) => regex.replace_all(text, self.to.as_str()).into_owned(),
        }
    }
}

/// Apply replacements in order, each seeing the previous one's output
pub fn apply_replacements(text: &str, replacements: &[Replacement]) -> String {
    replacements
        .iter()
        .fold(text.to_string(), |current, replacement| replacement.apply(&current))
}
