//! Filter chain text parser
//!
//! Grammar (linear chains only):
//!
//! ```text
//! chain  := filter ("," filter)*
//! filter := name ("=" arg (":" arg)*)?
//! arg    := (key "=")? value
//! ```

use audx_core::{AudxError, Result};

/// One `key=value` or positional argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArg {
    /// Option name, `None` for positional arguments
    pub key: Option<String>,
    /// Raw option value
    pub value: String,
}

/// One parsed filter with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArgs {
    /// Filter name, e.g. "atempo"
    pub name: String,
    /// Arguments in the order given
    pub args: Vec<FilterArg>,
}

impl FilterArgs {
    /// Create an argument list with no arguments
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Value for `key`, falling back to the positional argument at `position`
    pub fn get(&self, key: &str, position: usize) -> Option<&str> {
        self.args
            .iter()
            .find(|a| a.key.as_deref() == Some(key))
            .or_else(|| self.args.iter().filter(|a| a.key.is_none()).nth(position))
            .map(|a| a.value.as_str())
    }

    /// First value found under any of `keys`, or the positional argument at `position`
    pub fn get_any(&self, keys: &[&str], position: usize) -> Option<&str> {
        keys.iter()
            .find_map(|k| {
                self.args
                    .iter()
                    .find(|a| a.key.as_deref() == Some(*k))
                    .map(|a| a.value.as_str())
            })
            .or_else(|| {
                self.args
                    .iter()
                    .filter(|a| a.key.is_none())
                    .nth(position)
                    .map(|a| a.value.as_str())
            })
    }

    /// Parse a numeric option, failing on malformed numbers
    pub fn get_f64(&self, keys: &[&str], position: usize) -> Result<Option<f64>> {
        self.get_any(keys, position)
            .map(|raw| {
                raw.trim().parse::<f64>().map_err(|_| {
                    AudxError::GraphParse(format!(
                        "{}: invalid numeric value '{}' for option '{}'",
                        self.name, raw, keys[0]
                    ))
                })
            })
            .transpose()
    }

    /// Reject named options outside `known` and more than `max_positional` positional ones
    pub fn ensure_known(&self, known: &[&str], max_positional: usize) -> Result<()> {
        for arg in &self.args {
            if let Some(key) = &arg.key {
                if !known.contains(&key.as_str()) {
                    return Err(AudxError::GraphParse(format!(
                        "{}: unknown option '{}'",
                        self.name, key
                    )));
                }
            }
        }
        let positional = self.args.iter().filter(|a| a.key.is_none()).count();
        if positional > max_positional {
            return Err(AudxError::GraphParse(format!(
                "{}: too many arguments ({} given, at most {})",
                self.name, positional, max_positional
            )));
        }
        Ok(())
    }
}

/// Parse a chain such as `"atempo=1.25,volume=0.5"`
pub fn parse_chain(text: &str) -> Result<Vec<FilterArgs>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AudxError::GraphParse("empty filter chain".to_string()));
    }
    if let Some(bad) = text.chars().find(|c| matches!(c, ';' | '[' | ']')) {
        return Err(AudxError::GraphParse(format!(
            "'{}' found in '{}': only linear chains are supported",
            bad, text
        )));
    }

    text.split(',').map(parse_filter).collect()
}

fn parse_filter(segment: &str) -> Result<FilterArgs> {
    let segment = segment.trim();
    let (name, rest) = match segment.split_once('=') {
        Some((name, rest)) => (name.trim(), Some(rest)),
        None => (segment, None),
    };

    if name.is_empty() {
        return Err(AudxError::GraphParse(format!(
            "missing filter name in '{}'",
            segment
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AudxError::GraphParse(format!("invalid filter name '{}'", name)));
    }

    let args = match rest {
        None => Vec::new(),
        Some(rest) => rest
            .split(':')
            .map(|raw| parse_arg(name, raw))
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(FilterArgs {
        name: name.to_string(),
        args,
    })
}

fn parse_arg(filter: &str, raw: &str) -> Result<FilterArg> {
    let raw = raw.trim();
    let (key, value) = match raw.split_once('=') {
        Some((key, value)) => (Some(key.trim()), value.trim()),
        None => (None, raw),
    };

    if value.is_empty() || value.contains('=') || key.is_some_and(str::is_empty) {
        return Err(AudxError::GraphParse(format!(
            "{}: malformed argument '{}'",
            filter, raw
        )));
    }

    Ok(FilterArg {
        key: key.map(str::to_string),
        value: value.to_string(),
    })
}
