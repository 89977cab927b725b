//! A small XPath subset evaluated through CSS selectors
//!
//! Supported: absolute and relative location paths built from `/` and `//`,
//! element names or `*`, the predicates `[@a]`, `[@a='v']` and `[n]`, and a
//! final `text()` or `@attr` step. The result is the string value of the first
//! match, like XPath's `string()` applied to the node-set.

use crate::ExtractionError;
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttribute(String),
    AttributeEquals(String, String),
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Terminal {
    /// String value of the element
    Element,
    /// First direct text node
    Text,
    Attribute(String),
}

/// A parsed XPath expression ready to run against documents
#[derive(Debug, Clone)]
pub struct XPathQuery {
    expression: String,
    css: String,
    selector: Selector,
    terminal: Terminal,
}

impl XPathQuery {
    /// Parses an expression of the supported subset
    pub fn parse(expression: &str) -> Result<Self, ExtractionError> {
        let invalid = |reason: String| ExtractionError::InvalidXPath {
            expression: expression.to_string(),
            reason,
        };

        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty expression".to_string()));
        }

        let raw_steps = split_steps(trimmed).map_err(invalid)?;
        let last = raw_steps.len() - 1;

        let mut css = String::new();
        let mut terminal = Terminal::Element;

        for (index, (axis, step)) in raw_steps.iter().enumerate() {
            if step == "text()" || step.starts_with('@') {
                if index != last || index == 0 || *axis != Axis::Child {
                    return Err(invalid(format!("'{}' is only supported as the final child step", step)));
                }
                if step == "text()" {
                    terminal = Terminal::Text;
                } else {
                    let name = &step[1..];
                    if !is_name(name) {
                        return Err(invalid(format!("invalid attribute name '{}'", name)));
                    }
                    css.push_str(&format!("[{}]", name));
                    terminal = Terminal::Attribute(name.to_string());
                }
                continue;
            }

            let (name, predicates) = parse_step(step).map_err(invalid)?;

            if index > 0 {
                css.push_str(match axis {
                    Axis::Child => " > ",
                    Axis::Descendant => " ",
                });
            }

            let tag = if name == "*" {
                "*".to_string()
            } else {
                name.to_ascii_lowercase()
            };
            css.push_str(&tag);
            if index == 0 && *axis == Axis::Child {
                css.push_str(":root");
            }

            for predicate in predicates {
                match predicate {
                    Predicate::HasAttribute(attr) => css.push_str(&format!("[{}]", attr)),
                    Predicate::AttributeEquals(attr, value) => {
                        css.push_str(&format!("[{}=\"{}\"]", attr, escape_css_string(&value)))
                    }
                    Predicate::Position(n) if name == "*" => {
                        css.push_str(&format!(":nth-child({})", n))
                    }
                    Predicate::Position(n) => css.push_str(&format!(":nth-of-type({})", n)),
                }
            }
        }

        let selector = Selector::parse(&css)
            .map_err(|e| invalid(format!("cannot evaluate as '{}': {:?}", css, e)))?;

        Ok(Self {
            expression: expression.to_string(),
            css,
            selector,
            terminal,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The CSS selector the expression was translated to
    pub fn css(&self) -> &str {
        &self.css
    }

    /// String value of the first match, trimmed; "" when nothing matches
    pub fn evaluate(&self, document: &Html) -> String {
        let mut matches = document.select(&self.selector);

        let value = match &self.terminal {
            Terminal::Element => matches.next().map(element_string_value),
            Terminal::Attribute(name) => matches
                .find_map(|element| element.value().attr(name))
                .map(str::to_string),
            Terminal::Text => matches.find_map(|element| {
                element
                    .children()
                    .find_map(|child| child.value().as_text().map(|text| text.text.to_string()))
            }),
        };

        value.map(|v| v.trim().to_string()).unwrap_or_default()
    }
}

fn element_string_value(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

/// Splits a location path into steps, keeping `/` inside predicates
fn split_steps(expression: &str) -> Result<Vec<(Axis, String)>, String> {
    let (mut axis, rest) = if let Some(rest) = expression.strip_prefix("//") {
        (Axis::Descendant, rest)
    } else if let Some(rest) = expression.strip_prefix('/') {
        (Axis::Child, rest)
    } else {
        (Axis::Child, expression)
    };

    let mut steps = Vec::new();
    let mut current = String::new();
    let mut brackets = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            current.push(c);
            continue;
        }

        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '[' => {
                brackets += 1;
                current.push(c);
            }
            ']' => {
                brackets = brackets
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ']'".to_string())?;
                current.push(c);
            }
            '/' if brackets == 0 => {
                if current.trim().is_empty() {
                    return Err("empty location step".to_string());
                }
                steps.push((axis, current.trim().to_string()));
                current.clear();
                axis = if chars.peek() == Some(&'/') {
                    chars.next();
                    Axis::Descendant
                } else {
                    Axis::Child
                };
            }
            '|' if brackets == 0 => return Err("unions are not supported".to_string()),
            _ => current.push(c),
        }
    }

    if quote.is_some() || brackets != 0 {
        return Err("unterminated predicate".to_string());
    }
    if current.trim().is_empty() {
        return Err("expression ends with '/'".to_string());
    }
    steps.push((axis, current.trim().to_string()));

    Ok(steps)
}

/// Parses `name[pred][pred]...`
fn parse_step(step: &str) -> Result<(String, Vec<Predicate>), String> {
    let name_end = step.find('[').unwrap_or(step.len());
    let name = step[..name_end].trim();

    if name != "*" && !is_name(name) {
        return Err(format!("unsupported location step '{}'", step));
    }

    let mut predicates = Vec::new();
    let mut rest = step[name_end..].trim_start();

    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(format!("unexpected '{}' in step '{}'", rest, step));
        }
        let close = find_predicate_end(rest)
            .ok_or_else(|| format!("unterminated predicate in '{}'", step))?;
        predicates.push(parse_predicate(rest[1..close].trim())?);
        rest = rest[close + 1..].trim_start();
    }

    Ok((name.to_string(), predicates))
}

/// Index of the `]` closing the predicate that starts at 0
fn find_predicate_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(body: &str) -> Result<Predicate, String> {
    if let Ok(position) = body.parse::<usize>() {
        if position == 0 {
            return Err("positions start at 1".to_string());
        }
        return Ok(Predicate::Position(position));
    }

    let Some(attr_expr) = body.strip_prefix('@') else {
        return Err(format!("unsupported predicate '[{}]'", body));
    };

    let (name, value) = match attr_expr.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (attr_expr.trim(), None),
    };

    if !is_name(name) {
        return Err(format!("invalid attribute name '{}'", name));
    }

    match value {
        None => Ok(Predicate::HasAttribute(name.to_string())),
        Some(value) => {
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .ok_or_else(|| format!("attribute value must be quoted in '[{}]'", body))?;
            Ok(Predicate::AttributeEquals(name.to_string(), unquoted.to_string()))
        }
    }
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn escape_css_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
