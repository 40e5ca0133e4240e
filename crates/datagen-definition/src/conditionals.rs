//! Grammar of conditional keys, link expressions and templates.
//!
//! This module only parses text. Resolving names against a model (field
//! types, attribute extraction, evaluation) happens in the generator.

use std::sync::OnceLock;

use regex::Regex;

/// Comparison between a column and a literal or another column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    Unequals,
    Superior,
    Inferior,
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSyntax {
    pub column: String,
    pub comparison: Comparison,
    pub operand: Operand,
}

/// Parsed conditional key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSyntax {
    /// Disjunction of conjunctions: the line holds when any group holds.
    Conditions(Vec<Vec<ConditionSyntax>>),
    Formula,
    Link,
    Injection,
    Default,
}

/// Piece of an injection template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Field(String),
}

/// Parse the key of a conditional line.
///
/// Tokens are separated by whitespace and alternate between conditions and
/// connectives. `|`, `||` and `or` join OR-groups; `&`, `&&` and `and` chain
/// conditions inside a group.
pub fn parse_line_key(key: &str) -> Result<LineSyntax, String> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    match tokens.as_slice() {
        [] => return Err("conditional key is empty".to_string()),
        [single] => {
            let keyword = single.to_ascii_lowercase();
            match keyword.as_str() {
                "formula" => return Ok(LineSyntax::Formula),
                "link" => return Ok(LineSyntax::Link),
                "injection" => return Ok(LineSyntax::Injection),
                "default" => return Ok(LineSyntax::Default),
                _ => {}
            }
        }
        _ => {}
    }

    if tokens.len() % 2 == 0 {
        return Err(format!("conditional key '{key}' ends with a connective"));
    }

    let mut groups = Vec::new();
    let mut current = vec![parse_condition(tokens[0])?];
    for pair in tokens[1..].chunks(2) {
        let condition = parse_condition(pair[1])?;
        match pair[0].to_ascii_lowercase().as_str() {
            "&" | "&&" | "and" => current.push(condition),
            "|" | "||" | "or" => {
                groups.push(std::mem::take(&mut current));
                current.push(condition);
            }
            other => return Err(format!("unknown connective '{other}' in '{key}'")),
        }
    }
    groups.push(current);

    Ok(LineSyntax::Conditions(groups))
}

/// Parse one `$column<op>value` token.
///
/// Operators are looked up in priority order `!=`, `=`, `!`, `<`, `>`; the
/// right side is a column when it starts with `$`.
pub fn parse_condition(token: &str) -> Result<ConditionSyntax, String> {
    const OPERATORS: [(&str, Comparison); 5] = [
        ("!=", Comparison::Unequals),
        ("=", Comparison::Equals),
        ("!", Comparison::Unequals),
        ("<", Comparison::Inferior),
        (">", Comparison::Superior),
    ];

    let token = token.trim();
    let (left, comparison, right) = OPERATORS
        .iter()
        .find_map(|(symbol, comparison)| {
            token
                .split_once(symbol)
                .map(|(left, right)| (left, *comparison, right))
        })
        .ok_or_else(|| format!("condition '{token}' has no operator"))?;

    let column = left
        .strip_prefix('$')
        .filter(|name| is_identifier(name))
        .ok_or_else(|| format!("condition '{token}' must start with $column"))?;

    let operand = match right.strip_prefix('$') {
        Some(name) if is_identifier(name) => Operand::Column(name.to_string()),
        Some(_) => return Err(format!("condition '{token}' has an invalid column on its right")),
        None => Operand::Literal(right.to_string()),
    };

    Ok(ConditionSyntax {
        column: column.to_string(),
        comparison,
        operand,
    })
}

/// Parse `$field.attribute` into its two names.
pub fn parse_link(expression: &str) -> Result<(String, String), String> {
    let cleaned = expression.trim().replace('$', "");
    let (field, attribute) = cleaned
        .split_once('.')
        .ok_or_else(|| format!("link '{expression}' must look like $field.attribute"))?;
    if !is_identifier(field) || attribute.is_empty() {
        return Err(format!("link '{expression}' must look like $field.attribute"));
    }
    Ok((field.to_string(), attribute.to_string()))
}

/// Split a template into literal text and `${field}` placeholders.
pub fn parse_template(template: &str) -> Vec<TemplatePart> {
    let Some(pattern) = placeholder_pattern() else {
        return vec![TemplatePart::Literal(template.to_string())];
    };
    let mut parts = Vec::new();
    let mut last = 0;
    for captures in pattern.captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if whole.start() > last {
            parts.push(TemplatePart::Literal(template[last..whole.start()].to_string()));
        }
        parts.push(TemplatePart::Field(name.as_str().to_string()));
        last = whole.end();
    }
    if last < template.len() {
        parts.push(TemplatePart::Literal(template[last..].to_string()));
    }
    parts
}

/// Field names referenced by `${name}` placeholders of a template.
pub fn template_references(template: &str) -> Vec<String> {
    parse_template(template)
        .into_iter()
        .filter_map(|part| match part {
            TemplatePart::Field(name) => Some(name),
            TemplatePart::Literal(_) => None,
        })
        .collect()
}

/// Field names referenced by a formula, written either `${name}` or `$name`.
pub fn formula_references(formula: &str) -> Vec<String> {
    let Some(pattern) = variable_pattern() else {
        return Vec::new();
    };
    pattern
        .captures_iter(formula)
        .filter_map(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map(|name| name.as_str().to_string())
        .collect()
}

/// Pattern matching `${name}` or `$name` in formulas.
pub fn variable_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").ok()
        })
        .as_ref()
}

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").ok())
        .as_ref()
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_literal(column: &str, comparison: Comparison, literal: &str) -> ConditionSyntax {
        ConditionSyntax {
            column: column.to_string(),
            comparison,
            operand: Operand::Literal(literal.to_string()),
        }
    }

    #[test]
    fn keywords_select_line_kind() {
        assert_eq!(parse_line_key("formula"), Ok(LineSyntax::Formula));
        assert_eq!(parse_line_key(" LINK "), Ok(LineSyntax::Link));
        assert_eq!(parse_line_key("injection"), Ok(LineSyntax::Injection));
        assert_eq!(parse_line_key("default"), Ok(LineSyntax::Default));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let parsed = parse_line_key("$a=1 & $b>2 | $c<3").expect("parse");
        assert_eq!(
            parsed,
            LineSyntax::Conditions(vec![
                vec![
                    column_literal("a", Comparison::Equals, "1"),
                    column_literal("b", Comparison::Superior, "2"),
                ],
                vec![column_literal("c", Comparison::Inferior, "3")],
            ])
        );
    }

    #[test]
    fn right_hand_column_is_detected() {
        let condition = parse_condition("$city!$birth_city").expect("parse");
        assert_eq!(condition.comparison, Comparison::Unequals);
        assert_eq!(condition.operand, Operand::Column("birth_city".to_string()));

        let condition = parse_condition("$city!=Paris").expect("parse");
        assert_eq!(condition.comparison, Comparison::Unequals);
        assert_eq!(condition.operand, Operand::Literal("Paris".to_string()));
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(parse_line_key("").is_err());
        assert!(parse_line_key("$a=1 &").is_err());
        assert!(parse_line_key("$a=1 xor $b=2").is_err());
        assert!(parse_condition("a=1").is_err());
        assert!(parse_condition("$a").is_err());
    }

    #[test]
    fn templates_split_into_parts() {
        let parts = parse_template("${first}.${last}@example.com");
        assert_eq!(
            parts,
            vec![
                TemplatePart::Field("first".to_string()),
                TemplatePart::Literal(".".to_string()),
                TemplatePart::Field("last".to_string()),
                TemplatePart::Literal("@example.com".to_string()),
            ]
        );
        assert_eq!(template_references("no placeholders"), Vec::<String>::new());
    }

    #[test]
    fn formulas_accept_both_placeholder_forms() {
        assert_eq!(
            formula_references("$price * ${quantity} + 1"),
            vec!["price".to_string(), "quantity".to_string()]
        );
    }

    #[test]
    fn links_need_field_and_attribute() {
        assert_eq!(
            parse_link("$city.lat"),
            Ok(("city".to_string(), "lat".to_string()))
        );
        assert!(parse_link("$city").is_err());
    }
}
