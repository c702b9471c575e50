use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::parameters::ParameterSet;

/// Keywords of the expression grammar that look like identifiers.
const GRAMMAR_KEYWORDS: [&str; 2] = ["and", "or"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Identifiers that had no parameter value, in first-seen order.
    pub unknown: Vec<String>,
}

/// Replaces parameter names in a formula or condition with their values.
///
/// Names are tried longest first and only match on identifier boundaries,
/// so `A` never rewrites part of `AGE` regardless of how the set was
/// built. Replaced text is never re-scanned. Any other identifier that is
/// not a grammar keyword becomes `0` and is reported in
/// [`Substitution::unknown`]. Names joined by `.` are left untouched so
/// the evaluator rejects them instead of reading `price.total` as `0.0`.
pub fn substitute(text: &str, parameters: &ParameterSet) -> Substitution {
    let substitution = substitute_tokens(text, parameters);
    for name in &substitution.unknown {
        warn!(
            event_name = "pricing.substitution.unknown_parameter",
            parameter = %name,
            "parameter has no value; substituting 0"
        );
    }
    substitution
}

pub(crate) fn substitute_tokens(text: &str, parameters: &ParameterSet) -> Substitution {
    let mut names: Vec<(&str, Decimal)> =
        parameters.iter().filter(|(name, _)| !name.is_empty()).collect();
    names.sort_by(|(left, _), (right, _)| right.len().cmp(&left.len()).then_with(|| left.cmp(right)));

    let mut output = String::with_capacity(text.len());
    let mut unknown: Vec<String> = Vec::new();
    let mut index = 0;

    while index < text.len() {
        let rest = &text[index..];
        let previous = text[..index].chars().next_back();
        let at_boundary = !previous.is_some_and(is_identifier_char);

        if at_boundary {
            let after_dot = previous == Some('.');
            let matched = names.iter().find(|(name, _)| {
                rest.starts_with(name) && !after_dot && ends_word(&rest[name.len()..])
            });
            if let Some((name, value)) = matched {
                output.push_str(&render_value(*value));
                index += name.len();
                continue;
            }

            if rest.starts_with(is_identifier_start) {
                let length = rest.find(|ch: char| !is_identifier_char(ch)).unwrap_or(rest.len());
                let word = &rest[..length];
                if GRAMMAR_KEYWORDS.contains(&word) || after_dot || rest[length..].starts_with('.') {
                    // Dotted names stay verbatim and fail to lex.
                    output.push_str(word);
                } else {
                    if !unknown.iter().any(|seen| seen == word) {
                        unknown.push(word.to_string());
                    }
                    output.push('0');
                }
                index += length;
                continue;
            }
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        output.push(ch);
        index += ch.len_utf8();
    }

    Substitution { text: output, unknown }
}

/// Plain decimal literal; negatives are parenthesized so `X-Y` stays
/// well-formed when `Y` is negative.
pub fn render_value(value: Decimal) -> String {
    let value = value.normalize();
    if value.is_zero() {
        return "0".to_string();
    }
    if value.is_sign_negative() {
        return format!("({value})");
    }
    value.to_string()
}

/// A name ends where neither an identifier character nor a `.` follows.
fn ends_word(rest: &str) -> bool {
    !rest.chars().next().is_some_and(|ch| is_identifier_char(ch) || ch == '.')
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
