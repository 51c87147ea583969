//! Compile and sandbox check for prompt bodies pulled from a repository.
//!
//! Bodies use Jinja-style delimiters and are compiled with tera; rendering
//! happens elsewhere. On top of compiling, bodies may not pull in other
//! templates or name identifiers that reach outside the template sandbox,
//! whether written bare or as string subscripts.

use tera::Tera;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template does not compile: {0}")]
    Syntax(String),
    #[error("tag '{tag}' is not allowed in prompt templates")]
    ForbiddenTag { tag: String },
    #[error("expression references forbidden identifier '{ident}'")]
    ForbiddenIdentifier { ident: String },
}

const FORBIDDEN_TAGS: &[&str] = &["include", "import", "extends", "from"];
const FORBIDDEN_IDENTIFIERS: &[&str] = &[
    "constructor",
    "__proto__",
    "prototype",
    "process",
    "require",
    "global",
    "eval",
];

pub fn validate(source: &str) -> Result<(), TemplateError> {
    check_sandbox(source)?;

    let mut tera = Tera::default();
    tera.add_raw_template("content.j2", source)
        .map_err(|e| TemplateError::Syntax(describe(&e)))
}

fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Walks every tag and expression outside raw blocks. Malformed input stops
/// the walk; the compiler reports it.
fn check_sandbox(source: &str) -> Result<(), TemplateError> {
    let mut rest = source;
    while let Some(start) = rest.find('{') {
        let tail = &rest[start..];
        let close = if tail.starts_with("{{") {
            "}}"
        } else if tail.starts_with("{%") {
            "%}"
        } else if tail.starts_with("{#") {
            "#}"
        } else {
            rest = &tail[1..];
            continue;
        };

        let inner = &tail[2..];
        let len = if close == "#}" {
            inner.find(close)
        } else {
            body_len(inner, close)
        };
        let Some(len) = len else {
            return Ok(());
        };
        let body = trim_body(&inner[..len]);
        rest = &inner[len + close.len()..];

        match close {
            "#}" => {}
            "%}" => {
                let tag = body.split_whitespace().next().unwrap_or("");
                if FORBIDDEN_TAGS.contains(&tag) {
                    return Err(TemplateError::ForbiddenTag {
                        tag: tag.to_string(),
                    });
                }
                if tag == "raw" {
                    match skip_raw(rest) {
                        Some(after) => rest = after,
                        None => return Ok(()),
                    }
                    continue;
                }
                check_identifiers(body)?;
            }
            _ => check_identifiers(body)?,
        }
    }
    Ok(())
}

fn trim_body(body: &str) -> &str {
    body.trim_matches(|c: char| c == '-' || c.is_whitespace())
}

/// Length of a tag body up to `close`, ignoring delimiters inside string
/// literals.
fn body_len(inner: &str, close: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in inner.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None if matches!(c, '"' | '\'' | '`') => quote = Some(c),
            None if inner[i..].starts_with(close) => return Some(i),
            None => {}
        }
    }
    None
}

/// Text after the `endraw` tag closing the current raw block.
fn skip_raw(rest: &str) -> Option<&str> {
    let mut cursor = rest;
    while let Some(open) = cursor.find("{%") {
        let after = &cursor[open + 2..];
        let end = after.find("%}")?;
        if trim_body(&after[..end]) == "endraw" {
            return Some(&after[end + 2..]);
        }
        cursor = after;
    }
    None
}

/// String literals are checked too: `name['constructor']` reaches the same
/// property as `name.constructor`.
fn check_identifiers(body: &str) -> Result<(), TemplateError> {
    body.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .find(|word| FORBIDDEN_IDENTIFIERS.contains(word))
        .map_or(Ok(()), |ident| {
            Err(TemplateError::ForbiddenIdentifier {
                ident: ident.to_string(),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_templated_text() {
        assert!(validate("no tags at all, even with a lone { brace").is_ok());
        assert!(validate("Hello {{ name | upper }}!").is_ok());
        assert!(validate(
            "{% if formal %}Dear {{ name }}{% elif casual %}Hey{% else %}Hi{% endif %}"
        )
        .is_ok());
        assert!(validate("{% for item in items %}- {{ item }}\n{% endfor %}").is_ok());
        assert!(validate("{# a comment with {{ braces }} #}").is_ok());
        assert!(validate("{% set greeting = 'hi' %}{{ greeting }}").is_ok());
        assert!(validate("{{ items | join(sep=', ') | upper }}").is_ok());
    }

    #[test]
    fn closing_delimiters_inside_strings_do_not_end_the_tag() {
        assert!(validate(r#"{{ "}}" }}"#).is_ok());
        assert!(validate(r#"{{ "}}" ~ name.constructor }}"#).is_err());
    }

    #[test]
    fn rejects_bodies_that_do_not_compile() {
        for source in [
            "Hello {{ name",
            "{% if x %}never closed",
            "{% endfor %}",
            "{% for x in y %}{% endif %}",
        ] {
            assert!(
                matches!(validate(source), Err(TemplateError::Syntax(_))),
                "{source}"
            );
        }
    }

    #[test]
    fn rejects_sandbox_escapes() {
        assert!(matches!(
            validate("{{ name.constructor }}"),
            Err(TemplateError::ForbiddenIdentifier { .. })
        ));
        assert!(matches!(
            validate("{% include 'secrets.j2' %}"),
            Err(TemplateError::ForbiddenTag { .. })
        ));
        assert!(matches!(
            validate("{% for key in process %}{{ key }}{% endfor %}"),
            Err(TemplateError::ForbiddenIdentifier { ident }) if ident == "process"
        ));
    }

    #[test]
    fn rejects_forbidden_names_written_as_string_subscripts() {
        assert_eq!(
            validate("{{ name['constructor']['constructor']('return process')() }}"),
            Err(TemplateError::ForbiddenIdentifier {
                ident: "constructor".to_string()
            })
        );
        assert!(matches!(
            validate(r#"{{ name["__proto__"] }}"#),
            Err(TemplateError::ForbiddenIdentifier { .. })
        ));
        assert!(validate("{{ 'process' ~ name }}").is_err());
    }

    #[test]
    fn raw_blocks_are_not_interpreted() {
        assert!(validate("{% raw %}{% include 'x' %}{% endraw %}").is_ok());
        assert!(validate("{% raw %}{{ not closed{% endraw %} then {{ name }}").is_ok());
        assert!(matches!(
            validate("{% raw %}{{ x{% endraw %}{{ name.constructor }}"),
            Err(TemplateError::ForbiddenIdentifier { .. })
        ));
    }
}
