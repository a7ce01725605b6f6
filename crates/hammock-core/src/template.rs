//! Feedback message substitution.
//!
//! Grading only needs `substitute(template, vars) -> String`; the trait keeps
//! any particular templating technology out of the grading engine.

use std::collections::BTreeMap;

/// Renders a feedback template against a flat set of string variables.
pub trait Templater: Send + Sync {
    fn substitute(&self, template: &str, vars: &BTreeMap<String, String>) -> String;
}

/// Replaces `{{name}}` and `{{ name }}` tokens. Tokens naming an unknown
/// variable are left as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceTemplater;

impl Templater for BraceTemplater {
    fn substitute(&self, template: &str, vars: &BTreeMap<String, String>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            let name = rest[start + 2..start + 2 + len].trim();
            out.push_str(&rest[..start]);
            match vars.get(name) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + len + 4]),
            }
            rest = &rest[start + len + 4..];
        }

        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_plain_and_spaced_tokens() {
        let out = BraceTemplater.substitute(
            "You said {{key}}, off by {{ delta }}.",
            &vars(&[("key", "7"), ("delta", "2")]),
        );
        assert_eq!(out, "You said 7, off by 2.");
    }

    #[test]
    fn unknown_tokens_are_untouched() {
        let out = BraceTemplater.substitute("Hi {{name}}!", &vars(&[]));
        assert_eq!(out, "Hi {{name}}!");
    }

    #[test]
    fn unterminated_token_is_literal() {
        let out = BraceTemplater.substitute("a {{key", &vars(&[("key", "x")]));
        assert_eq!(out, "a {{key");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = BraceTemplater.substitute("{{a}}{{b}}", &vars(&[("a", "{{b}}"), ("b", "2")]));
        assert_eq!(out, "{{b}}2");
    }
}
