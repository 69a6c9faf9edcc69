//! Prompt templates
//!
//! Templates use `{name}` placeholders. Rendering is a single pass, so
//! substituted values are never re-expanded.

use std::collections::HashMap;

/// A system prompt with `{placeholder}` slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitute known placeholders; unknown ones are left as written
    pub fn render(&self, vars: &HashMap<&str, String>) -> String {
        let src = self.template.as_str();
        let mut out = String::with_capacity(src.len());
        let mut rest = src;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find('}') {
                Some(close) if is_placeholder(&after[..close]) => {
                    let name = &after[..close];
                    match vars.get(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// Placeholder names appearing in the template
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) if is_placeholder(&after[..close]) => {
                    names.push(&after[..close]);
                    rest = &after[close + 1..];
                }
                _ => rest = after,
            }
        }
        names
    }
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl From<&str> for PromptTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for PromptTemplate {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_render_known_placeholders() {
        let template = PromptTemplate::new("Customer phone: {customer_phone}\nState: {conversation_state}");
        let rendered = template.render(&vars(&[
            ("customer_phone", "+1234567891"),
            ("conversation_state", "{\"current_step\":\"initial\"}"),
        ]));
        assert_eq!(
            rendered,
            "Customer phone: +1234567891\nState: {\"current_step\":\"initial\"}"
        );
    }

    #[test]
    fn test_unknown_placeholders_untouched() {
        let template = PromptTemplate::new("Hi {name}, your {unknown} and {not a slot} {");
        let rendered = template.render(&vars(&[("name", "Mike")]));
        assert_eq!(rendered, "Hi Mike, your {unknown} and {not a slot} {");
    }

    #[test]
    fn test_values_not_reexpanded() {
        let template = PromptTemplate::new("{a}");
        let rendered = template.render(&vars(&[("a", "{b}"), ("b", "x")]));
        assert_eq!(rendered, "{b}");
    }

    #[test]
    fn test_placeholders() {
        let template = PromptTemplate::new("{x} text {y_2} {bad name}");
        assert_eq!(template.placeholders(), vec!["x", "y_2"]);
    }
}
