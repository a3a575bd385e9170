//! Minimal `${key}` template substitution for email subjects and bodies.
//!
//! The renderer takes a flat key -> scalar context map and replaces every
//! `${key}` token whose key is present. Unresolved tokens are left verbatim
//! so a typo in a template never aborts a send.

use std::collections::BTreeMap;

/// Flat string context for template rendering.
///
/// A `BTreeMap` keeps iteration deterministic, which matters when rendered
/// output is persisted and compared.
pub type TemplateContext = BTreeMap<String, String>;

/// Render a template by substituting `${key}` tokens from the context.
///
/// Unknown keys are left as-is; a literal `$` not followed by `{` passes
/// through unchanged.
pub fn render(template: &str, context: &TemplateContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match context.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        // Unresolved token stays verbatim.
                        out.push_str(&rest[start..start + 2 + end + 1]);
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated token, emit the remainder untouched.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Convenience builder for a context from string pairs.
pub fn context_from<const N: usize>(pairs: [(&str, &str); N]) -> TemplateContext {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_known_keys() {
        let ctx = context_from([("name", "Ada"), ("unit", "Northfield")]);
        assert_eq!(
            render("Hello ${name}, report for ${unit}", &ctx),
            "Hello Ada, report for Northfield"
        );
    }

    #[test]
    fn test_unresolved_token_left_verbatim() {
        let ctx = context_from([("name", "Ada")]);
        assert_eq!(render("Hi ${name}, see ${missing}", &ctx), "Hi Ada, see ${missing}");
    }

    #[test]
    fn test_empty_context_passthrough() {
        let ctx = TemplateContext::new();
        assert_eq!(render("${a} and ${b}", &ctx), "${a} and ${b}");
    }

    #[test]
    fn test_literal_dollar_untouched() {
        let ctx = context_from([("amount", "100")]);
        assert_eq!(render("$5 plus ${amount}", &ctx), "$5 plus 100");
    }

    #[test]
    fn test_unterminated_token_passthrough() {
        let ctx = context_from([("a", "x")]);
        assert_eq!(render("start ${a end", &ctx), "start ${a end");
    }

    #[test]
    fn test_repeated_key() {
        let ctx = context_from([("x", "1")]);
        assert_eq!(render("${x}${x}${x}", &ctx), "111");
    }
}
