use crate::document::Document;
use crate::scan::locator::split_parameters;
use crate::scan::{Anchor, FunctionLocator, FunctionSite, ScanError};
use crate::sg::lang::javascript;
use ast_grep_core::AstGrep;

/// Only declarations: the rewrite emits a `var` statement before the
/// function, which is invalid in expression position.
const DECLARATION_KIND: &str = "function_declaration";

const EXPORT_KIND: &str = "export_statement";

/// Grammar-aware locator: the innermost function declaration whose syntax
/// node contains the whole anchor.
///
/// Slower than [`crate::scan::BackwardScan`] on large bundles (the whole
/// document is parsed), but immune to braces in literals and to headers
/// that close before the anchor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxTreeLocator;

impl FunctionLocator for SyntaxTreeLocator {
    fn name(&self) -> &'static str {
        "syntax-tree"
    }

    fn enclosing_function(
        &self,
        doc: &Document,
        anchor: Anchor,
    ) -> Result<Option<FunctionSite>, ScanError> {
        let source = doc.as_str();
        let sg = AstGrep::new(source, javascript());
        let root = sg.root();

        let mut best: Option<FunctionSite> = None;

        for node in root.dfs() {
            if node.kind() != DECLARATION_KIND {
                continue;
            }

            let range = node.range();
            if range.start > anchor.start || range.end < anchor.end {
                continue;
            }

            let Some(name) = node.field("name") else {
                continue;
            };
            let Some(body) = node.field("body") else {
                continue;
            };

            let parameters = node
                .field("parameters")
                .map(|params| {
                    let text = params.text();
                    let inner = text
                        .strip_prefix('(')
                        .and_then(|t| t.strip_suffix(')'))
                        .unwrap_or(&*text);
                    split_parameters(inner)
                })
                .unwrap_or_default();

            let is_async = source[range.start..].starts_with("async");
            let is_exported = node.parent().is_some_and(|p| p.kind() == EXPORT_KIND);

            // dfs visits parents before children, so a later hit is nested deeper.
            best = Some(FunctionSite {
                name: name.text().to_string(),
                parameters,
                byte_start: range.start,
                body_start: body.range().start + 1,
                byte_end: range.end,
                is_async,
                is_exported,
                text: source[range.start..range.end].to_string(),
            });
        }

        if let Some(site) = &best {
            log::debug!(
                "syntax tree resolved '{}' at {}..{}",
                site.name,
                site.byte_start,
                site.byte_end
            );
        }

        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{locate, AnchorPattern, Located};

    fn anchor() -> AnchorPattern {
        AnchorPattern::new(["commandName", "partKey", "aliasKey", "descriptionKey"])
    }

    #[test]
    fn finds_innermost_enclosing_declaration() {
        let doc = Document::from(
            r#"function outer(a){function helper(b){return b}function owner(c,d){return s(c,["commandName","partKey","aliasKey","descriptionKey"])}return owner}"#,
        );
        let Located::Found(site) = locate(&doc, &anchor(), &SyntaxTreeLocator).unwrap() else {
            panic!("expected a site");
        };

        assert_eq!(site.name, "owner");
        assert_eq!(site.parameters, vec!["c", "d"]);
        assert!(site.text.starts_with("function owner(c,d){"));
        assert!(site.body().starts_with("return s(c,"));
    }

    #[test]
    fn skips_header_that_closes_before_anchor() {
        let doc = Document::from(
            r#"function owner(a){function helper(b){return b}return s(a,["commandName","partKey","aliasKey","descriptionKey"])}"#,
        );
        let Located::Found(site) = locate(&doc, &anchor(), &SyntaxTreeLocator).unwrap() else {
            panic!("expected a site");
        };
        assert_eq!(site.name, "owner");
    }

    #[test]
    fn tolerates_braces_in_strings() {
        let doc = Document::from(
            r#"function owner(a){var s="}";return f(a+s,["commandName","partKey","aliasKey","descriptionKey"])}var z;"#,
        );
        let Located::Found(site) = locate(&doc, &anchor(), &SyntaxTreeLocator).unwrap() else {
            panic!("expected a site");
        };
        assert!(site.text.ends_with(r#""descriptionKey"])}"#));
    }

    #[test]
    fn ignores_function_expressions() {
        let doc = Document::from(
            r#"function owner(a){var g=function inner(b){return s(b,["commandName","partKey","aliasKey","descriptionKey"])};return g(a)}"#,
        );
        let Located::Found(site) = locate(&doc, &anchor(), &SyntaxTreeLocator).unwrap() else {
            panic!("expected a site");
        };
        assert_eq!(site.name, "owner");
    }

    #[test]
    fn flags_exported_declarations() {
        let body = r#"function owner(a){return s(a,["commandName","partKey","aliasKey","descriptionKey"])}"#;

        let doc = Document::from(format!("var z=1;export {body}"));
        let Located::Found(site) = locate(&doc, &anchor(), &SyntaxTreeLocator).unwrap() else {
            panic!("expected a site");
        };
        assert!(site.is_exported);
        assert!(site.text.starts_with("function owner(a){"));

        let doc = Document::from(format!("var z=1;{body}"));
        let Located::Found(site) = locate(&doc, &anchor(), &SyntaxTreeLocator).unwrap() else {
            panic!("expected a site");
        };
        assert!(!site.is_exported);
    }

    #[test]
    fn top_level_anchor_has_no_owner() {
        let doc = Document::from(r#"var k=["commandName","partKey","aliasKey","descriptionKey"];"#);
        assert!(matches!(
            locate(&doc, &anchor(), &SyntaxTreeLocator).unwrap(),
            Located::NoEnclosingFunction { .. }
        ));
    }
}
