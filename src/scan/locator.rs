use crate::cache;
use crate::document::Document;
use crate::scan::anchor::{Anchor, AnchorPattern};
use crate::scan::braces::BraceMatcher;
use crate::scan::errors::ScanError;

/// How far before an anchor the backward scan looks for a header.
pub const DEFAULT_WINDOW: usize = 3000;

/// `function NAME(PARAMS){` with identifier-only names and parameters.
pub const DEFAULT_SIGNATURE: &str =
    r"function (?P<name>[A-Za-z0-9_$]+)\((?P<params>[A-Za-z0-9_$,]+)\)\{";

/// A function definition resolved in one document snapshot.
///
/// Offsets are only valid for the snapshot the site was located in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSite {
    pub name: String,
    pub parameters: Vec<String>,
    /// Offset of the first header byte
    pub byte_start: usize,
    /// Offset one past the body's opening brace
    pub body_start: usize,
    /// Offset one past the body's closing brace
    pub byte_end: usize,
    /// `async` keyword directly precedes the header
    pub is_async: bool,
    /// Header is part of an `export` or `export default` statement
    pub is_exported: bool,
    /// Full text of [byte_start, byte_end)
    pub text: String,
}

impl FunctionSite {
    /// Body text between the outer braces.
    pub fn body(&self) -> &str {
        let from = self.body_start - self.byte_start;
        &self.text[from..self.text.len() - 1]
    }

    pub fn first_parameter(&self) -> Option<&str> {
        self.parameters.first().map(String::as_str)
    }

    pub fn parameter_list(&self) -> String {
        self.parameters.join(",")
    }
}

/// Outcome of locating a function around an anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Found(FunctionSite),
    NoAnchor,
    NoEnclosingFunction { anchor: Anchor },
}

/// Strategy for resolving the function that owns an anchor.
pub trait FunctionLocator {
    /// Short name used in logs and config.
    fn name(&self) -> &'static str;

    fn enclosing_function(
        &self,
        doc: &Document,
        anchor: Anchor,
    ) -> Result<Option<FunctionSite>, ScanError>;
}

/// Find the anchor, then delegate to `locator` for the owning function.
pub fn locate(
    doc: &Document,
    pattern: &AnchorPattern,
    locator: &dyn FunctionLocator,
) -> Result<Located, ScanError> {
    let Some(anchor) = pattern.find(doc)? else {
        return Ok(Located::NoAnchor);
    };

    log::debug!(
        "anchor found at {}..{}, resolving with {}",
        anchor.start,
        anchor.end,
        locator.name()
    );

    match locator.enclosing_function(doc, anchor)? {
        Some(site) => Ok(Located::Found(site)),
        None => Ok(Located::NoEnclosingFunction { anchor }),
    }
}

/// Text-only locator: rightmost signature match inside a bounded window
/// before the anchor.
///
/// The nearest header is assumed to own the anchor. That is a tie-break,
/// not a parse; a header that closes before the anchor still wins.
#[derive(Debug, Clone)]
pub struct BackwardScan {
    window: usize,
    signature: String,
    braces: BraceMatcher,
}

impl Default for BackwardScan {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            signature: DEFAULT_SIGNATURE.to_string(),
            braces: BraceMatcher::default(),
        }
    }
}

impl BackwardScan {
    pub fn new(window: usize, signature: impl Into<String>, braces: BraceMatcher) -> Self {
        Self {
            window,
            signature: signature.into(),
            braces,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

impl FunctionLocator for BackwardScan {
    fn name(&self) -> &'static str {
        "backward-scan"
    }

    fn enclosing_function(
        &self,
        doc: &Document,
        anchor: Anchor,
    ) -> Result<Option<FunctionSite>, ScanError> {
        let re = cache::get_or_compile_pattern(&self.signature)
            .map_err(|e| (self.signature.as_str(), e))?;

        let text = doc.as_str();
        let window_start = doc.ceil_char_boundary(anchor.start.saturating_sub(self.window));
        let preceding = &text[window_start..anchor.start];

        let mut candidates = 0usize;
        let mut last = None;
        for caps in re.captures_iter(preceding) {
            candidates += 1;
            last = Some(caps);
        }

        let Some(caps) = last else {
            log::debug!(
                "no signature in window {}..{}",
                window_start,
                anchor.start
            );
            return Ok(None);
        };

        let header = caps.get(0).ok_or(ScanError::MissingCapture { group: "0" })?;
        let name = caps
            .name("name")
            .ok_or(ScanError::MissingCapture { group: "name" })?
            .as_str()
            .to_string();
        let params = caps
            .name("params")
            .ok_or(ScanError::MissingCapture { group: "params" })?
            .as_str();

        let byte_start = window_start + header.start();
        let header_end = window_start + header.end();
        let seek_from = if header.as_str().ends_with('{') {
            header_end - 1
        } else {
            header_end
        };

        let span = self.braces.match_brace(text, seek_from)?;

        log::debug!(
            "selected '{}' at {} from {} candidate(s), body ends at {}",
            name,
            byte_start,
            candidates,
            span.end
        );
        if span.end <= anchor.start {
            log::debug!("'{name}' closes before the anchor; keeping nearest header anyway");
        }

        Ok(Some(FunctionSite {
            name,
            parameters: split_parameters(params),
            byte_start,
            body_start: span.open + 1,
            byte_end: span.end,
            is_async: keyword_before(text, byte_start, "async").is_some(),
            is_exported: is_exported_header(text, byte_start),
            text: text[byte_start..span.end].to_string(),
        }))
    }
}

pub(crate) fn split_parameters(params: &str) -> Vec<String> {
    params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Offset of `keyword` when it is the last token before `pos`.
fn keyword_before(text: &str, pos: usize, keyword: &str) -> Option<usize> {
    let head = text[..pos].trim_end().strip_suffix(keyword)?;
    if head.as_bytes().last().is_some_and(|&b| is_identifier_byte(b)) {
        return None;
    }
    Some(head.len())
}

/// `export [default] [async] function ...`
fn is_exported_header(text: &str, header_start: usize) -> bool {
    let mut pos = keyword_before(text, header_start, "async").unwrap_or(header_start);
    if let Some(default_at) = keyword_before(text, pos, "default") {
        pos = default_at;
    }
    keyword_before(text, pos, "export").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const E2E: &str = r#"function ab12(x,y){return fuseSearch(x,{keys:["commandName","partKey","aliasKey","descriptionKey"]})}"#;

    fn anchor() -> AnchorPattern {
        AnchorPattern::new(["commandName", "partKey", "aliasKey", "descriptionKey"])
    }

    fn found(located: Located) -> FunctionSite {
        match located {
            Located::Found(site) => site,
            other => panic!("expected a site, got {other:?}"),
        }
    }

    #[test]
    fn locates_enclosing_function() {
        let doc = Document::from(format!("var z=0;{E2E}var w=1;"));
        let site = found(locate(&doc, &anchor(), &BackwardScan::default()).unwrap());

        assert_eq!(site.name, "ab12");
        assert_eq!(site.parameters, vec!["x", "y"]);
        assert_eq!(site.byte_start, 8);
        assert_eq!(site.text, E2E);
        assert_eq!(
            site.body(),
            r#"return fuseSearch(x,{keys:["commandName","partKey","aliasKey","descriptionKey"]})"#
        );
        assert!(!site.is_async);
    }

    #[test]
    fn rightmost_header_wins() {
        let src = format!(
            "function outer(a){{function helper(b){{return b}}function inner(c){{return c}}{}}}",
            r#"x(["commandName","partKey","aliasKey","descriptionKey"])"#
        );
        let doc = Document::from(src);
        let site = found(locate(&doc, &anchor(), &BackwardScan::default()).unwrap());
        assert_eq!(site.name, "inner");
        assert_eq!(site.text, "function inner(c){return c}");
    }

    #[test]
    fn missing_anchor() {
        let doc = Document::from("function a(b){return b}");
        assert_eq!(
            locate(&doc, &anchor(), &BackwardScan::default()).unwrap(),
            Located::NoAnchor
        );
    }

    #[test]
    fn header_outside_window() {
        let filler = "x;".repeat(100);
        let doc = Document::from(format!(
            r#"function far(a){{{filler}use(["commandName","partKey","aliasKey","descriptionKey"])}}"#
        ));
        let scan = BackwardScan::new(50, DEFAULT_SIGNATURE, BraceMatcher::default());
        assert!(matches!(
            locate(&doc, &anchor(), &scan).unwrap(),
            Located::NoEnclosingFunction { .. }
        ));

        let wide = BackwardScan::new(500, DEFAULT_SIGNATURE, BraceMatcher::default());
        assert_eq!(found(locate(&doc, &anchor(), &wide).unwrap()).name, "far");
    }

    #[test]
    fn window_clamps_to_document_start() {
        let doc = Document::from(E2E);
        let scan = BackwardScan::new(usize::MAX, DEFAULT_SIGNATURE, BraceMatcher::default());
        assert_eq!(found(locate(&doc, &anchor(), &scan).unwrap()).byte_start, 0);
    }

    #[test]
    fn window_respects_char_boundaries() {
        let doc = Document::from(format!("é{E2E}"));
        let found_at = anchor().find(&doc).unwrap().unwrap();
        // Window start lands inside the multi-byte 'é' (bytes 0..2).
        let scan = BackwardScan::new(found_at.start - 1, DEFAULT_SIGNATURE, BraceMatcher::default());
        let site = found(locate(&doc, &anchor(), &scan).unwrap());
        assert_eq!(site.name, "ab12");
        assert_eq!(site.byte_start, 2);
    }

    #[test]
    fn unbalanced_body_propagates() {
        let doc = Document::from(
            r#"function ab12(x){if(x){return f(["commandName","partKey","aliasKey","descriptionKey"])}"#,
        );
        let err = locate(&doc, &anchor(), &BackwardScan::default()).unwrap_err();
        assert!(err.is_malformed_structure());
    }

    #[test]
    fn detects_async_prefix() {
        let doc = Document::from(format!("var a=1;async {E2E}"));
        let site = found(locate(&doc, &anchor(), &BackwardScan::default()).unwrap());
        assert!(site.is_async);

        let doc = Document::from(format!("var notasync;{E2E}"));
        let site = found(locate(&doc, &anchor(), &BackwardScan::default()).unwrap());
        assert!(!site.is_async);
    }

    #[test]
    fn detects_export_prefix() {
        for prefix in ["export ", "export default ", "export async ", "var a=1;\nexport\n"] {
            let doc = Document::from(format!("{prefix}{E2E}"));
            let site = found(locate(&doc, &anchor(), &BackwardScan::default()).unwrap());
            assert!(site.is_exported, "missed {prefix:?}");
            assert_eq!(site.byte_start, prefix.len());
        }

        for prefix in ["var reexport\n", "x.default ", "switch(a){default:"] {
            let doc = Document::from(format!("{prefix}{E2E}"));
            let site = found(locate(&doc, &anchor(), &BackwardScan::default()).unwrap());
            assert!(!site.is_exported, "false export for {prefix:?}");
        }
    }

    #[test]
    fn custom_grammar_without_groups_fails() {
        let doc = Document::from(E2E);
        let scan = BackwardScan::new(3000, r"function \w+\(", BraceMatcher::default());
        let err = locate(&doc, &anchor(), &scan).unwrap_err();
        assert_eq!(err, ScanError::MissingCapture { group: "name" });
    }
}
