use crate::document::Document;
use crate::edit::Edit;
use crate::rewrite::{is_identifier, Plan, RewriteRule, RuleError};
use crate::scan::{locate, AnchorPattern, FunctionLocator, FunctionSite, Located};

/// Replace `site` with a single-entry memoizing wrapper.
///
/// The wrapper keeps the name and parameter list, declares the cache cell
/// `cache` right before itself, keys on the first parameter and runs the
/// original body unchanged as an inner function invoked with the caller's
/// `this` and `arguments`. Key and value are stored only after the body
/// returns, so a throwing call never leaves a half-updated cell.
///
/// The declaration is hoisted but its initializer is not, so the wrapper
/// also creates the cell on first use. Calls that run before the
/// declaration site is reached then behave like later ones.
///
/// Returns the reason when the site cannot be wrapped.
pub fn memoize_wrapper(site: &FunctionSite, cache: &str) -> Result<String, String> {
    if site.is_async {
        return Err(format!("function '{}' is async", site.name));
    }
    if site.is_exported {
        return Err(format!("function '{}' is exported", site.name));
    }
    let Some(key_param) = site.first_parameter() else {
        return Err(format!("function '{}' takes no parameters", site.name));
    };
    if !is_identifier(key_param) {
        return Err(format!(
            "first parameter of '{}' is not a plain identifier: {key_param}",
            site.name
        ));
    }

    let name = &site.name;
    let params = site.parameter_list();
    let body = site.body();
    let key = format!("{cache}_k");
    let result = format!("{cache}_r");

    Ok(format!(
        "var {cache}={cache}||{{k:\"\",v:null}};\
         function {name}({params}){{\
         {cache}||({cache}={{k:\"\",v:null}});\
         var {key}={key_param};\
         if({cache}.k==={key}&&{cache}.v!==null)return {cache}.v;\
         var {result}=(function(){{{body}}}).apply(this,arguments);\
         {cache}.k={key};\
         {cache}.v={result};\
         return {result}}}"
    ))
}

/// Memoize the function that owns an anchor.
pub struct MemoizeRule {
    id: String,
    anchor: AnchorPattern,
    cache: String,
    locator: Box<dyn FunctionLocator>,
}

impl MemoizeRule {
    pub fn new(
        id: impl Into<String>,
        anchor: AnchorPattern,
        cache: impl Into<String>,
        locator: Box<dyn FunctionLocator>,
    ) -> Self {
        Self {
            id: id.into(),
            anchor,
            cache: cache.into(),
            locator,
        }
    }
}

impl RewriteRule for MemoizeRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn marker(&self) -> &str {
        &self.cache
    }

    fn plan(&self, doc: &Document) -> Result<Plan, RuleError> {
        let site = match locate(doc, &self.anchor, self.locator.as_ref())? {
            Located::Found(site) => site,
            Located::NoAnchor => {
                return Ok(Plan::not_found(format!(
                    "could not find pattern {}",
                    self.anchor.tokens().join(" .. ")
                )))
            }
            Located::NoEnclosingFunction { anchor } => {
                return Ok(Plan::not_found(format!(
                    "could not find enclosing function for pattern at byte {}",
                    anchor.start
                )))
            }
        };

        let replacement = match memoize_wrapper(&site, &self.cache) {
            Ok(text) => text,
            Err(reason) => return Ok(Plan::not_found(reason)),
        };

        let summary = format!(
            "patched function '{}' ({} -> {} chars)",
            site.name,
            site.text.len(),
            replacement.len()
        );

        Ok(Plan::Edits {
            edits: vec![Edit::new(
                site.byte_start,
                site.byte_end,
                replacement,
                &site.text,
            )],
            summary,
        })
    }
}
