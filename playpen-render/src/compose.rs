//! Askama composition of the executable document.

use crate::interceptor::INTERCEPTOR_SOURCE;
use askama::Template;
use playpen_types::{CodeFragment, ComposedDocument, FragmentKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Failed to render document: {0}")]
    Render(#[from] askama::Error),
}

/// Executable document template
///
/// Sections always appear in this order: style, markup, interceptor, guarded
/// user script.
#[derive(Template)]
#[template(path = "document.html")]
struct DocumentTemplate<'a> {
    style: &'a str,
    markup: &'a str,
    interceptor: &'a str,
    guarded_script: &'a str,
}

/// Compose a document from a set of fragments
///
/// A kind missing from `fragments` is treated as empty. If a kind appears
/// more than once, the last occurrence wins.
pub fn compose<'a, I>(fragments: I) -> Result<ComposedDocument, ComposeError>
where
    I: IntoIterator<Item = &'a CodeFragment>,
{
    let mut values: [&str; 3] = [""; 3];
    for fragment in fragments {
        values[fragment.id.index()] = fragment.value.as_str();
    }

    compose_fragments(
        values[FragmentKind::Markup.index()],
        values[FragmentKind::Style.index()],
        values[FragmentKind::Script.index()],
    )
}

/// Compose a document from the three fragment texts
pub fn compose_fragments(
    markup: &str,
    style: &str,
    script: &str,
) -> Result<ComposedDocument, ComposeError> {
    let guarded_script = guard_script(script);
    let template = DocumentTemplate {
        style,
        markup,
        interceptor: INTERCEPTOR_SOURCE,
        guarded_script: &guarded_script,
    };

    Ok(ComposedDocument::new(template.render()?))
}

/// Wrap user script in a catch-all guard
///
/// The source is embedded as a string literal and run through indirect
/// `eval`, so syntax errors are caught like runtime errors and declarations
/// still land in global scope. A caught value is reported as a logged
/// `'error'` marker followed by `console.error(e)`.
pub fn guard_script(script: &str) -> String {
    let body = if script.is_empty() {
        String::new()
    } else {
        format!(" (0, eval)({}) ", script_literal(script))
    };

    format!("try {{{body}}} catch (e) {{ console.log('error'); console.error(e) }}")
}

/// JSON string literal that cannot close the surrounding script element
fn script_literal(script: &str) -> String {
    serde_json::Value::String(script.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
