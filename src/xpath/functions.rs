//! XPath 1.0 Core Function Library
//!
//! Node-set, string, boolean and number functions. Arity is validated when
//! the expression is parsed, so the implementations can index their
//! arguments; type mismatches are reported as `Error::XPathType`.

use super::eval::EvalContext;
use super::value::{string_to_number, XPathValue};
use crate::dom::{DocumentAccess, NodeId, NodeKind};
use crate::error::{Error, Result};

/// `(min, max)` argument count of a core function, `None` if unknown
pub fn arity(name: &str) -> Option<(usize, Option<usize>)> {
    let bounds = match name {
        "last" | "position" | "true" | "false" => (0, Some(0)),
        "count" | "id" | "boolean" | "not" | "lang" | "sum" | "floor" | "ceiling" | "round" => (1, Some(1)),
        "local-name" | "namespace-uri" | "name" | "string" | "string-length" | "normalize-space" | "number" => {
            (0, Some(1))
        }
        "starts-with" | "contains" | "substring-before" | "substring-after" => (2, Some(2)),
        "substring" => (2, Some(3)),
        "translate" => (3, Some(3)),
        "concat" => (2, None),
        _ => return None,
    };
    Some(bounds)
}

/// Call a core function
pub fn call<D: DocumentAccess>(name: &str, args: Vec<XPathValue>, ctx: &EvalContext<'_, D>) -> Result<XPathValue> {
    let doc = ctx.doc;
    let value = match name {
        // Node-set functions
        "last" => XPathValue::Number(ctx.context_size as f64),
        "position" => XPathValue::Number(ctx.context_position as f64),
        "count" => XPathValue::Number(nodeset_arg(&args[0], name)?.len() as f64),
        "id" => fn_id(&args[0], doc),
        "local-name" => {
            let local = optional_node(&args, ctx, name)?.and_then(|n| doc.local_name_of(n));
            XPathValue::String(local.unwrap_or("").to_string())
        }
        "namespace-uri" => {
            let uri = optional_node(&args, ctx, name)?.and_then(|n| doc.namespace_uri_of(n));
            XPathValue::String(uri.unwrap_or("").to_string())
        }
        "name" => {
            let qname = optional_node(&args, ctx, name)?.and_then(|n| doc.name_of(n));
            XPathValue::String(qname.unwrap_or("").to_string())
        }

        // String functions
        "string" => XPathValue::String(string_arg_or_context(&args, ctx)),
        "concat" => XPathValue::String(args.iter().map(|a| a.to_string_value(doc)).collect()),
        "starts-with" => {
            let (s, prefix) = two_strings(&args, doc);
            XPathValue::Boolean(s.starts_with(&prefix))
        }
        "contains" => {
            let (s, pattern) = two_strings(&args, doc);
            XPathValue::Boolean(s.contains(&pattern))
        }
        "substring-before" => {
            let (s, pattern) = two_strings(&args, doc);
            let before = s.find(&pattern).map(|pos| &s[..pos]).unwrap_or("");
            XPathValue::String(before.to_string())
        }
        "substring-after" => {
            let (s, pattern) = two_strings(&args, doc);
            let after = s.find(&pattern).map(|pos| &s[pos + pattern.len()..]).unwrap_or("");
            XPathValue::String(after.to_string())
        }
        "substring" => fn_substring(&args, doc),
        "string-length" => XPathValue::Number(string_arg_or_context(&args, ctx).chars().count() as f64),
        "normalize-space" => {
            let s = string_arg_or_context(&args, ctx);
            let normalized = s
                .split([' ', '\t', '\r', '\n'])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            XPathValue::String(normalized)
        }
        "translate" => fn_translate(&args, doc),

        // Boolean functions
        "boolean" => XPathValue::Boolean(args[0].to_boolean()),
        "not" => XPathValue::Boolean(!args[0].to_boolean()),
        "true" => XPathValue::Boolean(true),
        "false" => XPathValue::Boolean(false),
        "lang" => fn_lang(&args[0].to_string_value(doc), doc, ctx.context_node),

        // Number functions
        "number" => {
            let n = match args.first() {
                Some(arg) => arg.to_number(doc),
                None => string_to_number(&doc.string_value_of(ctx.context_node)),
            };
            XPathValue::Number(n)
        }
        "sum" => {
            let total = nodeset_arg(&args[0], name)?
                .iter()
                .map(|&n| string_to_number(&doc.string_value_of(n)))
                .sum();
            XPathValue::Number(total)
        }
        "floor" => XPathValue::Number(args[0].to_number(doc).floor()),
        "ceiling" => XPathValue::Number(args[0].to_number(doc).ceil()),
        "round" => XPathValue::Number(xpath_round(args[0].to_number(doc))),

        _ => return Err(Error::UnknownFunction(name.to_string())),
    };
    Ok(value)
}

fn nodeset_arg<'v>(arg: &'v XPathValue, function: &str) -> Result<&'v [NodeId]> {
    arg.as_nodeset().ok_or_else(|| {
        Error::XPathType(format!("{}() expects a node-set, got {}", function, arg.type_name()))
    })
}

/// First node of the optional node-set argument, or the context node
fn optional_node<D: DocumentAccess>(
    args: &[XPathValue],
    ctx: &EvalContext<'_, D>,
    function: &str,
) -> Result<Option<NodeId>> {
    match args.first() {
        Some(arg) => Ok(nodeset_arg(arg, function)?.first().copied()),
        None => Ok(Some(ctx.context_node)),
    }
}

fn string_arg_or_context<D: DocumentAccess>(args: &[XPathValue], ctx: &EvalContext<'_, D>) -> String {
    match args.first() {
        Some(arg) => arg.to_string_value(ctx.doc),
        None => ctx.doc.string_value_of(ctx.context_node),
    }
}

fn two_strings<D: DocumentAccess>(args: &[XPathValue], doc: &D) -> (String, String) {
    (args[0].to_string_value(doc), args[1].to_string_value(doc))
}

/// Characters at positions p with round(start) <= p < round(start) + round(len)
fn fn_substring<D: DocumentAccess>(args: &[XPathValue], doc: &D) -> XPathValue {
    let s = args[0].to_string_value(doc);
    let start = xpath_round(args[1].to_number(doc));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(len.to_number(doc)),
        None => f64::INFINITY,
    };
    let result = s
        .chars()
        .enumerate()
        .filter(|(i, _)| {
            let position = (*i + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect();
    XPathValue::String(result)
}

fn fn_translate<D: DocumentAccess>(args: &[XPathValue], doc: &D) -> XPathValue {
    let s = args[0].to_string_value(doc);
    let from: Vec<char> = args[1].to_string_value(doc).chars().collect();
    let to: Vec<char> = args[2].to_string_value(doc).chars().collect();

    let result = s
        .chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect();
    XPathValue::String(result)
}

/// Elements whose ID matches one of the whitespace-separated tokens.
///
/// Without DTD processing the ID attributes are `xml:id`, plus `id` in
/// HTML documents.
fn fn_id<D: DocumentAccess>(arg: &XPathValue, doc: &D) -> XPathValue {
    let source = match arg {
        XPathValue::NodeSet(nodes) => nodes
            .iter()
            .map(|&n| doc.string_value_of(n))
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string_value(doc),
    };
    let wanted: Vec<&str> = source.split_ascii_whitespace().collect();
    if wanted.is_empty() {
        return XPathValue::empty_nodeset();
    }

    let html = doc.is_html_document();
    let matches = doc
        .descendants_vec(doc.document_node_id())
        .into_iter()
        .filter(|&id| doc.node_kind_of(id) == Some(NodeKind::Element))
        .filter(|&id| {
            let value = doc
                .get_attribute(id, "xml:id")
                .or_else(|| if html { doc.get_attribute(id, "id") } else { None });
            value.is_some_and(|v| wanted.contains(&v))
        })
        .collect();
    XPathValue::NodeSet(matches)
}

/// `lang()`: nearest `xml:lang` (or `lang` in HTML) on the ancestor-or-self
/// axis equals the argument or starts with it followed by `-`
fn fn_lang<D: DocumentAccess>(target: &str, doc: &D, context: NodeId) -> XPathValue {
    let target = target.to_lowercase();
    let html = doc.is_html_document();
    let mut node = Some(context);
    while let Some(current) = node {
        let declared = doc
            .get_attribute(current, "xml:lang")
            .or_else(|| if html { doc.get_attribute(current, "lang") } else { None });
        if let Some(lang) = declared {
            let lang = lang.to_lowercase();
            let matched = lang == target
                || (lang.starts_with(&target) && lang.as_bytes().get(target.len()) == Some(&b'-'));
            return XPathValue::Boolean(matched);
        }
        node = doc.parent_of(current);
    }
    XPathValue::Boolean(false)
}

/// XPath round(): nearest integer, halves towards positive infinity
pub fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return n;
    }
    let rounded = (n + 0.5).floor();
    // -0.5 <= n < 0 rounds to negative zero
    if rounded == 0.0 && n < 0.0 {
        -0.0
    } else {
        rounded
    }
}
