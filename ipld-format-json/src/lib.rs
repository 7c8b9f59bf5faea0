use std::collections::HashSet;

use base64::Engine as _;
use ipld_data_model::{Format, Link, Node as IpldNode, ParseError, Span};
use tree_sitter::{Node, Parser};

mod encode;

pub use encode::DagJsonView;

/// DAG-JSON: plain JSON plus `{"/": "<cid>"}` for links and
/// `{"/": {"bytes": "<base64>"}}` for byte strings.
pub struct DagJson;

impl Format for DagJson {
    fn decode(&self, source: &str, filename: &str) -> Result<IpldNode, Vec<ParseError>> {
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(tree_sitter_json::language()) {
            return Err(vec![ParseError {
                message: format!("Failed to load JSON grammar: {e}"),
                span: whole_source(source, filename),
            }]);
        }

        let Some(tree) = parser.parse(source, None) else {
            return Err(vec![ParseError {
                message: "Failed to parse json: parser gave up".to_owned(),
                span: whole_source(source, filename),
            }]);
        };
        let root_node = tree.root_node();

        if root_node.has_error() {
            let error_node = first_error(root_node).unwrap_or(root_node);
            log::debug!(
                "syntax error in {filename} at {}..{}",
                error_node.start_byte(),
                error_node.end_byte()
            );
            return Err(vec![ParseError {
                message: "Failed to parse json: syntax error".to_owned(),
                span: make_span(&error_node, filename),
            }]);
        }

        let mut errors = Vec::new();
        let result = parse_document(&root_node, source, filename, &mut errors);

        match result {
            Some(node) if errors.is_empty() => Ok(node),
            _ if !errors.is_empty() => Err(errors),
            _ => Err(vec![ParseError {
                message: "Failed to parse json".to_owned(),
                span: whole_source(source, filename),
            }]),
        }
    }

    fn encode(&self, node: &IpldNode) -> String {
        serde_json::to_string(&DagJsonView(node)).expect("nodes with string keys always serialize")
    }
}

impl DagJson {
    pub fn encode_pretty(&self, node: &IpldNode) -> String {
        serde_json::to_string_pretty(&DagJsonView(node))
            .expect("nodes with string keys always serialize")
    }
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

/// Named children that carry data, i.e. everything except comments.
fn value_children<'t>(node: &Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn parse_document(
    node: &Node,
    source: &str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<IpldNode> {
    let values = value_children(node);
    match values.as_slice() {
        [value] => parse_value(value, source, filename, errors),
        [] => {
            errors.push(ParseError {
                message: "Expected a JSON value, found empty document".to_owned(),
                span: make_span(node, filename),
            });
            None
        }
        [_, extra, ..] => {
            errors.push(ParseError {
                message: "Unexpected trailing value".to_owned(),
                span: make_span(extra, filename),
            });
            None
        }
    }
}

fn parse_value(
    node: &Node,
    source: &str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<IpldNode> {
    match node.kind() {
        "null" => Some(IpldNode::Null),
        "false" | "true" => Some(IpldNode::Bool(node.kind() == "true")),
        "number" => parse_number(node, source, filename, errors),
        "string" => parse_string_value(node, source, filename, errors).map(IpldNode::String),
        "array" => {
            let mut items = Vec::new();
            for child in value_children(node) {
                items.push(parse_value(&child, source, filename, errors)?);
            }
            Some(IpldNode::List(items))
        }
        "object" => parse_object(node, source, filename, errors),
        _ => {
            errors.push(ParseError {
                message: format!("Unexpected node type: {}", node.kind()),
                span: make_span(node, filename),
            });
            None
        }
    }
}

fn parse_number(
    node: &Node,
    source: &str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<IpldNode> {
    let text = node_text(node, source, filename, errors)?;
    let result = if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>()
            .map(IpldNode::Float)
            .map_err(|e| e.to_string())
    } else {
        text.parse::<i64>()
            .map(IpldNode::Int)
            .map_err(|e| e.to_string())
    };
    match result {
        Ok(number) => Some(number),
        Err(e) => {
            errors.push(ParseError {
                message: format!("Failed to parse number '{}': {}", text, e),
                span: make_span(node, filename),
            });
            None
        }
    }
}

fn parse_object(
    node: &Node,
    source: &str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<IpldNode> {
    let mut entries = Vec::new();
    let mut visited_keys = HashSet::new();

    for child in value_children(node) {
        if child.kind() != "pair" {
            errors.push(ParseError {
                message: format!("Unexpected node type: {}", child.kind()),
                span: make_span(&child, filename),
            });
            return None;
        }
        let key_node = child
            .child_by_field_name("key")
            .or_else(|| child.named_child(0))?;
        let value_node = child
            .child_by_field_name("value")
            .or_else(|| child.named_child(1))?;
        if key_node.kind() != "string" {
            errors.push(ParseError {
                message: format!("Expected string key, found {}", key_node.kind()),
                span: make_span(&key_node, filename),
            });
            return None;
        }
        let key = parse_string_value(&key_node, source, filename, errors)?;
        if !visited_keys.insert(key.clone()) {
            errors.push(ParseError {
                message: format!("Duplicate key {}", key),
                span: make_span(&key_node, filename),
            });
            return None;
        }
        let value = parse_value(&value_node, source, filename, errors)?;
        entries.push((key, value));
    }

    match entries.as_slice() {
        [(key, _)] if key == "/" => parse_reserved(node, entries, filename, errors),
        _ => Some(IpldNode::Map(entries)),
    }
}

/// The single-key `{"/": ...}` forms.
fn parse_reserved(
    node: &Node,
    mut entries: Vec<(String, IpldNode)>,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<IpldNode> {
    let (_, value) = entries.pop()?;
    match value {
        IpldNode::String(cid) => Some(IpldNode::Link(Link::new(cid))),
        IpldNode::Map(mut inner) if inner.len() == 1 && inner[0].0 == "bytes" => {
            let (_, encoded) = inner.pop()?;
            let IpldNode::String(encoded) = encoded else {
                errors.push(ParseError {
                    message: format!("Expected base64 String for bytes, found {}", encoded.kind()),
                    span: make_span(node, filename),
                });
                return None;
            };
            match encode::BASE64.decode(encoded.as_bytes()) {
                Ok(bytes) => Some(IpldNode::Bytes(bytes)),
                Err(e) => {
                    errors.push(ParseError {
                        message: format!("Invalid base64 in bytes: {}", e),
                        span: make_span(node, filename),
                    });
                    None
                }
            }
        }
        other => {
            errors.push(ParseError {
                message: format!(
                    "Reserved key \"/\" must hold a link String or a bytes Map, found {}",
                    other.kind()
                ),
                span: make_span(node, filename),
            });
            None
        }
    }
}

fn parse_string_value(
    node: &Node,
    source: &str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<String> {
    let text = node_text(node, source, filename, errors)?;
    match serde_json::from_str::<String>(text) {
        Ok(s) => Some(s),
        Err(e) => {
            errors.push(ParseError {
                message: format!("Invalid string literal: {}", e),
                span: make_span(node, filename),
            });
            None
        }
    }
}

fn node_text<'s>(
    node: &Node,
    source: &'s str,
    filename: &str,
    errors: &mut Vec<ParseError>,
) -> Option<&'s str> {
    match node.utf8_text(source.as_bytes()) {
        Ok(text) => Some(text),
        Err(e) => {
            errors.push(ParseError {
                message: format!("Invalid UTF-8: {}", e),
                span: make_span(node, filename),
            });
            None
        }
    }
}

fn make_span(node: &Node, filename: &str) -> Span {
    Span {
        filename: filename.to_string(),
        start: node.start_byte(),
        end: node.end_byte(),
    }
}

fn whole_source(source: &str, filename: &str) -> Span {
    Span {
        filename: filename.to_string(),
        start: 0,
        end: source.len(),
    }
}
