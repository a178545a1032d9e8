use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;

use super::descriptor::{ClientDescriptor, MethodDescriptor, ParamRole, Verb};
use super::HttpClientError;

/// A concrete request built from a method descriptor and call arguments
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub verb: Verb,
    pub stream: bool,
    /// Path with placeholders substituted, relative to the service base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

/// Interpret `method` against positional `args`. `Value::Null` (or a
/// missing trailing argument) stands for "not provided".
pub fn build_request(
    descriptor: &ClientDescriptor,
    method: &MethodDescriptor,
    args: &[Value],
) -> Result<PreparedRequest, HttpClientError> {
    let arg = |index: usize| args.get(index).filter(|v| !v.is_null());

    let mut path_values: HashMap<&str, String> = HashMap::new();
    let mut query = Vec::new();
    let mut header_params = Vec::new();
    let mut header_bag = None;
    let mut body = None;

    for (index, role) in method.params.iter().enumerate() {
        let Some(value) = arg(index) else {
            continue;
        };
        match role {
            ParamRole::Path(name) => {
                path_values.insert(name.as_str(), scalar_to_string(value));
            }
            ParamRole::Query(Some(name)) => push_query(&mut query, name, value),
            ParamRole::Query(None) => {
                if let Value::Object(fields) = value {
                    for (name, value) in fields.iter().filter(|(_, v)| !v.is_null()) {
                        push_query(&mut query, name, value);
                    }
                }
            }
            ParamRole::Body => body = Some(value.clone()),
            ParamRole::Header(name) => header_params.push((name.as_str(), scalar_to_string(value))),
            ParamRole::Headers => header_bag = Some(value),
        }
    }

    let path = render_path(&method.path, &path_values)?;

    // Descriptor defaults, then single headers, then the header bag on top
    let mut headers = HeaderMap::new();
    for (name, value) in &descriptor.headers {
        insert_header(&mut headers, name, value)?;
    }
    for (name, value) in header_params {
        insert_header(&mut headers, name, &value)?;
    }
    if let Some(Value::Object(fields)) = header_bag {
        for (name, value) in fields.iter().filter(|(_, v)| !v.is_null()) {
            insert_header(&mut headers, name, &scalar_to_string(value))?;
        }
    }

    Ok(PreparedRequest {
        verb: method.verb,
        stream: method.stream,
        path,
        query,
        headers,
        body,
    })
}

/// Strings verbatim, everything else as its JSON text
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_query(query: &mut Vec<(String, String)>, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items.iter().filter(|v| !v.is_null()) {
                query.push((name.to_string(), scalar_to_string(item)));
            }
        }
        other => query.push((name.to_string(), scalar_to_string(other))),
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), HttpClientError> {
    let invalid = |reason: String| HttpClientError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    headers.insert(header_name, header_value);
    Ok(())
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

enum Segment<'a> {
    Literal(&'a str),
    Placeholder(&'a str),
}

/// Split a template into literals and `:name` / `{name}` placeholders.
/// A `:` not followed by an identifier (ports, `://`) is literal.
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut literal_start = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let placeholder = match c {
            ':' => {
                let start = i + 1;
                if template[start..].chars().next().is_some_and(is_ident_start) {
                    let len = template[start..].chars().take_while(|c| is_ident_char(*c)).count();
                    Some((i, start, start + len, start + len))
                } else {
                    None
                }
            }
            '{' => {
                let start = i + 1;
                template[start..].find('}').and_then(|rel| {
                    let name = &template[start..start + rel];
                    let valid = name.chars().next().is_some_and(is_ident_start) && name.chars().all(is_ident_char);
                    valid.then_some((i, start, start + rel, start + rel + 1))
                })
            }
            _ => None,
        };

        if let Some((open, name_start, name_end, close)) = placeholder {
            if open > literal_start {
                out.push(Segment::Literal(&template[literal_start..open]));
            }
            out.push(Segment::Placeholder(&template[name_start..name_end]));
            literal_start = close;
            while chars.peek().is_some_and(|(j, _)| *j < close) {
                chars.next();
            }
        }
    }

    if literal_start < template.len() {
        out.push(Segment::Literal(&template[literal_start..]));
    }
    out
}

/// Names of every placeholder in a path template
pub fn placeholders(template: &str) -> Vec<String> {
    segments(template)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.to_string()),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Substitute URL-encoded values for every placeholder; any placeholder
/// without a value is an error rather than being left in the URL.
pub fn render_path(template: &str, values: &HashMap<&str, String>) -> Result<String, HttpClientError> {
    let mut path = String::with_capacity(template.len());
    for segment in segments(template) {
        match segment {
            Segment::Literal(text) => path.push_str(text),
            Segment::Placeholder(name) => {
                let value = values
                    .get(name)
                    .ok_or_else(|| HttpClientError::MissingPathParam(name.to_string()))?;
                path.push_str(&urlencoding::encode(value));
            }
        }
    }
    Ok(path)
}

/// Join a base URL and a relative path the way browsers' HTTP clients do;
/// absolute paths pass through untouched.
pub fn resolve_url(base_url: Option<&str>, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    match base_url {
        Some(base) if !base.is_empty() => {
            if path.is_empty() {
                base.to_string()
            } else {
                format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
            }
        }
        _ => path.to_string(),
    }
}
