use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::http_client::HttpClientError;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            if let Some(data_value) = data {
                print_text(&data_value, 0);
            }
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str) {
    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": false,
                "error": message
            });
            println!("{}", response);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
}

/// Print arbitrary response data
pub fn output_value(output_format: &OutputFormat, value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => print_text(value, 0),
    }
    Ok(())
}

fn print_text(value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(fields) => {
            for (key, field) in fields {
                match field {
                    Value::Object(_) | Value::Array(_) => {
                        println!("{}{}:", pad, key);
                        print_text(field, indent + 1);
                    }
                    other => println!("{}{}: {}", pad, key, scalar(other)),
                }
            }
        }
        Value::Array(items) if items.is_empty() => println!("{}(none)", pad),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 && item.is_object() {
                    println!("{}--", pad);
                }
                print_text(item, indent);
            }
        }
        other => println!("{}{}", pad, scalar(other)),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Best human-readable message for a failed command: the server's own
/// `message` when it sent an error envelope, the transport error otherwise
pub fn describe_error(err: &anyhow::Error) -> String {
    let Some(client_err) = err.downcast_ref::<HttpClientError>() else {
        return err.to_string();
    };

    let mut current = client_err;
    while let HttpClientError::Call { source, .. } = current {
        current = source;
    }

    if let HttpClientError::Status { status, body } = current {
        if let Some(message) = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        {
            return format!("{} ({})", message, status);
        }
    }
    client_err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::Verb;

    #[test]
    fn server_message_is_preferred() {
        let err = anyhow::Error::new(HttpClientError::Call {
            service: "admin-api".to_string(),
            verb: Verb::Post,
            url: "/auth/login".to_string(),
            source: Box::new(HttpClientError::Status {
                status: 401,
                body: r#"{"statusCode":401,"message":"Invalid credentials"}"#.to_string(),
            }),
        });
        assert_eq!(describe_error(&err), "Invalid credentials (401)");
    }

    #[test]
    fn other_errors_pass_through() {
        let err = anyhow::anyhow!("not logged in");
        assert_eq!(describe_error(&err), "not logged in");
    }
}
