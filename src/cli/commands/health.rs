use serde_json::Value;

use crate::cli::utils::output_value;
use crate::cli::CliContext;
use crate::http_client::HttpClientError;

/// A degraded server answers 503 with the same report it sends when
/// healthy, so that body is shown rather than treated as a failure
pub async fn handle(ctx: CliContext) -> anyhow::Result<()> {
    let report = match ctx.client()?.health().await {
        Ok(report) => report,
        Err(e) => degraded_report(&e).ok_or(e)?,
    };
    output_value(&ctx.output, &report)?;

    if report.get("status").and_then(Value::as_str) != Some("ok") {
        anyhow::bail!("Server at {} is degraded", ctx.server);
    }
    Ok(())
}

fn degraded_report(err: &HttpClientError) -> Option<Value> {
    let mut current = err;
    while let HttpClientError::Call { source, .. } = current {
        current = source;
    }
    match current {
        HttpClientError::Status { status: 503, body } => serde_json::from_str(body).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_body_is_recovered() {
        let err = HttpClientError::Status {
            status: 503,
            body: r#"{"status":"degraded","database":"down"}"#.to_string(),
        };
        let report = degraded_report(&err).unwrap();
        assert_eq!(report["database"], "down");

        let other = HttpClientError::Status { status: 500, body: "{}".to_string() };
        assert!(degraded_report(&other).is_none());
    }
}
