//! Output formatting
//!
//! Plain line output for `auto`, and JSON/YAML/table rendering of typed
//! results with optional JMESPath filtering.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::Table;
use jpx_core::Runtime;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

use crate::cli::OutputFormat;
use rdsctl_core::ClusterInfo;

/// Global JMESPath runtime with extended functions
static JMESPATH_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or initialize the JMESPath runtime with extended functions
pub fn get_jmespath_runtime() -> &'static Runtime {
    JMESPATH_RUNTIME.get_or_init(|| Runtime::builder().with_all_extensions().build())
}

/// Quote bare backtick literals so `` `available` `` reads as `` `"available"` ``.
///
/// JMESPath permits elided quotes inside backticks but the runtime only
/// accepts valid JSON there. Numbers, booleans, null, arrays, objects and
/// already-quoted strings are left alone.
fn normalize_backtick_literals(query: &str) -> String {
    static BACKTICK_RE: OnceLock<Regex> = OnceLock::new();
    let re = BACKTICK_RE.get_or_init(|| {
        Regex::new(r"`([^`\\]*(?:\\.[^`\\]*)*)`").unwrap()
    });

    re.replace_all(query, |caps: &regex::Captures| {
        let content = &caps[1];
        let trimmed = content.trim();

        if serde_json::from_str::<Value>(trimmed).is_ok() {
            format!("`{}`", content)
        } else {
            let escaped = trimmed.replace('\\', "\\\\").replace('"', "\\\"");
            format!("`\"{}\"`", escaped)
        }
    })
    .into_owned()
}

/// Compile a JMESPath expression using the extended runtime
pub fn compile_jmespath(
    query: &str,
) -> Result<jpx_core::Expression<'static>, jpx_core::JmespathError> {
    let normalized = normalize_backtick_literals(query);
    get_jmespath_runtime().compile(&normalized)
}

pub fn print_output<T: Serialize>(
    data: T,
    format: OutputFormat,
    query: Option<&str>,
) -> Result<()> {
    let mut json_value = serde_json::to_value(data)?;

    if let Some(query_str) = query {
        let expr = compile_jmespath(query_str)
            .with_context(|| format!("Invalid JMESPath expression: {}", query_str))?;
        json_value = expr.search(&json_value).context("JMESPath query failed")?;
    }

    match format {
        OutputFormat::Auto | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&json_value)?);
        }
        OutputFormat::Table => {
            print_as_table(&json_value)?;
        }
    }

    Ok(())
}

fn print_as_table(value: &Value) -> Result<()> {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            let mut table = Table::new();

            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            println!("{}", table);
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_value(val)]);
            }

            println!("{}", table);
        }
        _ => {
            println!("{}", format_value(value));
        }
    }

    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

/// Column header of the plain cluster listing
pub const CLUSTER_HEADER: &str = "DBClusterIdentifier, Status, Engine, ClusterCreateTime";

/// `2021-07-29-13:39:32`, or empty when the time is unknown
pub fn format_create_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d-%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Lines of the plain `cluster list` output
///
/// The header is left out when `no_header` is set or there is nothing to list.
pub fn format_cluster_rows(clusters: &[ClusterInfo], no_header: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(clusters.len() + 1);
    if !no_header && !clusters.is_empty() {
        lines.push(CLUSTER_HEADER.to_string());
    }
    lines.extend(clusters.iter().map(|c| {
        format!(
            "{}, {}, {}, {}",
            c.identifier,
            c.status,
            c.engine,
            format_create_time(c.create_time)
        )
    }));
    lines
}

/// Print plain lines in `auto` mode without a query, otherwise render `data`
pub fn print_lines_or<T: Serialize>(
    lines: &[String],
    data: T,
    format: OutputFormat,
    query: Option<&str>,
) -> Result<()> {
    if format == OutputFormat::Auto && query.is_none() {
        for line in lines {
            println!("{}", line);
        }
        return Ok(());
    }
    print_output(data, format, query)
}
