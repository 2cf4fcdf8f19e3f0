use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use adsprims_client::Notification;
use adsprims_types::{TypeNode, Value};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

#[derive(Serialize)]
struct ValueOutput<'a> {
    path: &'a str,
    value: &'a Value,
}

pub fn print_value(path: &str, value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ValueOutput { path, value }),
        OutputFormat::Table => {
            let mut rows = Vec::new();
            flatten_value(path, value, &mut rows);
            let mut table = new_table(vec!["PATH", "VALUE"]);
            for (path, value) in rows {
                table.add_row(vec![path, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{path} = {}", compact(value)),
    }
}

#[derive(Serialize)]
struct SampleOutput<'a> {
    path: &'a str,
    handle: u32,
    timestamp: String,
    value: Option<&'a Value>,
    size: usize,
}

pub fn print_sample(path: &str, sample: &Notification, format: OutputFormat) {
    let timestamp = unix_seconds(sample.timestamp);
    match format {
        OutputFormat::Json => print_json(&SampleOutput {
            path,
            handle: sample.handle,
            timestamp,
            value: sample.value.as_ref(),
            size: sample.raw.len(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => {
            let value = sample
                .value
                .as_ref()
                .map(compact)
                .unwrap_or_else(|| format!("<{} bytes>", sample.raw.len()));
            println!("[{timestamp}] {path} = {value}");
        }
    }
}

pub fn print_type(path: &str, node: &TypeNode, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(node),
        OutputFormat::Table => {
            let mut table = new_table(vec!["MEMBER", "TYPE", "OFFSET", "SIZE"]);
            let mut rows = Vec::new();
            flatten_type(path, node, 0, &mut rows);
            for row in rows {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{path} : {} ({} bytes)", node.type_name, size_text(node));
            print_members(node, 1);
        }
    }
}

fn print_members(node: &TypeNode, depth: usize) {
    for member in &node.sub_items {
        println!(
            "{:indent$}+{} {} : {} ({} bytes)",
            "",
            member.offset,
            member.name,
            member.type_name,
            size_text(member),
            indent = depth * 2
        );
        print_members(member, depth + 1);
    }
    for value in &node.enum_values {
        println!("{:indent$}{} = {}", "", value.name, value.value, indent = depth * 2);
    }
}

fn flatten_type(path: &str, node: &TypeNode, base: u32, rows: &mut Vec<Vec<String>>) {
    let offset = base + node.offset;
    rows.push(vec![
        path.to_string(),
        node.type_name.clone(),
        offset.to_string(),
        size_text(node),
    ]);
    for member in &node.sub_items {
        flatten_type(&format!("{path}.{}", member.name), member, offset, rows);
    }
}

fn flatten_value(path: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Struct(members) => {
            for (name, member) in members {
                flatten_value(&format!("{path}.{name}"), member, rows);
            }
        }
        Value::Array(items) if items.iter().any(|v| matches!(v, Value::Struct(_) | Value::Array(_))) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(&format!("{path}[{i}]"), item, rows);
            }
        }
        leaf => rows.push((path.to_string(), compact(leaf))),
    }
}

fn size_text(node: &TypeNode) -> String {
    node.byte_size()
        .map_or_else(|| "overflow".to_string(), |size| size.to_string())
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "?".to_string())
}

fn unix_seconds(time: SystemTime) -> String {
    time.duration_since(UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use super::*;

    #[test]
    fn flatten_nested_values() {
        let mut inner = BTreeMap::new();
        inner.insert("x".to_string(), Value::Real(1.5));
        let mut outer = BTreeMap::new();
        outer.insert("flag".to_string(), Value::Bool(true));
        outer.insert(
            "points".to_string(),
            Value::Array(vec![Value::Struct(inner.clone()), Value::Struct(inner)]),
        );
        outer.insert(
            "raw".to_string(),
            Value::Array(vec![Value::Int(1), Value::Int(2)]),
        );

        let mut rows = Vec::new();
        flatten_value("MAIN.st", &Value::Struct(outer), &mut rows);
        assert_eq!(
            rows,
            vec![
                ("MAIN.st.flag".to_string(), "true".to_string()),
                ("MAIN.st.points[0].x".to_string(), "1.5".to_string()),
                ("MAIN.st.points[1].x".to_string(), "1.5".to_string()),
                ("MAIN.st.raw".to_string(), "[1,2]".to_string()),
            ]
        );
    }

    #[test]
    fn unix_seconds_has_millis() {
        let t = UNIX_EPOCH + Duration::from_millis(1_700_000_000_042);
        assert_eq!(unix_seconds(t), "1700000000.042");
    }
}
