use serde_json::Value;

use crate::client::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Human,
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

pub fn print_error(err: &ClientError, mode: OutputMode) {
    match (mode, err) {
        (OutputMode::Json, ClientError::Api(resp)) => match serde_json::to_string(resp) {
            Ok(s) => eprintln!("{s}"),
            Err(_) => eprintln!("error: {err}"),
        },
        (OutputMode::Json, ClientError::Transport(msg)) => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
        (OutputMode::Human, _) => eprintln!("error: {err}"),
    }
}

pub fn format_issue(value: &Value) -> String {
    let id = value["_id"].as_str().unwrap_or("?");
    let title = value["issue_title"].as_str().unwrap_or("?");
    let by = value["created_by"].as_str().unwrap_or("?");
    let state = match value["open"].as_bool() {
        Some(false) => "closed",
        _ => "open",
    };
    let assignee = match value["assigned_to"].as_str() {
        Some(a) if !a.is_empty() => a,
        _ => "-",
    };
    let mut line = format!("{id}  {state:<6} {title}  by {by}  @{assignee}");
    if let Some(status) = value["status_text"].as_str().filter(|s| !s.is_empty()) {
        line.push_str(&format!("  [{status}]"));
    }
    line
}

pub fn print_issue(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => println!("{}", format_issue(value)),
    }
}

pub fn print_issue_list(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => {
            if let Some(arr) = value.as_array() {
                if arr.is_empty() {
                    println!("(no issues)");
                } else {
                    for item in arr {
                        println!("{}", format_issue(item));
                    }
                }
            }
        }
    }
}

/// Update and delete answer with `{result, _id}`.
pub fn print_result(value: &Value, mode: OutputMode) {
    match mode {
        OutputMode::Json => print_json(value),
        OutputMode::Human => {
            let result = value["result"].as_str().unwrap_or("?");
            let id = value["_id"].as_str().unwrap_or("?");
            println!("{result}: {id}");
        }
    }
}
