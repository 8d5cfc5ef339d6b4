use once_cell::sync::Lazy;
use regex::Regex;
use sqlformat::{FormatOptions, Indent, QueryParams};

use crate::models::structs::CompiledQuery;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LintSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct LintMessage {
    pub severity: LintSeverity,
    pub message: String,
    pub hint: Option<String>,
}

static INLINED_STRING_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bIN\s*\(\s*N?'").expect("valid inlined list regex"));

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let hay_lower = haystack.to_ascii_lowercase();
    let needle_lower = needle.to_ascii_lowercase();
    hay_lower.find(&needle_lower)
}

/// Review a compiled query for patterns worth a second look.
pub fn lint_compiled(compiled: &CompiledQuery) -> Vec<LintMessage> {
    let mut messages = Vec::new();
    let sql = compiled.sql.trim();
    if sql.is_empty() {
        return messages;
    }

    if find_case_insensitive(sql, "SELECT *").is_some() {
        messages.push(LintMessage {
            severity: LintSeverity::Info,
            message: "Query selects every column.".to_string(),
            hint: Some("Pass an explicit select list to narrow the payload.".to_string()),
        });
    }

    if INLINED_STRING_LIST.is_match(sql) {
        messages.push(LintMessage {
            severity: LintSeverity::Warning,
            message: "IN list inlines string literals instead of binding parameters.".to_string(),
            hint: Some("Only pass trusted values to in_list(), or filter through a subquery.".to_string()),
        });
    }

    if compiled.positional {
        let slots = sql.matches('?').count();
        if slots != compiled.parameters.len() {
            messages.push(LintMessage {
                severity: LintSeverity::Error,
                message: format!(
                    "{} positional placeholders for {} parameters.",
                    slots,
                    compiled.parameters.len()
                ),
                hint: None,
            });
        }
        return messages;
    }

    for p in &compiled.parameters {
        if !sql.contains(&p.name) {
            messages.push(LintMessage {
                severity: LintSeverity::Error,
                message: format!("Parameter {} does not appear in the SQL text.", p.name),
                hint: None,
            });
        }
    }

    messages
}

/// Multi-line rendering of compiled SQL for logs and the CLI.
pub fn pretty_print(sql: &str) -> String {
    sqlformat::format(sql, &QueryParams::None, &default_sqlformat_options())
}

// Centralized sqlformat options used across the crate
pub fn default_sqlformat_options() -> FormatOptions<'static> {
    FormatOptions {
        joins_as_top_level: true,
        indent: Indent::Spaces(4),
        uppercase: Some(true),
        lines_between_queries: 2,
        inline: false,
        max_inline_block: 50,
        max_inline_arguments: Some(40),
        max_inline_top_level: Some(40),
        ..Default::default()
    }
}
