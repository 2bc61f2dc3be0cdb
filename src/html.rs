use std::fmt::Write;

use crate::models::Table;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Info,
    Warning,
    Error,
}

impl Notice {
    fn class(&self) -> &'static str {
        match self {
            Notice::Success => "success",
            Notice::Info => "info",
            Notice::Warning => "warning",
            Notice::Error => "error",
        }
    }
}

pub fn notice(out: &mut String, kind: Notice, message: &str) {
    let _ = writeln!(
        out,
        r#"<div class="notice {}">{}</div>"#,
        kind.class(),
        escape(message)
    );
}

pub fn table(out: &mut String, table: &Table) {
    let _ = writeln!(out, "<table>");
    let _ = write!(out, "<thead><tr><th></th>");
    for column in &table.columns {
        let _ = write!(out, "<th>{}</th>", escape(column));
    }
    let _ = writeln!(out, "</tr></thead>");
    let _ = writeln!(out, "<tbody>");
    for (i, row) in table.rows.iter().enumerate() {
        let _ = write!(out, "<tr><td class=\"index\">{i}</td>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", escape(cell));
        }
        let _ = writeln!(out, "</tr>");
    }
    let _ = writeln!(out, "</tbody></table>");
}

/// Wraps a body in the shared page chrome with navigation between the two pages.
pub fn page(title: &str, body: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>");
    let _ = writeln!(out, r#"<html lang="en"><head><meta charset="utf-8">"#);
    let _ = writeln!(out, "<title>{}</title>", escape(title));
    let _ = writeln!(out, "<style>{STYLE}</style></head><body>");
    let _ = writeln!(
        out,
        r#"<nav><a href="/">Survey</a> | <a href="/visuals">Visuals</a></nav>"#
    );
    let _ = writeln!(out, "<main>");
    out.push_str(body);
    let _ = writeln!(out, "</main></body></html>");
    out
}

const STYLE: &str = "body{font-family:sans-serif;margin:0;color:#262730}\
nav{padding:.75rem 2rem;background:#f0f2f6}\
main{max-width:960px;margin:0 auto;padding:1rem 2rem}\
table{border-collapse:collapse;margin:.5rem 0;font-size:.9rem}\
th,td{border:1px solid #ddd;padding:.25rem .5rem;text-align:left}\
td.index{color:#888}\
.notice{padding:.6rem 1rem;border-radius:.4rem;margin:.5rem 0}\
.success{background:#dff5e3}.info{background:#e1effe}\
.warning{background:#fff6d6}.error{background:#fde2e2}\
label{display:block;margin:.5rem 0}\
hr{margin:1.5rem 0}";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn table_renders_header_and_index() {
        let t = Table {
            columns: vec!["Name".to_string()],
            rows: vec![vec!["<Avery>".to_string()]],
        };
        let mut out = String::new();
        table(&mut out, &t);
        assert!(out.contains("<th>Name</th>"));
        assert!(out.contains(r#"<td class="index">0</td><td>&lt;Avery&gt;</td>"#));
    }
}
