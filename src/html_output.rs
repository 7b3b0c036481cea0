//! HTML rendering of the granular time report
//!
//! Rich visual companion to the JSON file: one styled table per test case
//! with embedded CSS, written alongside the structured report.

use crate::aggregate::{format_elapsed, TimeReport};
use std::path::Path;

/// Default HTML report file name, written into the work directory.
pub const HTML_REPORT_FILE_NAME: &str = "granular_time_report.html";

/// HTML report renderer.
#[derive(Debug, Default)]
pub struct HtmlReport;

impl HtmlReport {
    /// Escape HTML special characters to prevent XSS
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    /// Generate embedded CSS styles
    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1, h2 {
            color: #333;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            margin-bottom: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: left;
        }
        th {
            background-color: #4a90d9;
            color: white;
            font-weight: bold;
        }
        tr:nth-child(even) {
            background-color: #f9f9f9;
        }
        tr:hover {
            background-color: #f0f0f0;
        }
        .operation {
            color: #0066cc;
            font-weight: bold;
            font-family: monospace;
        }
        .elapsed {
            font-family: monospace;
            color: #666;
        }
        .tag-non-infra {
            color: #cc6600;
        }
        .totals-table th {
            background-color: #5cb85c;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    fn format_test_section(identity: &str, entry: &crate::aggregate::TestTimeReport) -> String {
        let mut html = String::new();
        html.push_str(&format!("<h2>{}</h2>\n", Self::escape_html(identity)));
        html.push_str("<table>\n");
        html.push_str(
            "<tr><th>Category</th><th>Operation</th><th>Total (&micro;s)</th>\
             <th>Occurrences</th><th>Type</th></tr>\n",
        );

        for (category, folded) in &entry.categories {
            for (key, agg) in folded {
                let tag = agg.tag.map(|t| t.as_str()).unwrap_or("-");
                let tag_class = if tag == "non-infra" {
                    " class=\"tag-non-infra\""
                } else {
                    ""
                };
                html.push_str(&format!(
                    "<tr><td>{}</td><td class=\"operation\">{}</td>\
                     <td class=\"elapsed\">{}</td><td>{}</td><td{}>{}</td></tr>\n",
                    category,
                    Self::escape_html(key),
                    format_elapsed(agg.total_us),
                    agg.count,
                    tag_class,
                    tag,
                ));
            }
        }
        html.push_str("</table>\n");

        let totals = &entry.totals;
        html.push_str("<table class=\"totals-table\">\n");
        html.push_str(
            "<tr><th>Total sleep</th><th>Total set</th><th>Total get</th>\
             <th>Total bash</th><th>Total time</th></tr>\n",
        );
        html.push_str(&format!(
            "<tr><td class=\"elapsed\">{}</td><td class=\"elapsed\">{}</td>\
             <td class=\"elapsed\">{}</td><td class=\"elapsed\">{}</td>\
             <td class=\"elapsed\">{}</td></tr>\n",
            format_elapsed(totals.sleep_time_us),
            format_elapsed(totals.set_command_us),
            format_elapsed(totals.get_command_us),
            format_elapsed(totals.bash_time_us),
            format_elapsed(totals.total_time_us),
        ));
        html.push_str("</table>\n");
        html
    }

    /// Render the complete HTML document.
    pub fn render(report: &TimeReport) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str("<title>Granular Time Report</title>\n");
        html.push_str(&format!("<style>{}</style>\n", Self::generate_styles()));
        html.push_str("</head>\n<body>\n");
        html.push_str("<h1>Granular Time Report</h1>\n");

        if report.tests.is_empty() {
            html.push_str("<p>No timing data recorded.</p>\n");
        }
        for (identity, entry) in &report.tests {
            html.push_str(&Self::format_test_section(identity.as_str(), entry));
        }

        html.push_str(&format!(
            "<div class=\"footer\">Generated by timegrain v{}</div>\n",
            env!("CARGO_PKG_VERSION")
        ));
        html.push_str("</body>\n</html>\n");
        html
    }

    /// Write the rendered document alongside the structured report.
    pub fn write_to(report: &TimeReport, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, Self::render(report))?;
        Ok(())
    }
}
