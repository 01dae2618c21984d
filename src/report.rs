// SPDX-License-Identifier: MIT
//! Optional report files: `report_{engine}_{browser}.json` / `.html`.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

pub fn report_basename(engine: &str, browser: &str) -> String {
    format!("report_{engine}_{browser}")
}

/// Write the serialized result as a pretty-printed JSON report.
pub fn write_json_report(
    dir: &Path,
    engine: &str,
    browser: &str,
    result: &Value,
) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}.json", report_basename(engine, browser)));
    let payload = serde_json::to_string_pretty(result)?;
    std::fs::write(&path, payload)?;
    Ok(path)
}

/// Write a minimal HTML report wrapping the JSON payload in a `<pre>` block.
pub fn write_html_report(
    dir: &Path,
    engine: &str,
    browser: &str,
    source: &str,
    result: &Value,
) -> io::Result<PathBuf> {
    let path = dir.join(format!("{}.html", report_basename(engine, browser)));
    let payload = serde_json::to_string_pretty(result)?;
    let html = format!(
        "<html>\n  <head><title>Report for {source}</title></head>\n  <body>\n    \
         <h1>Accessibility Report for {source}</h1>\n    <pre>{payload}</pre>\n  </body>\n</html>\n"
    );
    std::fs::write(&path, html)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_filename_convention() {
        assert_eq!(report_basename("selenium", "chrome"), "report_selenium_chrome");
        assert_eq!(
            report_basename("playwright", "firefox"),
            "report_playwright_firefox"
        );
    }

    #[test]
    fn test_json_report_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let result = json!({"target": "https://example.com", "violations": []});
        let path = write_json_report(dir.path(), "selenium", "chrome", &result).unwrap();

        assert!(path.ends_with("report_selenium_chrome.json"));
        let parsed: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_html_report_wraps_payload() {
        let dir = tempfile::tempdir().unwrap();
        let result = json!({"violations": []});
        let path =
            write_html_report(dir.path(), "playwright", "firefox", "https://example.com", &result)
                .unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("<title>Report for https://example.com</title>"));
        assert!(html.contains("<pre>"));
    }
}
