// SPDX-License-Identifier: MIT
//! Materialization of raw HTML into a navigable file-based scan target.

use std::fmt;
use std::io::Write;
use std::path::Path;

use tempfile::TempPath;

/// A temporary `.html` file holding caller-supplied markup.
///
/// The file is deleted when this handle is dropped, so it lives exactly as
/// long as the scan that uses it.
pub struct MaterializedHtml {
    path: TempPath,
}

impl MaterializedHtml {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URL suitable for browser navigation.
    pub fn file_url(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

impl fmt::Debug for MaterializedHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaterializedHtml")
            .field("path", &self.path.display().to_string())
            .finish()
    }
}

/// Write `html` verbatim to a new temporary file with an `.html` suffix.
pub fn materialize(html: &str) -> std::io::Result<MaterializedHtml> {
    let mut file = tempfile::Builder::new()
        .prefix("axescan-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(html.as_bytes())?;
    file.flush()?;
    Ok(MaterializedHtml {
        path: file.into_temp_path(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_writes_verbatim_html() {
        let html = "<html><body><h1>hi</h1></body></html>";
        let target = materialize(html).expect("materialize failed");
        assert!(target.path().extension().is_some_and(|e| e == "html"));
        let on_disk = std::fs::read_to_string(target.path()).expect("read failed");
        assert_eq!(on_disk, html);
    }

    #[test]
    fn test_file_url_scheme() {
        let target = materialize("<p>x</p>").expect("materialize failed");
        assert!(target.file_url().starts_with("file:///"));
    }

    #[test]
    fn test_dropped_target_removes_file() {
        let target = materialize("<p>x</p>").expect("materialize failed");
        let path = target.path().to_path_buf();
        assert!(path.exists());
        drop(target);
        assert!(!path.exists());
    }
}
