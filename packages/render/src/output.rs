//! Writing artifacts to disk and handing them to a viewer.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::RenderError;

/// A complete HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    title: String,
    html: String,
}

impl HtmlDocument {
    #[must_use]
    pub const fn new(title: String, html: String) -> Self {
        Self { title, html }
    }

    /// The page as a standalone document.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// The page wrapped in an `<iframe srcdoc>` fragment for embedding in
    /// another document.
    #[must_use]
    pub fn embed(&self) -> String {
        format!(
            "<div style=\"width:100%;\"><div style=\"position:relative;width:100%;height:0;padding-bottom:60%;\">\
<iframe srcdoc=\"{}\" title=\"{}\" style=\"position:absolute;width:100%;height:100%;left:0;top:0;border:none !important;\" \
allowfullscreen webkitallowfullscreen mozallowfullscreen></iframe></div></div>\n",
            escape_html(&self.html),
            escape_html(&self.title),
        )
    }
}

/// Escapes text for use inside HTML content or a double-quoted attribute.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Paths written for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    /// `<stem>.html`, the embeddable fragment.
    pub embed: PathBuf,
    /// `<stem>b.html`, the standalone page.
    pub standalone: PathBuf,
}

/// Writes `doc` into `dir` as `<stem>.html` and `<stem>b.html`, creating the
/// directory if needed. Existing files are overwritten.
///
/// # Errors
///
/// * If the directory cannot be created
/// * If either file cannot be written
pub fn write_artifact(
    dir: &Path,
    stem: &str,
    doc: &HtmlDocument,
) -> Result<WrittenArtifact, RenderError> {
    fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let embed = dir.join(format!("{stem}.html"));
    let standalone = dir.join(format!("{stem}b.html"));

    fs::write(&embed, doc.embed()).map_err(|e| io_error(&embed, e))?;
    fs::write(&standalone, doc.html()).map_err(|e| io_error(&standalone, e))?;

    log::info!("Wrote {}", standalone.display());

    Ok(WrittenArtifact { embed, standalone })
}

/// Opens `path` with the platform's default handler.
///
/// # Errors
///
/// * If the launcher cannot be spawned
/// * If the launcher exits unsuccessfully
pub fn open_in_viewer(path: &Path) -> Result<(), RenderError> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    };

    log::debug!("Opening {} in viewer", path.display());

    let status = command.arg(path).status().map_err(|e| io_error(path, e))?;

    if !status.success() {
        return Err(RenderError::Viewer {
            path: path.display().to_string(),
            status,
        });
    }

    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.display().to_string(),
        source,
    }
}
