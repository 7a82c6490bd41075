// src/highlight.rs

//! Syntax highlighting for fenced code blocks.
//!
//! [`Pygmentize`] shells out to the `pygmentize` tool when it can be found;
//! [`PlainText`] is the fallback and simply escapes the code into a `<pre>`.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns a code block into HTML markup.
pub trait Highlighter: Send + Sync {
    /// Highlights `code` written in `language`. Unknown or empty languages
    /// are rendered as plain text.
    fn highlight(&self, code: &str, language: &str) -> String;
}

/// Escapes `text` for use inside an HTML element or attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a `String` cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, text);
    out
}

/// Highlighter that performs no coloring.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl Highlighter for PlainText {
    fn highlight(&self, code: &str, _language: &str) -> String {
        format!("<div class=\"highlight\"><pre>{}</pre></div>\n", escape_html(code))
    }
}

/// Highlighter backed by the `pygmentize` command-line tool.
#[derive(Debug, Clone)]
pub struct Pygmentize {
    program: PathBuf,
    lexers: HashSet<String>,
}

impl Pygmentize {
    /// Resolves `pygmentize`, preferring an explicit path over `PATH`, and
    /// loads the list of lexers it supports.
    pub fn locate(explicit: Option<&Path>) -> std::io::Result<Self> {
        let program = match explicit {
            Some(path) => path.to_path_buf(),
            None => which::which("pygmentize")
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?,
        };
        let output = Command::new(&program).args(["-L", "lexers"]).output()?;
        if !output.status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("`{} -L lexers` exited with {}", program.display(), output.status),
            ));
        }
        let lexers = parse_lexer_list(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "Loaded {} lexer aliases from {}",
            lexers.len(),
            program.display()
        );
        Ok(Self { program, lexers })
    }

    pub fn supports(&self, language: &str) -> bool {
        self.lexers.contains(language)
    }

    fn run(&self, code: &str, language: &str) -> std::io::Result<String> {
        let mut child = Command::new(&self.program)
            .args(["-l", language, "-f", "html", "-P", "encoding=utf-8"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(code.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Highlighter for Pygmentize {
    fn highlight(&self, code: &str, language: &str) -> String {
        let language = if self.supports(language) {
            language
        } else {
            "text"
        };
        match self.run(code, language) {
            Ok(html) => html,
            Err(e) => {
                warn!("pygmentize failed for language {:?}: {}", language, e);
                PlainText.highlight(code, language)
            }
        }
    }
}

/// Parses `pygmentize -L lexers` output. Alias lines look like
/// `* python, py, sage:` followed by an indented description line.
fn parse_lexer_list(listing: &str) -> HashSet<String> {
    listing
        .lines()
        .filter(|line| line.starts_with('*'))
        .flat_map(|line| line.trim_matches(|c| c == '*' || c == ' ' || c == ':').split(','))
        .map(str::trim)
        .filter(|alias| !alias.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks `pygmentize` when available, plain text otherwise.
pub fn resolve(explicit: Option<&Path>) -> Arc<dyn Highlighter> {
    match Pygmentize::locate(explicit) {
        Ok(p) => {
            info!("Highlighting code blocks with {}", p.program.display());
            Arc::new(p)
        }
        Err(e) => {
            info!("pygmentize unavailable ({}), code blocks will not be colored", e);
            Arc::new(PlainText)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lexer_aliases() {
        let listing = "Pygments version 2.17\nLexers:\n~~~~~~~\n* abap:\n    ABAP (filenames *.abap)\n* python, py, sage, python3:\n    Python (filenames *.py)\n";
        let lexers = parse_lexer_list(listing);
        assert!(lexers.contains("abap"));
        assert!(lexers.contains("py"));
        assert!(lexers.contains("python3"));
        assert!(!lexers.contains("Python"));
        assert_eq!(lexers.len(), 5);
    }

    #[test]
    fn plain_text_escapes() {
        let html = PlainText.highlight("if a < b && c > \"d\" {}", "rust");
        assert_eq!(
            html,
            "<div class=\"highlight\"><pre>if a &lt; b &amp;&amp; c &gt; &quot;d&quot; {}</pre></div>\n"
        );
    }
}
