use std::fmt;
use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::ast::Span;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational note (e.g. a `TODO:` comment).
    Info,
    /// Suspicious but compilable input.
    Warning,
    /// The pass cannot produce an artifact.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the message is.
    pub severity: Severity,
    /// Byte range within the file the diagnostic belongs to.
    pub span: Span,
    /// Human-readable message.
    pub message: String,
    /// Optional label shown under the highlighted span.
    pub label: Option<String>,
    /// File the span refers to, when known.
    pub file: Option<PathBuf>,
}

impl Diagnostic {
    fn new(severity: Severity, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity,
            span,
            message: message.into(),
            label: None,
            file: None,
        }
    }

    /// Create an error-level diagnostic.
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, span, message)
    }

    /// Create a warning-level diagnostic.
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, span, message)
    }

    /// Create an info-level diagnostic.
    pub fn info(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, span, message)
    }

    /// Attach a label to the highlighted span.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attribute the diagnostic to a file.
    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Returns `true` for error-level diagnostics.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}: {}: {}", self.severity, file.display(), self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Render diagnostics for one file using ariadne for pretty terminal output.
pub fn render_diagnostics(source: &str, filename: &str, diagnostics: &[Diagnostic]) -> String {
    let mut output = Vec::new();

    for diag in diagnostics {
        let (kind, color) = match diag.severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
            Severity::Info => (ReportKind::Advice, Color::Cyan),
        };

        // Clamp so stale spans never index past the rendered source.
        let end = diag.span.end.min(source.len());
        let span = diag.span.start.min(end)..end;

        let label_text = diag.label.as_deref().unwrap_or(&diag.message);
        Report::build(kind, (filename, span.clone()))
            .with_message(&diag.message)
            .with_label(
                Label::new((filename, span))
                    .with_message(label_text)
                    .with_color(color),
            )
            .finish()
            .write((filename, Source::from(source)), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

/// Render diagnostics that may span several files, reading each file from disk.
///
/// Diagnostics without a file (or whose file cannot be read) fall back to their
/// one-line [`Display`](fmt::Display) form.
pub fn render_file_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut output = String::new();
    for diag in diagnostics {
        let rendered = diag
            .file
            .as_deref()
            .and_then(|file| std::fs::read_to_string(file).ok().map(|src| (file, src)))
            .map(|(file, src)| render_diagnostics(&src, &file.display().to_string(), std::slice::from_ref(diag)));
        match rendered {
            Some(text) if !text.is_empty() => output.push_str(&text),
            _ => {
                output.push_str(&diag.to_string());
                output.push('\n');
            }
        }
    }
    output
}
