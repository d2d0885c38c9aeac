use std::fmt;

use crate::span::Span;

/// A translation diagnostic (error or warning).
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let start = (self.span.start as usize).min(source.len());
        let end = (self.span.end as usize).clamp(start, source.len());

        let mut report = Report::build(kind, filename, start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        if let Err(e) = report.finish().eprint((filename, Source::from(source))) {
            log::warn!("cannot render diagnostic: {}", e);
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)?;
        if self.span.line > 0 {
            write!(f, " at {}", self.span.location())?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}

/// Render a list of diagnostics. Without source text the plain
/// one-line form is printed instead.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: Option<&str>) {
    for diag in diagnostics {
        match source {
            Some(src) => diag.render(filename, src),
            None => eprintln!("{}: {}", filename, diag),
        }
    }
}

/// True when any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(0, 10, 15);
        let d = Diagnostic::error("Undefined variable: x", span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "Undefined variable: x");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("No cast needed", Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert!(!d.is_error());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::error("Type mismatch in variable assignment", Span::dummy())
            .with_note("expected i32, found ptr")
            .with_help("use int(...) to convert")
            .with_note("declared here");
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.help.as_deref(), Some("use int(...) to convert"));
    }

    #[test]
    fn test_display_includes_location() {
        let d = Diagnostic::error("Break statement outside of loop", Span::at(4, 9));
        assert_eq!(
            d.to_string(),
            "error: Break statement outside of loop at line 4, column 9"
        );
    }

    #[test]
    fn test_display_without_location() {
        let d = Diagnostic::warning("No cast needed", Span::dummy());
        assert_eq!(d.to_string(), "warning: No cast needed");
    }

    #[test]
    fn test_has_errors() {
        let warn = Diagnostic::warning("w", Span::dummy());
        let err = Diagnostic::error("e", Span::dummy());
        assert!(!has_errors(&[warn.clone()]));
        assert!(has_errors(&[warn, err]));
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "var a: int[3] = {1, 2, 3};\nvar v = a[5];\n";
        let d = Diagnostic::error("Array index 5 out of bounds for array of size 3", Span::new(0, 35, 39))
            .with_note("declared with 3 elements");
        d.render("test.aero", source);
    }

    #[test]
    fn test_render_clamps_out_of_range_span() {
        let d = Diagnostic::warning("late", Span::new(0, 500, 900));
        d.render("test.aero", "short");
    }

    #[test]
    fn test_render_diagnostics_without_source() {
        let diagnostics = vec![
            Diagnostic::warning("unused x", Span::at(1, 5)),
            Diagnostic::error("bad y", Span::at(2, 5)),
        ];
        render_diagnostics(&diagnostics, "test.json", None);
    }
}
