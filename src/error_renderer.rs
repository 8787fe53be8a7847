//! Beautiful error rendering using ariadne
//!
//! This module provides utilities for rendering engine errors with
//! rich formatting, source code snippets, and helpful annotations.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render an error with beautiful formatting to stderr
///
/// # Example
/// ```no_run
/// use cseval::{Engine, EngineOptions, render_error};
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
///
/// let source = "1 + true";
/// match engine.compile(source, &[]) {
///     Err(e) => render_error(&e),
///     Ok(_) => {}
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
///
/// This is useful when you want to control where the error is written,
/// such as to a file, a buffer, or a custom output stream.
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String (useful for tests, web UIs, etc.)
///
/// # Example
/// ```no_run
/// use cseval::{Engine, EngineOptions, render_error_to_string};
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
///
/// let source = "1 + true";
/// match engine.compile(source, &[]) {
///     Err(e) => {
///         let formatted = render_error_to_string(&e);
///         // Use formatted error in UI, logs, etc.
///     }
///     Ok(_) => {}
/// }
/// ```
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
///
/// This is the same as `render_error_to_string` but without ANSI color codes,
/// making the output easier to compare in tests.
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation {
            diagnostics,
            source,
        } => render_diagnostics(source, diagnostics, writer, use_color),
        Error::Runtime { fault } => {
            writeln!(writer, "Runtime error ({}): {}", fault.name(), fault)
        }
        Error::Api(msg) => {
            writeln!(writer, "API error: {}", msg)
        }
    }
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let mut report = Report::build(kind, ("<unknown>", diag.span.0.clone()))
            .with_message(&diag.message)
            .with_config(ariadne::Config::default().with_color(use_color));

        // Add error code if present
        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        // Primary label with the main error span
        let color = colors.next();
        report = report.with_label(
            Label::new(("<unknown>", diag.span.0.clone()))
                .with_message(&diag.message)
                .with_color(color),
        );

        // Related info as secondary labels (shows context breadcrumbs!)
        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new(("<unknown>", related.span.0.clone()))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }

        if let Some(help) = &diag.help {
            report = report.with_help(help);
        }

        // Render to the writer (need to reborrow to avoid moving)
        report.finish().write(("<unknown>", Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, EngineOptions, Type, Value};

    fn engine() -> Engine {
        Engine::new(EngineOptions::default(), |_| {})
    }

    #[test]
    fn test_render_parse_error() {
        let source = "1 + * 2"; // Invalid syntax
        let result = engine().compile(source, &[]);

        assert!(result.is_err());
        if let Err(e) = result {
            let output = render_error_to_string_no_color(&e);

            // Should contain error indicator
            assert!(output.contains("Error") || output.contains("error"));
            // Should show the source
            assert!(output.contains("1 + * 2"));
        }
    }

    #[test]
    fn test_render_bind_error() {
        let source = "1 + true"; // No operator for int and bool
        let result = engine().compile(source, &[]);

        assert!(result.is_err());
        if let Err(e) = result {
            let output = render_error_to_string_no_color(&e);

            assert!(output.contains("B008"));
            assert!(output.contains("cannot be applied to operands of type 'int' and 'bool'"));
        }
    }

    #[test]
    fn test_render_help_and_code() {
        let result = engine().compile("x.Lenght", &[("x", Type::String)]);

        let Err(e) = result else {
            panic!("expected a compilation error");
        };
        let output = render_error_to_string_no_color(&e);
        assert!(output.contains("B003"));
        assert!(output.contains("available members:"));
        // Should be multi-line (ariadne adds formatting)
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_help_is_rendered_once_or_not_at_all() {
        let Err(with_help) = engine().compile("x.Lenght", &[("x", Type::String)]) else {
            panic!("expected a compilation error");
        };
        let output = render_error_to_string_no_color(&with_help);
        assert_eq!(output.matches("available members:").count(), 1);

        let Err(without_help) = engine().compile("Math.Max(1)", &[]) else {
            panic!("expected a compilation error");
        };
        let output = render_error_to_string_no_color(&without_help);
        assert!(output.contains("B004"));
        assert!(!output.to_lowercase().contains("help"), "{}", output);
    }

    #[test]
    fn test_render_runtime_error() {
        let expr = engine().compile("1 / x", &[("x", Type::INT32)]).unwrap();
        let err = expr.run(&[Value::Int32(0)]).unwrap_err();
        assert_eq!(
            render_error_to_string_no_color(&err),
            "Runtime error (DivideByZero): attempted to divide by zero\n"
        );
    }
}
