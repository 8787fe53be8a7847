//! String templates with embedded expressions.
//!
//! `"Hello {Name}, you have {Items.Count} items"` compiles each `{...}`
//! placeholder as an expression over a single `this` parameter whose
//! members are reachable as bare names.

use tracing::debug;

use crate::api::{CompilationOptions, CompiledExpression, Diagnostic, Engine, Error, Severity};
use crate::syntax::Span;
use crate::types::Type;
use crate::values::{Value, format_value};

const THIS: &str = "this";

enum Part {
    Text(String),
    Expression(CompiledExpression),
}

/// A compiled template.
///
/// # Example
///
/// ```
/// use cseval_core::api::{Engine, EngineOptions};
/// use cseval_core::template::Template;
/// use cseval_core::types::Type;
/// use cseval_core::values::Value;
///
/// let engine = Engine::new(EngineOptions::default(), |_| {});
/// let template = Template::compile(&engine, "{ToUpper()} has {Length} letters", &Type::String).unwrap();
/// assert_eq!(template.render(&Value::string("abc")).unwrap(), "ABC has 3 letters");
/// ```
pub struct Template {
    parts: Vec<Part>,
    instance_type: Type,
}

impl Template {
    pub fn compile(engine: &Engine, pattern: &str, instance_type: &Type) -> Result<Self, Error> {
        let options = CompilationOptions {
            context_parameter: Some(THIS.to_string()),
            ..engine.options().default_compilation_options.clone()
        };
        let params = [(THIS, instance_type.clone())];

        let mut parts = Vec::new();
        for segment in split(pattern)? {
            match segment {
                Segment::Text(text) => parts.push(Part::Text(text)),
                Segment::Placeholder { start, end } => {
                    let source = &pattern[start..end];
                    let expr = engine
                        .compile_with(&options, source, &params, None)
                        .map_err(|e| relocate(e, pattern, start))?;
                    parts.push(Part::Expression(expr));
                }
            }
        }
        debug!(
            parts = parts.len(),
            instance_type = %instance_type,
            "Compiled template"
        );
        Ok(Template {
            parts,
            instance_type: instance_type.clone(),
        })
    }

    /// Renders the template for `instance`. Placeholders evaluating to
    /// `null` render as the empty string.
    pub fn render(&self, instance: &Value) -> Result<String, Error> {
        let mut out = String::new();
        let args = [instance.clone()];
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Expression(expr) => out.push_str(&format_value(&expr.run(&args)?)),
            }
        }
        Ok(out)
    }

    pub fn instance_type(&self) -> &Type {
        &self.instance_type
    }
}

enum Segment {
    Text(String),
    /// Byte range of the expression text, braces excluded.
    Placeholder { start: usize, end: usize },
}

fn split(pattern: &str) -> Result<Vec<Segment>, Error> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;
    let mut open = 0usize;

    for (i, ch) in pattern.char_indices() {
        match (ch, depth) {
            ('{', 0) => {
                if !text.is_empty() {
                    segments.push(Segment::Text(core::mem::take(&mut text)));
                }
                open = i;
                depth = 1;
            }
            ('{', _) => depth += 1,
            ('}', 1) => {
                segments.push(Segment::Placeholder { start: open + 1, end: i });
                depth = 0;
            }
            ('}', 0) => text.push(ch),
            ('}', _) => depth -= 1,
            (_, 0) => text.push(ch),
            _ => {}
        }
    }
    if depth > 0 {
        return Err(Error::Compilation {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                message: "unterminated '{' in template".to_string(),
                span: Span::new(open, pattern.len()),
                related: Vec::new(),
                help: Some("close the placeholder with '}'".to_string()),
                code: Some("T001".to_string()),
            }],
            source: pattern.to_string(),
        });
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Shifts diagnostics of a placeholder so they point into the whole pattern.
fn relocate(err: Error, pattern: &str, offset: usize) -> Error {
    match err {
        Error::Compilation { diagnostics, .. } => Error::Compilation {
            diagnostics: diagnostics
                .into_iter()
                .map(|mut d| {
                    d.span = Span::new(d.span.start() + offset, d.span.end() + offset);
                    for related in &mut d.related {
                        related.span = Span::new(related.span.start() + offset, related.span.end() + offset);
                    }
                    d
                })
                .collect(),
            source: pattern.to_string(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::api::EngineOptions;

    fn engine() -> Engine {
        Engine::new(EngineOptions::default(), |_| {})
    }

    fn render(pattern: &str, instance: &str) -> String {
        Template::compile(&engine(), pattern, &Type::String)
            .and_then(|t| t.render(&Value::string(instance)))
            .unwrap_or_else(|e| panic!("template {:?} failed: {}", pattern, e))
    }

    #[test]
    fn test_plain_text_and_members() {
        assert_eq!(render("no placeholders", "x"), "no placeholders");
        assert_eq!(render("{Length}", "four"), "4");
        assert_eq!(render("<{ToUpper()}|{this}>", "ab"), "<AB|ab>");
    }

    #[test]
    fn test_nested_braces() {
        assert_eq!(render("n={(new[] { 1, 2, 3 }).Length}", ""), "n=3");
        assert_eq!(render("a } b", ""), "a } b");
    }

    #[test]
    fn test_null_renders_empty() {
        assert_eq!(render("[{Length > 10 ? this : null}]", "short"), "[]");
    }

    #[test]
    fn test_unterminated_brace() {
        let err = Template::compile(&engine(), "abc {Length", &Type::String).err().unwrap();
        let Error::Compilation { diagnostics, .. } = err else {
            panic!("expected a compilation error");
        };
        assert_eq!(diagnostics[0].code.as_deref(), Some("T001"));
        assert_eq!(diagnostics[0].span, Span::new(4, 11));
    }

    #[test]
    fn test_errors_point_into_the_pattern() {
        let err = Template::compile(&engine(), "ab {Lenght}", &Type::String).err().unwrap();
        let Error::Compilation { diagnostics, source } = err else {
            panic!("expected a compilation error");
        };
        assert_eq!(source, "ab {Lenght}");
        assert_eq!(diagnostics[0].code.as_deref(), Some("B001"));
        assert_eq!(diagnostics[0].span, Span::new(4, 10));
    }

    #[test]
    fn test_runtime_faults_propagate() {
        let template = Template::compile(&engine(), "{Substring(10)}", &Type::String).unwrap();
        assert!(matches!(
            template.render(&Value::string("abc")),
            Err(Error::Runtime { .. })
        ));
    }
}
