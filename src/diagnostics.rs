use crate::language::errors::{SyntaxError, SyntaxErrors};
use crate::runtime::error::EvaluationError;
use crate::session::Error;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(yadrol::syntax))]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(yadrol::evaluation))]
pub struct EvaluationDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("while evaluating `{expression}`")]
    span: SourceSpan,
    message: String,
    expression: String,
}

impl EvaluationDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: &EvaluationError) -> Self {
        Self {
            src,
            span: err.location.to_source_span(),
            message: err.kind.to_string(),
            expression: err.expression.clone(),
        }
    }
}

pub fn emit_syntax_errors(source_name: &str, source: &str, errors: &SyntaxErrors) {
    let src = NamedSource::new(source_name, source.to_string());
    for err in &errors.errors {
        if err.location.source.as_ref() != source_name {
            eprintln!("Syntax error: {}", err);
            continue;
        }
        let diagnostic = SyntaxDiagnostic::from_error(src.clone(), err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

/// Renders the error with a snippet when it points into `source`; errors
/// raised inside imported files only carry their location.
pub fn report_evaluation_error(source_name: &str, source: &str, error: &EvaluationError) {
    if error.location.source.as_ref() != source_name {
        eprintln!(
            "Evaluation error at {}: {} (in `{}`)",
            error.location, error.kind, error.expression
        );
        return;
    }
    let src = NamedSource::new(source_name, source.to_string());
    let diagnostic = EvaluationDiagnostic::from_error(src, error);
    eprintln!("{:?}", Report::new(diagnostic));
}

pub fn report_error(source_name: &str, source: &str, error: &Error) {
    match error {
        Error::Syntax(errors) => emit_syntax_errors(source_name, source, errors),
        Error::Evaluation(error) => report_evaluation_error(source_name, source, error),
    }
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_program;
    use crate::session::Session;
    use crate::options::Options;
    use crate::runtime::import::MemoryFetcher;

    #[test]
    fn syntax_diagnostics_point_at_the_error() {
        let errors = parse_program("main", "1 + )").expect_err("invalid source");
        let src = NamedSource::new("main", "1 + )".to_string());
        let diagnostic = SyntaxDiagnostic::from_error(src, &errors.errors[0]);
        assert_eq!(diagnostic.span.offset(), 4);
    }

    #[test]
    fn evaluation_diagnostics_name_the_expression() {
        let mut session = Session::with_fetcher(Options::default(), MemoryFetcher::new());
        let Err(Error::Evaluation(error)) = session.run("main", "roll 3 / 0") else {
            panic!("division by zero");
        };
        let src = NamedSource::new("main", "roll 3 / 0".to_string());
        let diagnostic = EvaluationDiagnostic::from_error(src, &error);
        assert_eq!(diagnostic.expression, "3 / 0");
        assert_eq!(diagnostic.message, "division by zero");
        assert_eq!(diagnostic.span.offset(), 5);
    }
}
