use crate::language::{
    ast::{Expr, ExprKind, Output},
    errors::SyntaxErrors,
    parser::parse_program,
};
use crate::options::Options;
use crate::runtime::{
    error::EvaluationError,
    import::{Fetch, FileFetcher},
    records::{DiceRecord, OutputRecord, OutputResult},
    value::Value,
    Interpreter,
};
use std::rc::Rc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxErrors),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// A global scope, record logger and import cache shared by successive runs.
pub struct Session {
    options: Options,
    interpreter: Interpreter,
}

impl Session {
    /// Session resolving imports against the working directory.
    pub fn new(options: Options) -> Self {
        Self::with_fetcher(options, FileFetcher::new("."))
    }

    pub fn with_fetcher(options: Options, fetcher: impl Fetch + 'static) -> Self {
        let interpreter = Interpreter::new(&options, Box::new(fetcher));
        Self {
            options,
            interpreter,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Runs a whole program and returns its output records.
    ///
    /// A program without any `roll` or `sample` outputs its last expression
    /// in the default mode.
    pub fn run(&mut self, source_name: &str, source: &str) -> Result<Vec<OutputRecord>, Error> {
        self.interpreter.records_mut().clear();
        let mut program = parse_program(source_name, source)?;
        if !program.iter().any(Expr::has_output) {
            match program.pop() {
                Some(last) => program.push(self.default_output(last)),
                None => warn!(source = source_name, "program has no expressions"),
            }
        }

        let global = self.interpreter.global();
        for expr in &program {
            self.interpreter.evaluate(expr, global, None)?;
        }

        let records = self.interpreter.records_mut().records_mut();
        for record in records.iter_mut() {
            if let OutputResult::Distribution(distribution) = &mut record.result {
                distribution.aggregate();
            }
        }
        info!(
            source = source_name,
            outputs = records.len(),
            "run complete"
        );
        Ok(records.to_vec())
    }

    /// Evaluates `source` without implicit output and returns its last value.
    pub fn eval(&mut self, source: &str) -> Result<Value, Error> {
        let program = parse_program("<eval>", source)?;
        let global = self.interpreter.global();
        let mut last = Value::Undefined;
        for expr in &program {
            last = self.interpreter.evaluate(expr, global, None)?;
        }
        Ok(last)
    }

    /// Every dice throw of the last run, outside of samples.
    pub fn dice_records(&self) -> &[DiceRecord] {
        self.interpreter.records().dice_records()
    }

    /// Wraps the last expression of a `;` sequence, so its label sees the
    /// variables bound before it.
    fn default_output(&self, expression: Expr) -> Expr {
        let location = expression.location.clone();
        if let ExprKind::Sequence(first, last) = expression.kind {
            let last = self.default_output(*last);
            return Expr::new(ExprKind::Sequence(first, Box::new(last)), location);
        }
        let output = Output {
            mode: self.options.default_mode,
            expression: Rc::new(expression),
            ty: None,
            name: None,
        };
        Expr::new(ExprKind::Output(Box::new(output)), location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::ast::OutputMode;
    use crate::runtime::import::MemoryFetcher;

    fn session() -> Session {
        let options = Options::default().with_seed(3).with_sample_size(500);
        Session::with_fetcher(options, MemoryFetcher::new())
    }

    #[test]
    fn last_expression_is_sampled_by_default() {
        let records = session().run("main", "x = 2; d6 + x").expect("run");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mode, OutputMode::Sample);
        assert_eq!(records[0].name, "d6 + 2");
        let OutputResult::Distribution(distribution) = &records[0].result else {
            panic!("default output samples");
        };
        assert!(distribution.is_aggregated());
        assert_eq!(distribution.total(), 500);
    }

    #[test]
    fn explicit_outputs_disable_the_default() {
        let records = session()
            .run("main", "roll 3 as string\n---\n4")
            .expect("run");
        assert_eq!(records.len(), 1);
        assert!(matches!(
            &records[0].result,
            OutputResult::Value(Value::String(s)) if s == "3"
        ));
    }

    #[test]
    fn global_scope_persists_between_runs() {
        let mut session = session();
        session.run("first", "x = 20; roll x").expect("first run");
        let records = session.run("second", "roll x + 1").expect("second run");
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records[0].result,
            OutputResult::Value(Value::Number(21))
        ));
    }

    #[test]
    fn errors_are_split_by_phase() {
        let mut session = session();
        assert!(matches!(session.run("main", "1 +"), Err(Error::Syntax(_))));
        assert!(matches!(session.run("main", "d true"), Err(Error::Evaluation(_))));
        assert_eq!(session.eval("6 * 7").expect("eval"), Value::Number(42));
    }

    #[test]
    fn roll_dice_are_exposed() {
        let mut session = session();
        session.run("main", "roll 2d6").expect("run");
        assert_eq!(session.dice_records().len(), 1);
        assert_eq!(session.dice_records()[0].die_type, Value::Number(6));
    }
}
