use crate::language::ast::{Expr, OutputMode};
use crate::runtime::{
    distribution::Distribution,
    error::ErrorKind,
    value::{Value, ValueType},
};
use std::rc::Rc;

/// One primitive throw: the die that was rolled and what came up.
#[derive(Clone, Debug)]
pub struct DiceRecord {
    pub die_type: Value,
    pub results: Vec<Value>,
}

#[derive(Clone, Debug)]
pub enum OutputResult {
    Value(Value),
    Distribution(Distribution),
}

#[derive(Clone, Debug)]
pub struct OutputRecord {
    pub mode: OutputMode,
    pub name: String,
    pub expression: Rc<Expr>,
    pub result_type: Option<ValueType>,
    pub result: OutputResult,
    /// Dice thrown while evaluating a roll; always empty for samples.
    pub dice_records: Vec<DiceRecord>,
}

#[derive(Debug)]
struct InFlight {
    mode: OutputMode,
    dice: Vec<DiceRecord>,
}

/// Collects output records and dice throws for one run.
#[derive(Debug, Default)]
pub struct RecordLogger {
    records: Vec<OutputRecord>,
    dice_records: Vec<DiceRecord>,
    current: Option<InFlight>,
}

impl RecordLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.dice_records.clear();
        self.current = None;
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [OutputRecord] {
        &mut self.records
    }

    pub fn dice_records(&self) -> &[DiceRecord] {
        &self.dice_records
    }

    pub fn is_sampling(&self) -> bool {
        matches!(
            self.current,
            Some(InFlight {
                mode: OutputMode::Sample,
                ..
            })
        )
    }

    pub fn record_dice(&mut self, die_type: Value, results: Vec<Value>) {
        if self.is_sampling() {
            return;
        }
        let record = DiceRecord { die_type, results };
        if let Some(current) = &mut self.current {
            current.dice.push(record.clone());
        }
        self.dice_records.push(record);
    }

    pub fn start(&mut self, mode: OutputMode) -> Result<(), ErrorKind> {
        if self.current.is_some() {
            return Err(ErrorKind::NestedOutput);
        }
        self.current = Some(InFlight {
            mode,
            dice: Vec::new(),
        });
        Ok(())
    }

    pub fn finish(
        &mut self,
        name: String,
        expression: Rc<Expr>,
        result_type: Option<ValueType>,
        result: OutputResult,
    ) {
        let Some(current) = self.current.take() else {
            return;
        };
        self.records.push(OutputRecord {
            mode: current.mode,
            name,
            expression,
            result_type,
            result,
            dice_records: current.dice,
        });
    }

    /// Clears the in-flight marker after a failed evaluation.
    pub fn abandon(&mut self) {
        self.current = None;
    }
}
