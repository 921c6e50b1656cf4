use crate::runtime::{
    distribution::Distribution,
    records::{DiceRecord, OutputRecord, OutputResult},
    value::Value,
};
use std::fmt::Write;

pub fn render_records(records: &[OutputRecord]) -> String {
    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&render_record(record));
    }
    out
}

pub fn render_record(record: &OutputRecord) -> String {
    match &record.result {
        OutputResult::Value(value) => render_roll(&record.name, value, &record.dice_records),
        OutputResult::Distribution(distribution) => {
            render_distribution(&record.name, distribution)
        }
    }
}

fn render_roll(name: &str, value: &Value, dice: &[DiceRecord]) -> String {
    let mut out = format!("{}: {}\n", name, value);
    for record in dice {
        let results = Value::list(record.results.clone());
        let _ = writeln!(out, "  d{} -> {}", record.die_type, results);
    }
    out
}

/// Frequency table followed by the summary statistics.
pub fn render_distribution(name: &str, distribution: &Distribution) -> String {
    let mut distribution = distribution.clone();
    distribution.aggregate();
    let labels: Vec<String> = distribution
        .counters()
        .iter()
        .map(|c| c.value.to_string())
        .collect();
    let width = labels.iter().map(String::len).max().unwrap_or(0).max(5);

    let mut out = format!("{}\n", name);
    let _ = writeln!(
        out,
        "  {:<width$} {:>9} {:>8} {:>8} {:>8}",
        "value",
        "count",
        "%",
        ">=%",
        "<=%",
        width = width
    );
    for (label, counter) in labels.iter().zip(distribution.counters()) {
        let _ = writeln!(
            out,
            "  {:<width$} {:>9} {:>8.2} {:>8.2} {:>8.2}",
            label,
            counter.count,
            counter.relative * 100.0,
            counter.relative_at_least * 100.0,
            counter.relative_at_most * 100.0,
            width = width
        );
    }

    let show = |value: Option<Value>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    let mean = distribution.mean();
    let stddev = distribution.stddev();
    let mode = show(distribution.mode().cloned());
    let median_inf = show(distribution.median_inf());
    let median_sup = show(distribution.median_sup());
    let _ = writeln!(
        out,
        "  mean {:.3}  stddev {:.3}  mode {}  median {} .. {}",
        mean, stddev, mode, median_inf, median_sup
    );
    out
}
