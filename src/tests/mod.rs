use crate::language::{parser::parse_program, printer::to_source};
use crate::runtime::{
    import::{FileFetcher, MemoryFetcher},
    records::{OutputRecord, OutputResult},
    value::Value,
};
use crate::{Options, Session};
use std::path::Path;

fn session(sample_size: u64) -> Session {
    let options = Options::default().with_seed(2016).with_sample_size(sample_size);
    Session::with_fetcher(options, MemoryFetcher::new())
}

fn library_session(sample_size: u64) -> Session {
    let options = Options::default().with_seed(17).with_sample_size(sample_size);
    let lib = Path::new(env!("CARGO_MANIFEST_DIR")).join("lib");
    Session::with_fetcher(options, FileFetcher::new(lib))
}

fn eval(source: &str) -> String {
    session(10)
        .eval(source)
        .unwrap_or_else(|e| panic!("`{}` failed: {}", source, e))
        .to_string()
}

fn rolled(record: &OutputRecord) -> &Value {
    match &record.result {
        OutputResult::Value(value) => value,
        OutputResult::Distribution(_) => panic!("`{}` was sampled", record.name),
    }
}

#[test]
fn documented_scenarios() {
    assert_eq!(eval("7 + 35"), "42");
    assert_eq!(eval("highest 2 of [17, 1, 42, 33]"), "[42, 33]");
    assert_eq!(eval("0 .. 4"), "[0, 1, 2, 3]");
    assert_eq!(eval("0 .. 4 << 4 .. 6"), "[0, 1, 2, 3, 4, 5]");
    assert_eq!(eval("x = {foo: true, bar: 42}; x[\"bar\"]"), "42");
    assert_eq!(eval("foo = fun(x) { x * 2 }; foo(21)"), "42");
}

#[test]
fn repeat_limits_count_evaluations() {
    assert_eq!(eval("count (while true repeat 1 limit 3)"), "3");
    assert_eq!(eval("count (repeat 1 while true limit 3)"), "4");
    assert_eq!(eval("count (repeat 1 if true)"), "2");
}

#[test]
fn sampling_a_die_is_uniform() {
    let records = session(100_000).run("d6", "d6").expect("sample d6");
    let OutputResult::Distribution(distribution) = &records[0].result else {
        panic!("d6 alone is sampled");
    };
    assert_eq!(distribution.total(), 100_000);
    assert_eq!(distribution.counters().len(), 6);
    for (face, counter) in (1..=6).zip(distribution.counters()) {
        assert_eq!(counter.value, Value::Number(face));
        assert!(
            (counter.relative - 1.0 / 6.0).abs() < 0.01,
            "face {} drawn {:.4} of the time",
            face,
            counter.relative
        );
    }
    let total: u64 = distribution.counters().iter().map(|c| c.count).sum();
    assert_eq!(total, distribution.total());
    assert_eq!(distribution.counters()[0].at_least, 100_000);
    assert_eq!(distribution.counters()[5].at_most, 100_000);
}

#[test]
fn roll_records_carry_their_dice() {
    let mut session = session(10);
    let records = session
        .run("attack", "bonus = 3; roll highest of 2d20 + bonus \"attack\"")
        .expect("roll");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "attack");
    let Value::Number(total) = rolled(&records[0]) else {
        panic!("rolls default to numbers");
    };
    assert!((4..=23).contains(total));
    assert_eq!(records[0].dice_records.len(), 1);
    assert_eq!(records[0].dice_records[0].results.len(), 2);
}

#[test]
fn outputs_use_their_requested_type() {
    let records = session(10)
        .run(
            "types",
            "roll [1, 2] as list; roll [1, 2] as string; roll [1, 2] as native; roll 3 as map",
        )
        .expect("typed rolls");
    let rendered: Vec<String> = records.iter().map(|r| rolled(r).to_string()).collect();
    assert_eq!(rendered, vec!["[1, 2]", "\"12\"", "[1, 2]", "{_: 3}"]);
}

#[test]
fn named_outputs_interpolate() {
    let records = session(10)
        .run("names", "f = fun(n) { roll n \"roll {n}\" }; f(1); f(2)")
        .expect("named rolls");
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["roll 1", "roll 2"]);
}

fn sampled_numbers(record: &OutputRecord) -> Vec<i64> {
    let OutputResult::Distribution(distribution) = &record.result else {
        panic!("`{}` was rolled", record.name);
    };
    distribution
        .counters()
        .iter()
        .map(|counter| match counter.value {
            Value::Number(n) => n,
            ref other => panic!("`{}` produced {}", record.name, other),
        })
        .collect()
}

#[test]
fn library_dice_explode() {
    let mut session = library_session(3_000);
    let records = session
        .run(
            "lib",
            "import \"exploding.yadrol\"; sample X6(); sample dX6; sample 2dX4",
        )
        .expect("exploding samples");
    assert_eq!(records.len(), 3);
    for record in &records[..2] {
        let values = sampled_numbers(record);
        assert!(values.iter().all(|n| (1..=12).contains(n) && *n != 6), "{:?}", values);
        assert!(values.iter().any(|n| *n > 6));
    }
    let pairs = sampled_numbers(&records[2]);
    assert!(pairs.iter().all(|n| (2..=16).contains(n)), "{:?}", pairs);
}

#[test]
fn library_dice_go_wild() {
    let mut session = library_session(3_000);
    let records = session
        .run("lib", "import \"exploding.yadrol\"; sample dXX8")
        .expect("wild sample");
    let values = sampled_numbers(&records[0]);
    assert!(values.iter().all(|n| *n >= 1 && n % 8 != 0), "{:?}", values);
    assert!(values.iter().any(|n| *n > 8));
}

#[test]
fn library_dice_implode() {
    let mut session = library_session(3_000);
    let records = session
        .run("lib", "import \"exploding.yadrol\"; sample dI10")
        .expect("imploding sample");
    let values = sampled_numbers(&records[0]);
    assert!(
        values
            .iter()
            .all(|n| (-9..=20).contains(n) && *n != 1 && *n != 10),
        "{:?}",
        values
    );
    assert!(values.iter().any(|n| *n <= 0));
    assert!(values.iter().any(|n| *n > 10));
}

#[test]
fn library_helpers_are_namespaced() {
    let mut session = library_session(10);
    let value = session
        .eval("import dice = \"exploding.yadrol\"; dice.successes([1, 5, 6, 3], 5)")
        .expect("namespaced helper");
    assert_eq!(value, Value::Number(2));
    let kept = session.eval("dice.keep(3)").expect("keep helper");
    let Value::Number(kept) = kept else {
        panic!("keep sums");
    };
    assert!((3..=18).contains(&kept));
}

#[test]
fn printed_programs_parse_back_to_the_same_text() {
    let programs = [
        "3d6 + 2",
        "highest 3 of 4d6",
        "x = [1, 2, 3]; draw 2 from x",
        "r + 1 for i, r in {a: 1} if i != \"b\"",
        "while x < 3 repeat (x = x + 1) limit 5",
        "repeat d6 if x == 6",
        "f = fun(a, b: 2) { a * b }; f(b: 3, a: 1)",
        "if d6 > 3 then \"hit {x}\" else -1",
        "roll sorted (2 d [1, 2, 3]) as list \"pool\"",
        "import lib = \"exploding.yadrol\"",
        "not (a or b) and count local == 0",
        "(2d3)d6",
    ];
    for program in programs {
        let first = parse_program("print", program).expect("program parses");
        let printed: Vec<String> = first.iter().map(to_source).collect();
        let joined = printed.join("\n---\n");
        let second = parse_program("print", &joined).expect("printed program parses");
        let reprinted: Vec<String> = second.iter().map(to_source).collect();
        assert_eq!(printed, reprinted, "round trip of `{}`", program);
    }
}
