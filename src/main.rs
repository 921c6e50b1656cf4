use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing::{debug, Level};
use yadrol::{
    diagnostics::{report_error, report_io_error},
    display::render_records,
    language::ast::{OutputMode, OutputType},
    options::Options,
    runtime::import::FileFetcher,
    session::Session,
};

#[derive(Parser, Debug)]
#[command(name = "yadrol")]
#[command(about = "Roll dice expressions or sample their distribution")]
#[command(version)]
struct Cli {
    /// Program to run
    #[arg(required_unless_present = "expr")]
    file: Option<PathBuf>,

    /// Inline program to run instead of a file
    #[arg(short = 'e', long = "expr", conflicts_with = "file")]
    expr: Option<String>,

    /// Evaluations per sampled output
    #[arg(long, env = "YADROL_SAMPLE_SIZE", default_value_t = 100_000)]
    sample_size: u64,

    /// Type of outputs without `as`
    #[arg(long, env = "YADROL_DEFAULT_TYPE", default_value = "number")]
    default_type: OutputType,

    /// Mode of the implicit output (roll or sample)
    #[arg(long, env = "YADROL_MODE", default_value = "sample")]
    mode: OutputMode,

    /// Seed for reproducible runs
    #[arg(long, env = "YADROL_SEED")]
    seed: Option<u64>,

    /// Directory imports are resolved against
    #[arg(long)]
    import_dir: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> Options {
        Options {
            sample_size: self.sample_size,
            default_type: self.default_type,
            default_mode: self.mode,
            seed: self.seed,
        }
    }

    fn import_dir(&self) -> PathBuf {
        if let Some(dir) = &self.import_dir {
            return dir.clone();
        }
        match self.file.as_deref().and_then(Path::parent) {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Room for programs that recurse up to the interpreter's depth limit.
const STACK_SIZE: usize = 64 * 1024 * 1024;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runner = thread::Builder::new()
        .name("yadrol".to_string())
        .stack_size(STACK_SIZE)
        .spawn(move || run(&cli));
    match runner.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("failed to start the interpreter: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> ExitCode {
    let (source_name, source) = match (&cli.expr, &cli.file) {
        (Some(expr), _) => ("<expr>".to_string(), expr.clone()),
        (None, Some(path)) => match fs::read_to_string(path) {
            Ok(source) => (path.display().to_string(), source),
            Err(error) => {
                report_io_error(path, &error);
                return ExitCode::FAILURE;
            }
        },
        (None, None) => {
            eprintln!("Usage: yadrol [OPTIONS] <FILE> | yadrol -e <EXPR>");
            return ExitCode::FAILURE;
        }
    };

    let import_dir = cli.import_dir();
    debug!(import_dir = %import_dir.display(), "resolving imports");
    let mut session = Session::with_fetcher(cli.options(), FileFetcher::new(import_dir));
    match session.run(&source_name, &source) {
        Ok(records) => {
            print!("{}", render_records(&records));
            ExitCode::SUCCESS
        }
        Err(error) => {
            report_error(&source_name, &source, &error);
            ExitCode::FAILURE
        }
    }
}
