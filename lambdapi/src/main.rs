use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// A dependently typed lambda calculus
#[derive(Parser)]
#[clap(author, version, about)]
enum Cli {
    /// Check a program, printing the result of each declaration to stdout
    Check {
        /// Path to the program to check
        #[clap(name = "FILE")]
        file: PathOrStdin,
        /// Continue even if errors were encountered
        #[clap(long = "allow-errors")]
        allow_errors: bool,
    },
    /// Start an interactive session
    Repl,
    /// Normalise a term, printing its normal form and type
    Norm {
        /// Path to a term to normalise
        #[clap(long = "term", name = "TERM_FILE", display_order = 0)]
        term_file: PathOrStdin,
    },
}

#[derive(Clone, Debug)]
enum PathOrStdin {
    StdIn,
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(src: &str) -> Result<PathOrStdin, std::convert::Infallible> {
        match src {
            "-" => Ok(PathOrStdin::StdIn),
            _ => Ok(PathOrStdin::Path(PathBuf::from(src))),
        }
    }
}

fn unwrap_or_exit<T>(option: Option<T>) -> T {
    option.unwrap_or_else(|| std::process::exit(lambdapi::Status::Error.exit_code()))
}

fn load_file_or_exit(driver: &mut lambdapi::Driver, file: PathOrStdin) -> lambdapi::files::FileId {
    unwrap_or_exit(match file {
        PathOrStdin::StdIn => driver.load_source("<stdin>".to_owned(), std::io::stdin()),
        PathOrStdin::Path(path) => driver.load_source_path(&path),
    })
}

const MAX_PRETTY_WIDTH: usize = 80;

fn get_pretty_width() -> usize {
    let term_width = termsize::get().map_or(usize::MAX, |size| usize::from(size.cols));
    std::cmp::min(term_width, MAX_PRETTY_WIDTH)
}

const LOG_ENV_VAR: &str = "LAMBDAPI_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("error"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> ! {
    init_tracing();

    match Cli::parse() {
        Cli::Check { file, allow_errors } => {
            let mut driver = lambdapi::Driver::new();
            driver.install_panic_hook();
            driver.set_allow_errors(allow_errors);
            driver.set_emit_width(get_pretty_width());

            let file_id = load_file_or_exit(&mut driver, file);
            let status = driver.check_program(file_id);

            std::process::exit(status.exit_code());
        }
        Cli::Repl => {
            let mut driver = lambdapi::Driver::new();
            driver.install_panic_hook();
            driver.set_emit_width(get_pretty_width());

            let status = driver.repl(std::io::stdin().lock());

            std::process::exit(status.exit_code());
        }
        Cli::Norm { term_file } => {
            let mut driver = lambdapi::Driver::new();
            driver.install_panic_hook();
            driver.set_emit_width(get_pretty_width());

            let file_id = load_file_or_exit(&mut driver, term_file);
            let status = driver.normalise_and_emit_term(file_id);

            std::process::exit(status.exit_code());
        }
    }
}
