#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
#![allow(clippy::struct_excessive_bools)]

use clap::{ArgAction, CommandFactory as _, Parser, ValueHint, value_parser};
use clap_complete::aot::{Shell, generate};
use recls::{
    EntryTypes, EntryTypesParser, Printer, SearchBuilder, SearchError, SearchHandle,
    calc_directory_size,
};
use std::{ffi::OsString, io::stdout, process::ExitCode};

#[cfg(all(
    feature = "mimalloc",
    any(target_os = "linux", target_os = "macos", target_os = "android")
))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const TYPES: [&str; 5] = [
    "f:Regular File",
    "d:Directory",
    "l:Symlink",
    "s:Device, pipe or socket",
    "a:All",
];

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"), about)]
struct Args {
    #[arg(
        value_name = "PATTERN",
        help = "Glob to match names against, several globs may be separated with '|'",
        default_value = "*",
        index = 1
    )]
    pattern: String,

    #[arg(
        value_name = "PATH",
        help = "Directory to search",
        value_hint = ValueHint::DirPath,
        default_value = ".",
        index = 2
    )]
    directory: OsString,

    #[arg(
        short = 'R',
        long = "no-recursive",
        help = "Only list the top directory"
    )]
    no_recursive: bool,

    #[arg(short = 'i', long = "ignore-case", help = "Match names case insensitively")]
    ignore_case: bool,

    #[arg(
        short = 't',
        long = "type",
        action = ArgAction::Append,
        value_parser = EntryTypesParser,
        help = format!("Entry types to list (can use multiple times), available options are {TYPES:?}"),
    )]
    types: Vec<EntryTypes>,

    #[arg(
        short = 'd',
        long = "max-depth",
        help = "Descend at most this many levels, 0 for no limit"
    )]
    max_depth: Option<u32>,

    #[arg(short = 'L', long = "follow", help = "Descend into symlinked directories")]
    follow: bool,

    #[arg(
        short = 'H',
        long = "hidden-off",
        help = "Skip names starting with a dot, and do not descend into them"
    )]
    hidden_off: bool,

    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "GLOB",
        action = ArgAction::Append,
        help = "Skip names matching this glob (can use multiple times)"
    )]
    exclude: Vec<String>,

    #[arg(short = 'l', long = "long", help = "Show type, size and modification time")]
    long: bool,

    #[arg(short = '0', long = "print0", help = "Separate results with NUL, for xargs -0")]
    print0: bool,

    #[arg(short = 'n', long = "limit", help = "Stop after this many results")]
    limit: Option<usize>,

    #[arg(long = "no-colour", alias = "no-color", help = "Never colour the output")]
    no_colour: bool,

    #[arg(long = "size", help = "Print the total size of the files under PATH instead")]
    size: bool,

    #[arg(
        long = "generate",
        action = ArgAction::Set,
        value_parser = value_parser!(Shell),
        help = "Generate shell completions"
    )]
    generate: Option<Shell>,

    #[arg(short = 'q', long = "quiet", help = "Do not report skipped directories or entries")]
    quiet: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(generator) = args.generate {
        let mut cmd = Args::command();
        let name = cmd.get_name().to_owned();
        generate(generator, &mut cmd, name, &mut stdout());
        return ExitCode::SUCCESS;
    }

    // RECLS_LOG overrides, e.g. RECLS_LOG=debug to trace descent
    let default_level = if args.quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("RECLS_LOG", default_level))
        .format_timestamp(None)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("recls: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), SearchError> {
    if args.size {
        let total = calc_directory_size(&args.directory)?;
        println!("{total}\t{}", args.directory.to_string_lossy());
        return Ok(());
    }

    let entry_types = args
        .types
        .iter()
        .copied()
        .reduce(|acc, t| acc | t)
        .unwrap_or_default();

    let spec = args
        .exclude
        .iter()
        .fold(SearchBuilder::new(&args.directory), |builder, glob| {
            builder.exclude(glob)
        })
        .pattern(&args.pattern)
        .recursive(!args.no_recursive)
        .case_sensitive(!args.ignore_case)
        .entry_types(entry_types)
        .max_depth(args.max_depth)
        .follow_symlinks(args.follow)
        .show_hidden(!args.hidden_off)
        .build()?;

    let search = SearchHandle::start(spec)?;
    let printed = Printer::new()
        .limit(args.limit)
        .nocolour(args.no_colour)
        .null_terminated(args.print0)
        .long(args.long)
        .print(search);

    match printed {
        // `recls | head` closes the pipe early
        Err(error) if error.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(error) => Err(SearchError::Io {
            path: "<stdout>".into(),
            source: error,
        }),
        Ok(count) => {
            log::debug!("printed {count} entries");
            Ok(())
        }
    }
}
