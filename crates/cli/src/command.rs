//! Argument parsing.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use engine::AgentOptions;

use crate::{ExitStatus, PROGRAM_NAME};

const HELP_TEXT: &str = concat!(
    "usage: lsync [--version] [--help] <command> [options...]\n",
    "\n",
    "Commands:\n",
    "  watch    Mirror SRC into DEST and keep it live until interrupted.\n",
    "  version  Print the version and exit.\n",
);

const WATCH_HELP_TEXT: &str = concat!(
    "usage: lsync watch [options...]\n",
    "\n",
    "Options:\n",
    "  --src, -s DIR    Path to SRC directory.\n",
    "  --dest, -d DIR   Path to DEST directory.\n",
    "  --recursive, -r  Watch recursively under SRC.\n",
    "  --verbose        Report file system events verbosely.\n",
    "  --no-fsync       Do not flush copied files to disk.\n",
    "  --no-rescan      Do not rescan SRC when the watcher drops events.\n",
    "  -v               Increase diagnostic logging (repeatable).\n",
);

/// What the user asked for.
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Invocation {
    Help(&'static str),
    Version,
    Watch(WatchRequest),
}

/// Validated arguments of the `watch` command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct WatchRequest {
    pub(crate) source: PathBuf,
    pub(crate) dest: PathBuf,
    pub(crate) options: AgentOptions,
    pub(crate) log_level: u8,
}

/// Reasons parsing stops before a command runs.
#[derive(Debug)]
pub(crate) enum ParseFailure {
    Flags(clap::Error),
    MissingCommand,
    MissingSource,
    MissingDest,
}

impl ParseFailure {
    pub(crate) const fn status(&self) -> ExitStatus {
        match self {
            Self::Flags(_) | Self::MissingCommand => ExitStatus::ParseFlags,
            Self::MissingSource | Self::MissingDest => ExitStatus::BadArguments,
        }
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flags(error) => write!(f, "{}", error.to_string().trim_end()),
            Self::MissingCommand => write!(f, "{}", HELP_TEXT.trim_end()),
            Self::MissingSource => f.write_str("missing SRC."),
            Self::MissingDest => f.write_str("missing DEST."),
        }
    }
}

fn help_arg() -> Arg {
    Arg::new("help")
        .long("help")
        .short('h')
        .help("Show this help message and exit.")
        .action(ArgAction::SetTrue)
}

fn watch_command() -> Command {
    Command::new("watch")
        .disable_help_flag(true)
        .arg(help_arg())
        .arg(
            Arg::new("src")
                .long("src")
                .short('s')
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to SRC directory."),
        )
        .arg(
            Arg::new("dest")
                .long("dest")
                .short('d')
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Path to DEST directory."),
        )
        .arg(
            Arg::new("recursive")
                .long("recursive")
                .short('r')
                .help("Watch recursively under SRC.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Report file system events verbosely.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-fsync")
                .long("no-fsync")
                .help("Do not flush copied files to disk.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-rescan")
                .long("no-rescan")
                .help("Do not rescan SRC when the watcher drops events.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log")
                .short('v')
                .help("Increase diagnostic logging.")
                .action(ArgAction::Count),
        )
}

/// Builds the `clap` command used for parsing.
fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .arg(help_arg())
        .arg(
            Arg::new("version")
                .long("version")
                .short('V')
                .help("Output version information and exit.")
                .action(ArgAction::SetTrue),
        )
        .subcommand(watch_command())
        .subcommand(Command::new("version").about("Print the version and exit."))
}

/// Parses command-line arguments, program name first.
pub(crate) fn parse_args<I, S>(arguments: I) -> Result<Invocation, ParseFailure>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command()
        .try_get_matches_from(args)
        .map_err(ParseFailure::Flags)?;

    if matches.get_flag("help") {
        return Ok(Invocation::Help(HELP_TEXT));
    }
    if matches.get_flag("version") {
        return Ok(Invocation::Version);
    }

    match matches.remove_subcommand() {
        Some((name, _)) if name == "version" => Ok(Invocation::Version),
        Some((_, watch)) => parse_watch(watch),
        None => Err(ParseFailure::MissingCommand),
    }
}

fn parse_watch(mut matches: ArgMatches) -> Result<Invocation, ParseFailure> {
    if matches.get_flag("help") {
        return Ok(Invocation::Help(WATCH_HELP_TEXT));
    }

    let source = matches
        .remove_one::<PathBuf>("src")
        .ok_or(ParseFailure::MissingSource)?;
    let dest = matches
        .remove_one::<PathBuf>("dest")
        .ok_or(ParseFailure::MissingDest)?;

    let options = AgentOptions::new()
        .recursive(matches.get_flag("recursive"))
        .verbose(matches.get_flag("verbose"))
        .fsync(!matches.get_flag("no-fsync"))
        .rescan_on_overflow(!matches.get_flag("no-rescan"));

    Ok(Invocation::Watch(WatchRequest {
        source,
        dest,
        options,
        log_level: matches.get_count("log"),
    }))
}
