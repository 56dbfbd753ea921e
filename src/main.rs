use std::ffi::OsString;
use std::io::{self, Write};
use std::process;

use anyhow::Context;
use clap::{arg, command, value_parser, Arg, ArgMatches, Command};

use regex_thompson_backtrack::{Regex, RegexBuilder};

const EXIT_ERROR: i32 = 1;

fn limit_args() -> [Arg; 3] {
    [
        arg!(--"max-repeat" <N>)
            .help("Largest count accepted in {m}, {m,} and {m,n}")
            .value_parser(value_parser!(u32)),
        arg!(--"max-states" <N>)
            .help("Largest number of states the automaton may have")
            .value_parser(value_parser!(usize)),
        arg!(--"nest-limit" <N>)
            .help("Deepest nesting of groups, repetitions and alternations")
            .value_parser(value_parser!(u32)),
    ]
}

fn pattern_arg() -> Arg {
    arg!(<PATTERN>)
        .help("Pattern to compile")
        .value_parser(value_parser!(OsString))
}

fn cli() -> Command {
    command!()
        .about("Full-string regular expression matcher")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommands([
            Command::new("match")
                .about("Match a pattern against one or more inputs")
                .arg(pattern_arg())
                .arg(
                    arg!(<INPUT>...)
                        .help("Inputs that must match the whole pattern")
                        .value_parser(value_parser!(OsString)),
                )
                .args(limit_args()),
            Command::new("dot")
                .about("Output DOT (Graphviz) representation of the NFA")
                .arg(pattern_arg())
                .args(limit_args()),
        ])
}

fn compile(args: &ArgMatches) -> anyhow::Result<Regex> {
    let pattern = args.get_one::<OsString>("PATTERN").unwrap().as_encoded_bytes();
    let mut builder = RegexBuilder::new();
    if let Some(limit) = args.get_one::<u32>("max-repeat") {
        builder = builder.max_repeat(*limit);
    }
    if let Some(limit) = args.get_one::<usize>("max-states") {
        builder = builder.max_states(*limit);
    }
    if let Some(limit) = args.get_one::<u32>("nest-limit") {
        builder = builder.nest_limit(*limit);
    }
    builder
        .build(pattern)
        .with_context(|| format!("failed to compile pattern `{}`", pattern.escape_ascii()))
}

fn exec_match(args: &ArgMatches) -> anyhow::Result<()> {
    let regex = compile(args)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for input in args.get_many::<OsString>("INPUT").unwrap() {
        writeln!(out, "{}", regex.is_match(input.as_encoded_bytes()))?;
    }
    out.flush()?;
    Ok(())
}

fn exec_dot(args: &ArgMatches) -> anyhow::Result<()> {
    let regex = compile(args)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    regex.to_dot(&mut out)?;
    out.flush()?;
    Ok(())
}

fn main() {
    env_logger::init();

    let args = cli().get_matches();

    let result = match args.subcommand() {
        Some(("match", args)) => exec_match(args),
        Some(("dot", args)) => exec_dot(args),
        _ => unreachable!(),
    };

    if let Err(err) = result {
        eprintln!("error: {:#}", err);
        process::exit(EXIT_ERROR);
    }
}
