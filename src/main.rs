use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use mirrorsync::cli::Cli;
use mirrorsync::output::{self, Verbosity};
use mirrorsync::scheduler::{self, Scheduler};
use mirrorsync::{MirrorContext, logging};
use std::io;
use std::process;
use tracing::{error, info};

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        print_completions(shell, &mut Cli::command());
        return Ok(0);
    }

    output::set_verbosity(if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    });

    let config = cli.resolve_config()?;

    // Roots are validated before the log file is opened so a misconfigured
    // invocation leaves nothing behind.
    let ctx = MirrorContext::new(config)?;
    // -q quiets the terminal only; the log file keeps every mutation
    let stdout_level = if cli.quiet {
        "warn"
    } else {
        ctx.config.logging.level.as_str()
    };
    logging::init(
        ctx.config.logging.file.as_deref(),
        &ctx.config.logging.level,
        stdout_level,
    )?;
    info!(
        "Synchronization initialized with: {}",
        ctx.config.describe()
    );

    if cli.once {
        let result = ctx.run_pass()?;
        output::print_pass_summary(1, &result);
        return Ok(i32::from(result.has_failures()));
    }

    let scheduler = Scheduler::new(ctx.config.sync.interval_duration());
    scheduler::install_signal_handlers(&scheduler.shutdown_handle())?;

    scheduler.run(|pass| match ctx.try_run_pass() {
        Ok(Some(result)) => output::print_pass_summary(pass, &result),
        Ok(None) => output::warning(&format!(
            "Pass {pass}: skipped, another process is synchronizing this replica"
        )),
        Err(e) => error!("Pass {pass} could not start: {e:#}"),
    });

    Ok(0)
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
