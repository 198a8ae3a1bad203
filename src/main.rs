use std::io;
use std::process::ExitCode;

use clap::Parser;
use crossterm::tty::IsTty;
use tracing::debug;

use testbox::cli::{self, Cli, Invocation};
use testbox::console::{Icon, LineSink, stdout_console};
use testbox::error::{ConfigError, RunError};
use testbox::runner::Outcome;
use testbox::{VERSION, logging};

fn main() -> ExitCode {
    let args = Cli::parse();
    let interactive = io::stdout().is_tty();
    let mut console = stdout_console(interactive);
    let program = cli::program_name();

    let command = match args.invocation() {
        Ok(Invocation::Hint) => return say(console.as_mut(), Icon::None, &cli::hint(&program)),
        Ok(Invocation::Version) => {
            return say(
                console.as_mut(),
                Icon::None,
                &format!("{program} -- v{VERSION}"),
            );
        }
        Ok(Invocation::Help) => {
            for line in cli::usage(&program) {
                let _ = console.print_line(Icon::None, &line);
            }
            return ExitCode::SUCCESS;
        }
        Ok(Invocation::Run(command)) => command,
        Err(err) => return fail(console.as_mut(), &RunError::from(ConfigError::from(err))),
    };

    if let Err(err) = logging::init_tracing() {
        eprintln!("warning: {err:#}");
    }
    debug!(?command, interactive, "starting run");

    match testbox::run(command, interactive, console.as_mut()) {
        Ok(Outcome::Success) => say(console.as_mut(), Icon::Success, "Success!"),
        Ok(outcome @ Outcome::Failed(code)) => {
            let _ = console.print_line(Icon::Error, &format!("exit with `FAILURE`: {code}"));
            ExitCode::from(outcome.exit_code())
        }
        Err(err) => fail(console.as_mut(), &err),
    }
}

fn say(console: &mut dyn LineSink, icon: Icon, text: &str) -> ExitCode {
    match console.print_line(icon, text) {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn fail(console: &mut dyn LineSink, err: &RunError) -> ExitCode {
    if console.print_line(Icon::Error, &err.to_string()).is_err() {
        eprintln!("{err}");
    }
    ExitCode::FAILURE
}
