use std::path::Path;

use clap::Parser;

/// Everything after the program name is the command to run, so clap's own
/// help and version flags are off and the special forms are handled in
/// [`Cli::invocation`].
#[derive(Parser, Debug, Clone)]
#[command(
    name = "testbox",
    about = "Run a project's test command inside a disposable container",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Cli {
    /// Command to execute inside the container.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// What the arguments ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// No command given.
    Hint,
    Version,
    Help,
    Run(Vec<String>),
}

impl Cli {
    pub fn invocation(self) -> Result<Invocation, shell_words::ParseError> {
        let mut args = self.command;
        if args.len() != 1 {
            return Ok(if args.is_empty() {
                Invocation::Hint
            } else {
                Invocation::Run(args)
            });
        }

        let arg = args.remove(0);
        match arg.trim_start_matches('-').to_ascii_lowercase().as_str() {
            "version" | "v" => return Ok(Invocation::Version),
            "help" | "h" => return Ok(Invocation::Help),
            _ => {}
        }

        // `testbox "go test ./..."` arrives as one argument.
        let argv = shell_words::split(&arg)?;
        Ok(if argv.is_empty() {
            Invocation::Hint
        } else {
            Invocation::Run(argv)
        })
    }
}

/// Base name the binary was invoked as.
pub fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .and_then(|arg0| Path::new(arg0).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "testbox".to_string())
}

pub fn hint(program: &str) -> String {
    format!("please enter the test command, such as `{program} go test ./...`")
}

pub fn usage(program: &str) -> Vec<String> {
    vec![
        format!("Usage: {program} [OPTION | COMMAND]"),
        "Option:".to_string(),
        "    -h --help\tPrint help and quit".to_string(),
        "    -v --version\tPrint version information and quit".to_string(),
        "COMMAND: command to be execute".to_string(),
        format!("    {program} go test ./..."),
        format!("    {program} golangci-lint run"),
    ]
}
