// Entrypoint for the CLI application.
// - Keeps `main` small: parse, build the client and hand both to the UI.
// - Every failure comes back here as a `CliError`; this is the only place
//   that prints it and picks the exit code.

use std::io::IsTerminal;
use std::process::ExitCode;

use catbox_cli::api::ApiClient;
use catbox_cli::cli::Invocation;
use catbox_cli::config::Config;
use catbox_cli::credential::CredentialStore;
use catbox_cli::error::CliError;
use catbox_cli::ui::{App, Outcome, TerminalPrompt};
use crossterm::style::Stylize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    if let Err(err) = init_logging() {
        eprintln!("failed to set up logging: {err:#}");
    }

    match run() {
        Ok(outcome) => {
            debug!(?outcome, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            // plain label when stderr is piped or redirected
            let label = if std::io::stderr().is_terminal() {
                "ERROR:".red().bold().to_string()
            } else {
                "ERROR:".to_string()
            };
            eprintln!("{label} {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run() -> Result<Outcome, CliError> {
    // Option errors are reported before configuration or files are touched.
    let invocation = Invocation::parse_from(std::env::args_os())?;
    let config = Config::from_env()?;
    let api = ApiClient::new(&config)?;
    let store = CredentialStore::new(&config.credential_path);

    App::new(api, TerminalPrompt, store).run(invocation)
}

fn init_logging() -> anyhow::Result<()> {
    // RUST_LOG=debug shows what the client is doing; quiet by default so the
    // progress line stays readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}
