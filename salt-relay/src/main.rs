//! salt-relay command line.
//!
//! ```bash
//! salt-relay '*' test.ping
//! salt-relay --tsr manage.up
//! salt-relay --tsk -L
//! salt-relay --tse uptime
//! ```
//!
//! Settings come from `$SALT_RELAY_CONF` or `salt_relay.json`, falling back
//! to `$TABLESALTCONF` and `ts_conf.json`. Set `RUST_LOG=debug` for verbose
//! output on stderr.

use std::ffi::OsString;
use std::process::ExitCode;

use clap::Parser;

use salt_relay::command::{self, Program, RemoteCommand};
use salt_relay::config;
use salt_relay::relay;

/// Relay salt commands to a salt master over SSH.
#[derive(Parser, Debug)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Run `salt-run` instead of `salt`
    #[arg(long = "tsr")]
    runner: bool,

    /// Run `salt-key` instead of `salt`
    #[arg(long = "tsk")]
    key: bool,

    /// Run the arguments as the whole command, without an executable prefix
    #[arg(long = "tse")]
    bare: bool,

    /// Arguments passed to the remote command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    /// Build the remote command, honouring selection flags given after the arguments.
    fn into_command(self) -> RemoteCommand {
        let (late, args) = command::extract_selection_flags(self.args);
        let program = Program::select(
            self.runner || late.runner,
            self.key || late.key,
            self.bare || late.bare,
        );
        RemoteCommand::new(program, args)
    }
}

/// Parse `argv` into the remote command. Usage errors are printed and map
/// to the failure exit code rather than clap's own.
fn command_from<I, T>(argv: I) -> Result<RemoteCommand, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(argv)
        .map(Cli::into_command)
        .map_err(|e| {
            e.print().ok();
            ExitCode::FAILURE
        })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let command = match command_from(std::env::args_os()) {
        Ok(command) => command,
        Err(code) => return code,
    };

    match relay::run_with_config_file(&config::config_path(), command).await {
        Ok(response) => {
            println!("{}", response.result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
