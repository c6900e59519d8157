//! The `hostlink` command line tool.
//!
//! Runs WebAssembly modules against the standard host environment.
//! See `hostlink --help` for usage.

use anyhow::Result;
use clap::Parser;

/// hostlink WebAssembly host bridge
#[derive(Parser)]
#[command(
    name = "hostlink",
    version,
    after_help = "If a subcommand is not provided, the `run` subcommand will be used.\n\
                  \n\
                  Usage examples:\n\
                  \n\
                  Running a module that exports `_start`:\n\
                  \n  \
                  hostlink hello.wasm\n\
                  \n\
                  Invoking a specific function (e.g. `add`) in a module:\n\
                  \n  \
                  hostlink --invoke add hello.wasm 1 2\n",

    // Lets clap parse either a subcommand or, failing that, the arguments of
    // `run` directly.
    args_conflicts_with_subcommands = true
)]
struct Hostlink {
    #[command(subcommand)]
    subcommand: Option<Subcommand>,
    #[command(flatten)]
    run: hostlink_cli::commands::RunCommand,
}

#[derive(Parser)]
enum Subcommand {
    /// Runs a WebAssembly module
    Run(hostlink_cli::commands::RunCommand),

    /// Lists a module's imports and exports
    Inspect(hostlink_cli::commands::InspectCommand),
}

impl Hostlink {
    /// Executes the command.
    pub fn execute(self) -> Result<()> {
        let subcommand = self.subcommand.unwrap_or(Subcommand::Run(self.run));

        match subcommand {
            Subcommand::Run(c) => c.execute(),
            Subcommand::Inspect(c) => c.execute(),
        }
    }
}

fn main() -> Result<()> {
    Hostlink::parse().execute()
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Hostlink::command().debug_assert()
}

#[test]
fn subcommands_take_a_module() {
    for args in [
        &["hostlink", "hello.wat"][..],
        &["hostlink", "run", "hello.wat"],
        &["hostlink", "run", "--invoke", "add", "hello.wat", "-1", "2"],
    ] {
        let cli = Hostlink::try_parse_from(args).unwrap();
        assert!(!matches!(cli.subcommand, Some(Subcommand::Inspect(_))));
    }
    let cli = Hostlink::try_parse_from(["hostlink", "inspect", "hello.wat"]).unwrap();
    assert!(matches!(cli.subcommand, Some(Subcommand::Inspect(_))));
    assert!(Hostlink::try_parse_from(["hostlink", "run"]).is_err());
    assert!(Hostlink::try_parse_from(["hostlink", "inspect"]).is_err());
}
