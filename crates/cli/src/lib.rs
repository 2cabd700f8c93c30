pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "simba",
    about = "Simba operator CLI",
    long_about = "Apply migrations, inspect configuration, and manage which users see \
                  the team mood dashboard.",
    after_help = "Examples:\n  simba migrate\n  simba config\n  simba promote U024BE7LH"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Give a user the manager dashboard on the home tab")]
    Promote {
        #[arg(help = "Slack user id, e.g. U024BE7LH")]
        slack_user_id: String,
    },
    #[command(about = "Return a user to the individual home tab")]
    Demote {
        #[arg(help = "Slack user id, e.g. U024BE7LH")]
        slack_user_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Promote { slack_user_id } => commands::manager::run(&slack_user_id, true),
        Command::Demote { slack_user_id } => commands::manager::run(&slack_user_id, false),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn promote_requires_a_user_id() {
        assert!(Cli::try_parse_from(["simba", "promote"]).is_err());

        let cli = Cli::try_parse_from(["simba", "demote", "U1"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Demote { ref slack_user_id } if slack_user_id == "U1"
        ));
    }
}
