pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "permitctl")]
#[command(about = "Operator tooling for the Utility Permit API database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "DATABASE_URL", help = "PostgreSQL connection string")]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending schema migrations")]
    Migrate,

    #[command(about = "Load the demo organization, users, tickets and audit history")]
    Seed {
        #[arg(long, help = "Apply migrations before seeding")]
        migrate: bool,
    },

    #[command(about = "Print the stored form of a password")]
    HashPassword {
        #[arg(help = "Plain-text password")]
        password: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let database_url = cli.database_url.clone();

    match cli.command {
        Commands::Migrate => commands::migrate(database_url, output_format).await,
        Commands::Seed { migrate } => commands::seed(database_url, migrate, output_format).await,
        Commands::HashPassword { password } => commands::hash_password(&password, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["permitctl", "--json", "seed", "--migrate"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Seed { migrate: true }));

        let cli = Cli::try_parse_from(["permitctl", "hash-password", "hunter22"]).unwrap();
        assert!(matches!(cli.command, Commands::HashPassword { ref password } if password == "hunter22"));
    }
}
