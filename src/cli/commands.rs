use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "saxofolio",
    version,
    about = "Sync Saxo Bank positions into Ghostfolio"
)]
pub struct Cli {
    /// Falls back to the OPERATION setting when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Import new Saxo positions into the Ghostfolio account and update its balance
    Sync,
    /// Print the Ghostfolio account's activities as JSON
    Activities,
    /// Delete every activity of the Ghostfolio account
    DeleteActivities,
    /// Authorize against Saxo in a browser and store the tokens
    Auth,
    /// List Saxo accounts and their account keys
    Accounts,
}
