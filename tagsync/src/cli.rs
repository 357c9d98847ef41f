//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tagsync_common::config;

#[derive(Parser)]
#[command(name = "tagsync", about = "Music taxonomy sync tool", version)]
pub struct Cli {
    /// Data folder holding the local SQLite databases
    #[arg(long, global = true, env = config::DATA_DIR_ENV)]
    pub data_dir: Option<String>,

    /// Database name within the data folder
    #[arg(long, global = true, default_value = config::DEFAULT_DATABASE)]
    pub database: String,

    /// Tagging server base URL
    #[arg(long, global = true, env = config::SERVER_URL_ENV)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database and its taxonomy tables
    SetupDb,
    /// Create an empty database file (fails if it exists)
    CreateDb,
    /// Delete a database file (fails if it is missing)
    DropDb,
    /// List databases in the data folder
    ListDbs,
    /// Import music rows from a CSV file into the music_files table
    ImportData {
        /// CSV file with a header row including a `dir` column
        #[arg(long)]
        csv: PathBuf,
    },
    /// Build the tag taxonomy from a CSV file's columns
    ImportTags {
        #[arg(long)]
        csv: PathBuf,
        /// Where to create the taxonomy
        #[arg(long, value_parser = ["local", "remote"], default_value = "local")]
        target: String,
    },
    /// Tag local items from a CSV file's taxonomy columns
    TagItems {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Push local item-tag associations to the tagging server
    PushTags,
    /// Replace the local mirror with the server's current state
    Clone,
    /// Replace only the local items from the server
    CloneItems,
    /// Compare the local mirror against the server
    Verify {
        /// Number of items to spot-check individually
        #[arg(long, default_value_t = 25)]
        sample_size: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_import_tags_target_defaults_to_local() {
        let cli = Cli::parse_from(["tagsync", "import-tags", "--csv", "music.csv"]);
        match cli.command {
            Command::ImportTags { target, .. } => assert_eq!(target, "local"),
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_verify_sample_size_default() {
        let cli = Cli::parse_from(["tagsync", "verify"]);
        match cli.command {
            Command::Verify { sample_size } => assert_eq!(sample_size, 25),
            _ => panic!("wrong subcommand"),
        }
    }
}
