use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct OwnerArgs {
    /// Owner of the files
    #[clap(short = 'u', long = "user")]
    pub owner: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start clouddrive as a service.
    Daemon {
        /// Listen address, overrides daemon.addr from config
        #[clap(long)]
        addr: Option<String>,
    },

    /// Upload and tag files
    Upload {
        #[clap(flatten)]
        owner: OwnerArgs,

        /// Files to upload
        #[clap(required = true)]
        paths: Vec<PathBuf>,
    },

    /// List stored files with their tags
    List {
        #[clap(flatten)]
        owner: OwnerArgs,
    },

    /// Delete a stored file and its tags
    Delete {
        #[clap(flatten)]
        owner: OwnerArgs,

        filename: String,

        /// Don't ask for confirmation
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Regenerate tags of a stored file
    Retag {
        #[clap(flatten)]
        owner: OwnerArgs,

        filename: String,
    },

    /// Group files into AI-invented categories
    Categorize {
        #[clap(flatten)]
        owner: OwnerArgs,
    },

    /// Find files by meaning
    Search {
        #[clap(flatten)]
        owner: OwnerArgs,

        /// Free-text query
        #[clap(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
}

impl Command {
    /// Commands that call the model and need a connected client.
    pub fn needs_ai(&self) -> bool {
        matches!(
            self,
            Command::Daemon { .. }
                | Command::Upload { .. }
                | Command::Retag { .. }
                | Command::Categorize { .. }
                | Command::Search { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_query_words() {
        let args = Args::try_parse_from(["clouddrive", "search", "-u", "alice", "tax", "2023"]).unwrap();
        match args.command {
            Command::Search { owner, query } => {
                assert_eq!(owner.owner, "alice");
                assert_eq!(query.join(" "), "tax 2023");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_upload_requires_paths() {
        assert!(Args::try_parse_from(["clouddrive", "upload", "-u", "alice"]).is_err());
    }

    #[test]
    fn test_needs_ai() {
        let args = Args::try_parse_from(["clouddrive", "list", "--user", "alice"]).unwrap();
        assert!(!args.command.needs_ai());

        let args = Args::try_parse_from(["clouddrive", "delete", "-u", "alice", "a.pdf", "-y"]).unwrap();
        assert!(!args.command.needs_ai());

        let args = Args::try_parse_from(["clouddrive", "categorize", "-u", "alice"]).unwrap();
        assert!(args.command.needs_ai());
    }
}
