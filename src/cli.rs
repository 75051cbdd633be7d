use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory with config.yaml, knowledge base snapshots and model cache
    #[clap(long, global = true, env = "KBSEARCH_BASE_PATH")]
    pub base_path: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search laws and schemes by meaning
    Search {
        /// Free-text query
        #[clap(required = true, trailing_var_arg = true)]
        query: Vec<String>,

        /// Maximum number of results
        #[clap(short, long)]
        limit: Option<usize>,

        /// Relevance floor (exclusive)
        #[clap(short, long, allow_hyphen_values = true)]
        min_score: Option<f32>,
    },
    /// Recommend entries for a user profile by tag overlap
    Recommend {
        /// User role, matched case-sensitively against tags
        #[clap(short, long)]
        role: Option<String>,

        /// Interests, matched case-insensitively against tags.
        /// Repeat or pass a comma-separated list.
        #[clap(short, long, value_delimiter = ',')]
        interest: Vec<String>,

        /// Maximum number of recommendations
        #[clap(short, long)]
        limit: Option<usize>,
    },
    /// Start the search service.
    Serve {
        /// Address to listen on, overrides server.listen
        #[clap(long)]
        listen: Option<String>,

        /// Load the embedding model at startup instead of on first search
        #[clap(long, default_value = "false")]
        eager: bool,
    },
    /// Build a knowledge base snapshot from raw law and scheme records
    Build {
        /// JSON array of law records
        #[clap(long)]
        laws: Option<PathBuf>,

        /// JSON array of scheme records
        #[clap(long)]
        schemes: Option<PathBuf>,

        /// Output snapshot file
        #[clap(short, long)]
        output: PathBuf,
    },
}
