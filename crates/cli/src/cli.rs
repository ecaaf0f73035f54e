use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use storyreel_core::batch::BatchStatus;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate narrated videos from text", long_about = None)]
pub struct Args {
    /// Execution engine base URL
    #[arg(long, env = "ENGINE_URL", global = true)]
    pub engine_url: Option<String>,

    /// Batch service base URL
    #[arg(long, env = "BATCH_SERVICE_URL", global = true)]
    pub batch_url: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a video job and follow it to the end
    Generate(GenerateArgs),

    /// Show a job's status, steps and recent logs
    Status {
        job_id: String,
        /// Number of log lines to show
        #[arg(long, default_value_t = 10)]
        logs: usize,
    },

    /// Ask the engine to cancel a job
    Cancel { job_id: String },

    /// Delete a job on the engine
    Delete { job_id: String },

    /// Work with batches on the batch service
    #[command(subcommand)]
    Batch(BatchCommand),
}

#[derive(ClapArgs, Debug)]
pub struct GenerateArgs {
    /// Script text; read from --file or stdin when omitted
    #[arg(long, conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the script from a file (`-` for stdin)
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub channel: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct BatchInput {
    /// Script files, one batch item each; the file stem becomes the title
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Batch name
    #[arg(long, default_value = "Batch")]
    pub name: String,

    #[arg(long)]
    pub channel: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum BatchCommand {
    /// Estimate duration and processing time without creating anything
    Analyze(BatchInput),

    /// Create a batch; processing starts right away
    Create {
        #[command(flatten)]
        input: BatchInput,
        /// Follow the batch after creating it
        #[arg(long)]
        watch: bool,
    },

    /// List batches, newest first
    List {
        #[arg(long)]
        status: Option<BatchStatus>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Follow a batch until it finishes
    Watch { batch_id: String },

    Pause { batch_id: String },

    Resume { batch_id: String },

    Cancel { batch_id: String },

    Delete { batch_id: String },
}
