use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "arbor",
    about = "arborfs: a copy-on-write filesystem over a content-addressed object store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository directory
    #[arg(long, global = true, env = "ARBOR_REPO", default_value = ".")]
    pub repo: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize an empty repository
    Init(InitArgs),
    /// Show the kind, size and object id of a path
    Stat(PathArgs),
    /// List a directory
    Ls(LsArgs),
    /// Print file contents
    Cat(CatArgs),
    /// Write bytes into a file, creating it if needed
    Write(WriteArgs),
    /// Create an empty file
    Touch(PathArgs),
    /// Create a directory
    Mkdir(MkdirArgs),
    /// Set a file's length, cutting or zero-padding it
    Truncate(TruncateArgs),
    /// Remove a file
    Rm(PathArgs),
    /// Remove an empty directory
    Rmdir(PathArgs),
    /// Print the current root tree id
    Root,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize instead of --repo
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Args)]
pub struct LsArgs {
    #[arg(default_value = "/")]
    pub path: String,
    /// Show kind and size of each entry
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Args)]
pub struct CatArgs {
    pub path: String,
    #[arg(long, default_value = "0")]
    pub offset: u64,
    /// Bytes to read; the rest of the file if omitted
    #[arg(long)]
    pub size: Option<u64>,
}

#[derive(Args)]
pub struct WriteArgs {
    pub path: String,
    /// Literal data to write; stdin is used when neither --data nor --file is given
    #[arg(short, long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the data from a local file
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    #[arg(long, default_value = "0")]
    pub offset: u64,
}

#[derive(Args)]
pub struct MkdirArgs {
    pub path: String,
    /// Create missing parents too, and accept an existing directory
    #[arg(short, long)]
    pub parents: bool,
}

#[derive(Args)]
pub struct TruncateArgs {
    pub path: String,
    pub len: u64,
}
