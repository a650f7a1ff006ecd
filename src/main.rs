//! minigit - command-line front end.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use minigit::repo::{RepoConfig, Repository};
use minigit::storage::{format_entry, BlobMap, Commit, CommitId, HashAlgorithm};

#[derive(Parser, Debug)]
#[command(version, about = "A minimal content-addressed commit history", long_about = None)]
struct Args {
    /// Metadata directory
    #[arg(short, long, global = true, env = "MINIGIT_DIR", default_value = ".minigit")]
    dir: PathBuf,

    /// Digest for new commits (sha256 or blake3)
    #[arg(long = "hash", global = true, env = "MINIGIT_HASH", default_value = "sha256")]
    hash_algorithm: HashAlgorithm,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty repository
    Init {
        /// Branch HEAD starts on
        #[arg(short, long, default_value = "main")]
        branch: String,
    },
    /// Record a commit on top of HEAD
    Commit {
        #[arg(short, long)]
        message: String,
        /// Tracked file and its content hash, as FILE=HASH
        #[arg(long = "blob", value_name = "FILE=HASH", value_parser = parse_blob)]
        blobs: Vec<(String, String)>,
        /// Second parent, making this a merge commit
        #[arg(long, value_name = "HASH")]
        merge: Option<String>,
    },
    /// Show first-parent history from HEAD
    Log {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// List branches, or create one at HASH (default: HEAD)
    Branch {
        name: Option<String>,
        #[arg(value_name = "HASH")]
        at: Option<String>,
    },
    /// Attach HEAD to a branch
    Switch { name: String },
    /// Print one commit
    Show {
        hash: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the current branch and commit
    Status,
}

fn parse_blob(value: &str) -> Result<(String, String), String> {
    match value.rsplit_once('=') {
        Some((file, hash)) if !file.is_empty() && !hash.is_empty() => {
            Ok((file.to_string(), hash.to_string()))
        }
        _ => Err(format!("expected FILE=HASH, got '{}'", value)),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_repo(config: RepoConfig) -> Result<Repository> {
    let dir = config.path.clone();
    Repository::open_with_config(config)
        .with_context(|| format!("cannot open {} (run `minigit init` first)", dir.display()))
}

fn run(args: Args) -> Result<ExitCode> {
    let config = RepoConfig::new(&args.dir).hash_algorithm(args.hash_algorithm);

    match args.command {
        Commands::Init { branch } => {
            let repo = Repository::init_with_config(config.default_branch(branch.as_str()))?;
            println!(
                "Initialized empty repository in {} (branch {})",
                repo.path().display(),
                branch
            );
        }
        Commands::Commit {
            message,
            blobs,
            merge,
        } => {
            let repo = open_repo(config)?;
            let blobs: BlobMap = blobs.into_iter().collect();
            let commit = match merge {
                Some(other) => repo.commit_merge(message, &CommitId::new(other), blobs)?,
                None => repo.commit(message, blobs)?,
            };
            let branch = repo
                .current_branch()?
                .unwrap_or_else(|| "detached HEAD".to_string());
            println!("[{} {}] {}", branch, commit.hash().short(), commit.summary());
        }
        Commands::Log { limit, json } => {
            let repo = open_repo(config)?;
            let outcome = repo.log(limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.commits)?);
            } else {
                for commit in &outcome.commits {
                    print!("{}", format_entry(commit));
                }
            }
            if let Some(e) = outcome.error {
                eprintln!("Error: {}", e);
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Branch { name: None, .. } => {
            let repo = open_repo(config)?;
            let current = repo.current_branch()?;
            for branch in repo.branches()? {
                let marker = if current.as_deref() == Some(branch.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {}", marker, branch);
            }
        }
        Commands::Branch {
            name: Some(name),
            at,
        } => {
            let repo = open_repo(config)?;
            let at = at.map(CommitId::new);
            let branch = repo.create_branch(&name, at.as_ref())?;
            println!("Created branch {}", branch);
        }
        Commands::Switch { name } => {
            let repo = open_repo(config)?;
            repo.switch_branch(&name)?;
            println!("Switched to branch {}", name);
        }
        Commands::Show { hash, json } => {
            let repo = open_repo(config)?;
            let commit = repo.show(&CommitId::new(hash))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&commit)?);
            } else {
                print_commit(&commit);
            }
        }
        Commands::Status => {
            let repo = open_repo(config)?;
            let status = repo.status()?;
            match (&status.branch, status.detached) {
                (Some(branch), _) => println!("On branch {}", branch),
                (None, true) => println!("HEAD detached"),
                (None, false) => println!("No HEAD"),
            }
            match &status.head {
                Some(head) => println!("Current commit: {}", head),
                None => println!("No commits yet"),
            }
            println!("Stored commits: {}", status.stored_commits);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_commit(commit: &Commit) {
    print!("{}", format_entry(commit));
    if commit.blobs().is_empty() {
        return;
    }
    println!("Files:");
    for (file, hash) in commit.blobs() {
        println!("  {}  {}", hash, file);
    }
}
