/*!
 * artship CLI - Command Line Interface
 *
 * Version: 0.3.0
 */

use clap::{Parser, Subcommand, ValueEnum};
use artship::{
    config::{LogLevel, TransferConfig},
    deploy::{Coordinates, Deployer},
    error::{ArtshipError, Result, EXIT_SUCCESS},
    fileops::{self, CleanupList, CopyRequest, Replacement},
    logging,
    protocol::{self, parse_location, ftp::FileType},
    resolver::{Artifact, ArtifactResolver, RepositoryResolver},
};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "artship")]
#[command(version, about = "Move build artifacts over FTP, HTTP and local paths with milestone progress", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bytes read per copy iteration
    #[arg(long, value_name = "BYTES", global = true)]
    chunk_size: Option<usize>,

    /// Progress milestone in KiB (default: 1024)
    #[arg(long, value_name = "KIB", global = true)]
    milestone_kb: Option<u64>,

    /// Show a progress bar instead of milestone log lines
    #[arg(long, global = true)]
    progress: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stdout)
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a remote file (ftp://, http(s)://, file://) to a local path
    Get {
        remote: String,
        local: PathBuf,

        /// Transfer in binary mode (FTP)
        #[arg(long)]
        binary: bool,
    },

    /// Upload a local file to a remote location
    Put {
        local: PathBuf,
        remote: String,

        /// Transfer in binary mode (FTP)
        #[arg(long)]
        binary: bool,
    },

    /// Copy a file, optionally filtering and replacing its content
    Copy {
        source: PathBuf,
        destination: String,

        /// Leave the destination alone when length and modification time match
        #[arg(long)]
        skip_identical: bool,

        /// Replacement as FROM=TO (repeatable, applied in order)
        #[arg(long = "replace", value_name = "FROM=TO")]
        replacements: Vec<String>,

        /// Treat FROM in --replace as a regular expression
        #[arg(long)]
        regex: bool,

        /// Property for filtering as KEY=VALUE (repeatable)
        #[arg(long = "property", value_name = "KEY=VALUE")]
        properties: Vec<String>,

        /// Replace ${key} and @key@ tokens with properties
        #[arg(long)]
        filter: bool,

        /// Transfer in binary mode (FTP destinations)
        #[arg(long)]
        binary: bool,
    },

    /// Deploy a file into a Maven-layout repository
    Deploy {
        file: PathBuf,

        /// Repository URL or directory
        #[arg(long)]
        url: String,

        #[arg(long)]
        group_id: String,

        #[arg(long)]
        artifact_id: String,

        #[arg(long)]
        version: String,

        #[arg(long)]
        classifier: Option<String>,
    },

    /// Resolve group:artifact:version[:type[:classifier]] to a local file
    Resolve {
        artifact: String,

        /// Do not contact remote repositories
        #[arg(long)]
        offline: bool,
    },

    /// Delete files or directories, retrying leftovers before exit
    Clean {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let cleanup = CleanupList::new();
    let mut code = match run(&cleanup) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    let leftovers = cleanup.drain();
    if leftovers > 0 {
        eprintln!("Warning: {} path(s) could not be deleted", leftovers);
        if code == EXIT_SUCCESS {
            code = artship::error::EXIT_PARTIAL;
        }
    }
    std::process::exit(code);
}

fn run(cleanup: &CleanupList) -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => TransferConfig::from_file(path)?,
        None => TransferConfig::default(),
    };
    apply_overrides(&cli, &mut config);
    logging::init_logging(&config)?;

    match cli.command {
        Commands::Get { remote, local, binary } => {
            if binary {
                config.ftp.file_type = FileType::Binary;
            }
            let location = parse_location(&remote)?;
            match protocol::download(&location, &local, &config)? {
                Some(bytes) => {
                    println!("{} -> {} ({} bytes)", location, local.display(), bytes);
                    Ok(())
                }
                None => Err(ArtshipError::Resolution(format!("{} not found", location))),
            }
        }
        Commands::Put { local, remote, binary } => {
            if binary {
                config.ftp.file_type = FileType::Binary;
            }
            let location = parse_location(&remote)?;
            let bytes = protocol::upload(&local, &location, &config)?;
            println!("{} -> {} ({} bytes)", local.display(), location, bytes);
            Ok(())
        }
        Commands::Copy {
            source,
            destination,
            skip_identical,
            replacements,
            regex,
            properties,
            filter,
            binary,
        } => {
            if binary {
                config.ftp.file_type = FileType::Binary;
            }
            let mut request = CopyRequest::new()
                .skip_identical(skip_identical)
                .verbose(true);
            for replacement in &replacements {
                request = request.replace(Replacement::parse(replacement, regex)?);
            }
            if filter {
                request = request.filter(parse_properties(&properties)?);
            }

            if !fileops::copy_filtered(&source, &destination, &request, &config)? {
                println!("{} skipped (identical)", source.display());
            }
            Ok(())
        }
        Commands::Deploy {
            file,
            url,
            group_id,
            artifact_id,
            version,
            classifier,
        } => {
            let coordinates = Coordinates::for_file(&file, &group_id, &artifact_id, &version)?
                .with_classifier(classifier.as_deref().filter(|c| fileops::is_set(Some(*c))));
            let receipt = Deployer::new(config).deploy(&file, &coordinates, &url)?;
            println!("{}", receipt.artifact_url);
            Ok(())
        }
        Commands::Resolve { artifact, offline } => {
            if offline {
                config.repository.offline = true;
            }
            let artifact = Artifact::parse(&artifact)?;
            let resolver = RepositoryResolver::from_config(&config);
            match resolver.resolve_file(&artifact)? {
                Some(path) => {
                    println!("{}", path.display());
                    Ok(())
                }
                None => Err(ArtshipError::Resolution(format!(
                    "{} not found using {}",
                    artifact.coordinates(),
                    resolver.name()
                ))),
            }
        }
        Commands::Clean { paths } => {
            let mut all_deleted = true;
            for path in &paths {
                all_deleted &= fileops::delete(path, Some(cleanup), false)?;
            }
            if !all_deleted {
                eprintln!("Some paths are still in use; retrying before exit");
            }
            Ok(())
        }
    }
}

fn apply_overrides(cli: &Cli, config: &mut TransferConfig) {
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(milestone_kb) = cli.milestone_kb {
        config.milestone_unit = milestone_kb.saturating_mul(1024);
    }
    if cli.progress {
        config.show_progress = true;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    if cli.verbose {
        config.verbose = true;
    }
}

fn parse_properties(pairs: &[String]) -> Result<HashMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| ArtshipError::Config(format!("Property must look like KEY=VALUE: {}", pair)))
        })
        .collect()
}
