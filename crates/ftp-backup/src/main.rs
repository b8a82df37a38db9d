//! # ftp-backup
//! Backs up a local directory into a dated directory on an FTP or SFTP server and
//! rotates the old ones.
//!

use std::{fs, path::PathBuf, process::ExitCode};

use chrono::Utc;
use clap::{Parser, Subcommand};
use ftp_backup::{BackupRunner, Config, Protocol, RunError};
use mimalloc::MiMalloc;
use remote_store::{FtpTransport, RemoteStore, SftpTransport, Transport};
use shared::{Failure, init_logger};
use tracing::{error, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Backs up a directory to an FTP or SFTP server with yearly, monthly, weekly and daily
/// rotation.
#[derive(Parser)]
#[command(name = "ftp-backup", author, version, about, long_about = None)]
struct Cli {
    /// The config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Simulation mode, nothing is changed on the remote.
    #[arg(short = 't', long)]
    simulate: bool,

    /// Increase the log level, repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Where to write log files.
    #[arg(long, default_value = "logs")]
    log_directory: PathBuf,

    /// The local directory to back up, overriding the config.
    #[arg(short = 'D', long)]
    local_directory: Option<PathBuf>,

    /// The remote root directory, overriding the config.
    #[arg(long)]
    remote_directory: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a template config file.
    Init,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _logger = match init_logger(cli.verbose, &cli.log_directory) {
        Ok(guards) => guards,
        Err(error) => {
            eprintln!("Could not initialise logging: {error}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(Command::Init) = cli.command {
        let contents = toml::to_string_pretty(&Config::default())
            .or_log_and_panic("Could not serialize config file");
        fs::write(&cli.config, contents).or_log_and_panic("Could not create config file");
        info!("Wrote a template config to {:?}", cli.config);
        return ExitCode::SUCCESS;
    }

    // Load config
    let mut config = match Config::load_toml(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            error!("Could not load config {:?}: {error}", cli.config);
            return ExitCode::from(3);
        }
    };

    config.simulate |= cli.simulate;
    if let Some(local_directory) = cli.local_directory {
        config.local_directory = local_directory;
    }
    if let Some(remote_directory) = cli.remote_directory {
        config.remote.directory = remote_directory;
    }

    let mut runner = match BackupRunner::new(config) {
        Ok(runner) => runner,
        Err(error) => return fail(&error),
    };

    let remote = runner.config().remote.clone();
    let parameters = match remote.connection_parameters() {
        Ok(parameters) => parameters,
        Err(error) => return fail(&RunError::from(error)),
    };
    let options = runner.config().store_options();

    if options.simulate {
        info!("Simulation mode, nothing is changed on the remote");
    }

    match remote.protocol {
        Protocol::Sftp => {
            let transport = SftpTransport::new(parameters);
            run(&mut runner, RemoteStore::new(transport, options))
        }
        Protocol::Ftp => {
            let transport = FtpTransport::new(parameters, remote.ftp_options());
            run(&mut runner, RemoteStore::new(transport, options))
        }
    }
}

fn run<T: Transport>(runner: &mut BackupRunner, mut store: RemoteStore<T>) -> ExitCode {
    match runner.run(&mut store, Utc::now().date_naive()) {
        Ok(report) => {
            info!(
                "Backup into '{}' finished, {} file(s) uploaded, {} directory(s) removed",
                report.plan.new_directory,
                report.uploaded.len(),
                report.removed.len()
            );
            ExitCode::SUCCESS
        }
        Err(error) => fail(&error),
    }
}

fn fail(error: &RunError) -> ExitCode {
    error!("{error}");
    ExitCode::from(error.exit_code())
}
