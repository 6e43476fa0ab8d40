use std::os::unix::ffi::OsStrExt;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use vsfs_journal::cli::{Cli, Commands};
use vsfs_journal::journal::install;
use vsfs_journal::transaction;
use vsfs_journal::BlockDevice;

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn run(cli: Cli) -> vsfs_journal::JournalResult<()> {
    let mut dev = BlockDevice::open(&cli.image)?;
    match cli.command {
        Commands::Create { name } => {
            transaction::create(&mut dev, name.as_os_str().as_bytes())?;
            println!("Logged creation of '{}' to journal.", name.to_string_lossy());
        }
        Commands::Install => {
            let commits = install::install(&mut dev)?;
            println!("Installed {commits} commited transactions from journal.");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
                _ => {
                    eprint!("{err}");
                    return ExitCode::FAILURE;
                }
            }
        }
    };
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
