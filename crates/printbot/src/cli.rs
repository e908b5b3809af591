use std::path::PathBuf;

/// Prints qualifying mailbox messages exactly once.
///
/// Configuration is read from the environment (TENANT_ID, CLIENT_ID,
/// CLIENT_SECRET or CLIENT_SECRET_FILE, MAILBOX_UPN, PRINTER_NAME, ...).
#[derive(clap::Parser)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
#[clap(about, version)]
pub struct Args {
    /// What to do; defaults to `run`.
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub enum Commands {
    /// Poll the mailbox and print new messages until stopped
    Run {
        /// Log instead of printing, whatever DRY_RUN says
        #[clap(long, action)]
        dry_run: bool,
        /// Run a single poll cycle and exit
        #[clap(long, action)]
        once: bool,
    },
    /// Show the print ledger without modifying it
    Inspect {
        /// Path of the state database (default: $STATE_DIR/state.db)
        #[clap(long, value_parser)]
        db: Option<PathBuf>,
        /// Only show messages whose id contains TERM
        #[clap(short, long, value_parser, value_name = "TERM")]
        search: Option<String>,
    },
    /// List mailbox folders and check the configured source folder
    Folders,
}

impl Args {
    /// The requested command, `run` when none was given.
    pub fn command(self) -> Commands {
        self.command.unwrap_or(Commands::Run {
            dry_run: false,
            once: false,
        })
    }
}
