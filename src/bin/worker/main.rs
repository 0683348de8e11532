#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Per-message dispatch worker
//!
//! Launched once per message by the isolated-process pool. Reads a JSON
//! [`WorkerJob`] from stdin, sends the message, appends to the journal, and
//! answers with a JSON [`DispatchResult`](mailbatch::domain::batch::DispatchResult)
//! on stdout. A failed send exits non-zero with the error on stderr.

use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;

use mailbatch::{
    domain::batch::{dispatch_one, Journal, WorkerJob},
    infrastructure::email::SmtpMailer,
};

/// Command-line arguments
#[derive(Debug, Parser)]
pub struct Args {
    /// Validate and build the message without transmitting it
    #[clap(long)]
    pub dry_run: bool,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is the result channel back to the pool.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .context("could not read job from stdin")?;

    let job: WorkerJob = serde_json::from_str(&payload).context("could not decode job")?;

    let mailer = if args.dry_run {
        SmtpMailer::dry_run()
    } else {
        SmtpMailer::new()
    };

    // The coordinating parent already admitted the journal path.
    let journal = Journal::resume(&job.journal_path);

    let result = dispatch_one(&mailer, &job.spec, &job.server, &journal).await?;

    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}
