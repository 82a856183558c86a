//! Labeler binary

use clap::Parser;
use labeler::cli::{self, Cli};
use labeler::{DbService, LabelService, setup_environment};
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Cli::parse();
    let mut config = setup_environment()?;
    if let Some(work_dir) = args.work_dir {
        config.work_dir = work_dir;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    let db_file = config.database_file();
    let db = DbService::new(&db_file.to_string_lossy()).await?;
    tracing::debug!(work_dir = %config.work_dir, "labeler starting");

    let service = LabelService::new(config, db.clone());
    let result = cli::run(args.command, args.json, &service).await;
    db.close().await;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", e.report());
            Ok(ExitCode::FAILURE)
        }
    }
}
