//! `performance-inserts`: insert one batch with a named strategy and report
//! the ids, the emitted statements and the duration.
//!
//! Usage:
//!   performance-inserts add_all
//!   performance-inserts bulk_insert_mappings --rows 100 --database-url postgres://localhost/bench
//!   RUST_LOG=debug performance-inserts add_multiple_commits

use clap::Parser;
use querybench::commands::execute_insert_benchmark;
use querybench::models::{
    HarnessSettings, DATABASE_URL_ENV, DEFAULT_DATABASE_URL, DEFAULT_ROWS_TO_INSERT,
};
use querybench::report::{log_captured_queries, print_insert_report};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// add_multiple_commits, add_single_commit, add_all, bulk_save_objects or bulk_insert_mappings
    strategy: String,

    /// sqlite::memory:, sqlite://<path> or postgres://...
    #[arg(long, env = DATABASE_URL_ENV, default_value = DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Rows per batch
    #[arg(short, long, default_value_t = DEFAULT_ROWS_TO_INSERT)]
    rows: usize,

    /// Prefix for generated descriptions (random when omitted)
    #[arg(long)]
    batch_id: Option<String>,
}

fn run(args: Args) -> querybench::Result<()> {
    let settings = HarnessSettings {
        database_url: args.database_url,
        rows_to_insert: args.rows,
    };

    let run = execute_insert_benchmark(&args.strategy, &settings, args.batch_id)?;
    log_captured_queries(run.strategy.name(), &run.queries);
    print_insert_report(&run)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_url_flag_overrides_environment() {
        std::env::set_var(DATABASE_URL_ENV, "sqlite::memory:");

        let args = Args::try_parse_from(["performance-inserts", "add_all"]).unwrap();
        assert_eq!(args.database_url, "sqlite::memory:");
        assert_eq!(args.rows, DEFAULT_ROWS_TO_INSERT);

        let args = Args::try_parse_from([
            "performance-inserts",
            "add_all",
            "--database-url",
            "sqlite://other.db",
        ])
        .unwrap();
        assert_eq!(args.database_url, "sqlite://other.db");
    }
}
