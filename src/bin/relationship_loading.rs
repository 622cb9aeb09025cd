//! `relationship-loading`: read the seeded company directory with one loading
//! strategy and report the results and how many statements it took.

use clap::Parser;
use querybench::commands::execute_loading_scenario;
use querybench::models::{HarnessSettings, DATABASE_URL_ENV, DEFAULT_DATABASE_URL};
use querybench::report::{log_captured_queries, print_loading_report};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// companies, emails or phones
    scenario: String,

    /// select, joined, subquery or selectin
    #[arg(short, long, default_value = "select")]
    strategy: String,

    /// Only phones of this type (home, work, other)
    #[arg(long)]
    phone_type: Option<String>,

    #[arg(long, env = DATABASE_URL_ENV, default_value = DEFAULT_DATABASE_URL)]
    database_url: String,
}

fn run(args: Args) -> querybench::Result<()> {
    let settings = HarnessSettings::with_database_url(args.database_url);
    let run = execute_loading_scenario(
        &args.scenario,
        &args.strategy,
        args.phone_type.as_deref(),
        &settings,
    )?;

    log_captured_queries(
        &format!("{}/{}", run.scenario, run.strategy),
        &run.queries,
    );
    print_loading_report(&run)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
