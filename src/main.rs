use clap::Parser;
use tracing_subscriber::EnvFilter;

use extrato::cli::{self, Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Parse {
            file,
            format,
            from,
            to,
            json,
        } => cli::parse::run(&file, format.as_deref(), from.as_deref(), to.as_deref(), json),
        Commands::Import {
            file,
            account,
            budget,
            from,
            to,
        } => cli::import::run(
            &file,
            account.as_deref(),
            budget.as_deref(),
            from.as_deref(),
            to.as_deref(),
        ),
        Commands::Show { session } => cli::session::show(&session),
        Commands::Classify { temp_id, category } => cli::session::classify(&temp_id, &category),
        Commands::Confirm {
            session,
            import_duplicates,
        } => cli::session::confirm(&session, import_duplicates),
        Commands::Cancel { session } => cli::session::cancel(&session),
        Commands::Sessions { budget } => cli::session::list(budget.as_deref()),
        Commands::Formats => cli::formats::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
