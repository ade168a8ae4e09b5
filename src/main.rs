use std::process::ExitCode;

use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use quizdeck::{
    cli::{out::Console, repl::Repl, terminal::StdioTerminal},
    config::AppConfig,
    persist::sqlite::SqliteOpSink,
    runtime::handle::spawn_quiz_runtime,
};

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_env("RUST_LOG")
        .init();

    let config = AppConfig::from_env();
    info!("opening quiz database {}", config.db_path.display());

    let mut sink = match SqliteOpSink::open(&config.db_path) {
        Ok(sink) => sink,
        Err(err) => {
            error!("cannot open {}: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };
    let store = match sink.load_or_seed(config.seed_defaults) {
        Ok(store) => store,
        Err(err) => {
            error!("cannot load quizzes from {}: {err}", config.db_path.display());
            return ExitCode::FAILURE;
        }
    };

    let handle = spawn_quiz_runtime(store, Some(Box::new(sink)), config.runtime.clone());
    let console = Console::new(std::io::stdout(), config.color);
    let mut repl = Repl::new(handle.clone(), StdioTerminal::stdio(), console, StdRng::from_entropy());

    let result = repl.run().await;
    if let Err(err) = handle.shutdown().await {
        error!("shutdown failed: {err}");
    }

    match result {
        Ok(()) => {
            println!("Bye!");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
