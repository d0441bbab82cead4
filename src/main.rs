mod cli;
use cli::{CliMode, USAGE, parse_cli_mode, run_check_mode};

fn main() -> anyhow::Result<()> {
    setup_logging();

    let cli_mode = match parse_cli_mode() {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("Error: {}", err);
            println!("{}", USAGE);
            return Ok(());
        }
    };

    match cli_mode {
        CliMode::Check { doc_date, reference_date } => {
            if let Err(err) = run_check_mode(doc_date, reference_date) {
                eprintln!("Error: {:#}", err);
                tracing::error!("check mode failed: {:#}", err);
            }
            Ok(())
        }
        CliMode::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn setup_logging() {
    let log_dir = dirs::config_dir()
        .map(|d| d.join("plazo"))
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "plazo.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .init();

    std::mem::forget(_guard);

    tracing::info!("plazo started");
}
