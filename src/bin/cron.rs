use auth_api::{Config, init_tracing, purge_expired_sessions};

const COMMAND: &str = "purge-expired-sessions";

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} {COMMAND}");
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let mut args = std::env::args();
    let bin_name = args.next().unwrap_or_else(|| "cron".to_string());
    let command = args.next();

    if command.as_deref() != Some(COMMAND) || args.next().is_some() {
        print_usage(&bin_name);
        std::process::exit(2);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level, config.logging.json_format);

    match purge_expired_sessions(&config).await {
        Ok(deleted) => println!("Expired session purge completed: sessions_deleted={deleted}"),
        Err(err) => {
            eprintln!("Cron job failed: {err}");
            std::process::exit(1);
        }
    }
}
