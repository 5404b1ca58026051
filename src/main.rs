use auth_api::{Config, build_rocket};

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let _ = dotenvy::dotenv();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    let _rocket = build_rocket(config).launch().await?;
    Ok(())
}
