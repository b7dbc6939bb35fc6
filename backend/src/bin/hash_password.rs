use log::{error, info};
use schoolbook_backend::security::hash_password;
use std::env;

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        error!("Usage: {} <password>", args[0]);
        std::process::exit(1);
    }

    match hash_password(&args[1]) {
        Ok(digest) => info!("{}", digest),
        Err(e) => {
            error!("Failed to hash password: {}", e);
            std::process::exit(1);
        }
    }
}
