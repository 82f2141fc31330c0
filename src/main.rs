//! ghcred binary entry point.

#[tokio::main]
async fn main() {
    if let Err(err) = ghcred::cli::run().await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
