#[tokio::main]
async fn main() {
    if let Err(e) = botarena_server::frameworks::server::run_with_config().await {
        eprintln!("server exited with error: {e}");
        std::process::exit(1);
    }
}
