use clap::Parser;
use log::info;
use server::config::{ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use server::network::{BoxError, Server};

/// Main-method of the application.
/// Parses command-line arguments, binds the WebSocket listener and runs the server loop.
#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[command(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
        host: String,
        /// Server port to listen on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::new(&args.host, args.port);

    let server = Server::bind(&config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
