use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use jingui_server::{process, Config};

#[derive(Parser, Debug)]
#[command(name = "jingui-server", version, about = "Jingui secret broker daemon")]
struct Args {
    /// Override the listen address (default from JINGUI_LISTEN_ADDR)
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Override the SQLite database path (default from JINGUI_DB_PATH)
    #[arg(long)]
    db_path: Option<String>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(listen_addr) = args.listen_addr {
        config.listen_addr = listen_addr;
    }
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    config.log_dir = args.log_dir;

    process::spawn_service(&config).await;
}
