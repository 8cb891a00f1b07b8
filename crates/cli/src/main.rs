// CLI modules
mod args;
mod op;
mod ops;

use args::Args;
use clap::{Parser, Subcommand};
use op::{Op, OpOutcome};
use ops::{Read, Run, Status};

command_enum! {
    (Run, Run),
    (Read, Read),
    (Status, Status),
}

#[tokio::main]
async fn main() {
    init_logging();

    let args = Args::parse();

    let ctx = match op::OpContext::new(args.server, args.appkeys, args.insecure) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(OpOutcome::Render(output)) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Ok(OpOutcome::Exit(code)) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("JINGUI_LOG_LEVEL")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
