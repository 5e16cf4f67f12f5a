use std::process::ExitCode;

use clap::Parser;
use hytale_run::commands::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    hytale_run::init_tracing();
    let cli = Cli::parse();

    match commands::execute(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            let mut chain = err.chain().into_iter();
            if let Some(message) = chain.next() {
                tracing::error!("{message}");
            }
            for cause in chain {
                tracing::error!("  caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}
