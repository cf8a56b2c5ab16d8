use clap::Parser;
use docsearch::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    docsearch::tracing::init(cli.log_level());

    let code = cli.run().await.inspect_err(|e| tracing::error!("{:#}", e))?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
