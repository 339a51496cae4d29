use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powchain-cli")]
#[command(about = "CLI client for the powchain node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, global = true, env = "POWCHAIN_NODE", default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Mine a block, crediting the node's own address
    Mine,
    /// Queue a transaction for the next block
    Submit {
        /// Sender address
        #[arg(long)]
        sender: String,
        /// Recipient address
        #[arg(long)]
        recipient: String,
        /// Amount; negative values are accepted
        #[arg(long, allow_negative_numbers = true)]
        amount: i64,
    },
    /// Print the full chain
    Chain,
    /// Ask the node to verify its chain
    Validate,
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    amount: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();
    let request = match cli.cmd {
        Command::Mine => client.get(format!("{node}/mine")),
        Command::Submit {
            sender,
            recipient,
            amount,
        } => client
            .post(format!("{node}/transactions/new"))
            .json(&Tx {
                sender,
                recipient,
                amount,
            }),
        Command::Chain => client.get(format!("{node}/chain")),
        Command::Validate => client.get(format!("{node}/chain/validate")),
    };

    debug!(node, "sending request");
    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
