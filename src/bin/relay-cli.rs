use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use rpc_relay::config::WalletConfig;
use rpc_relay::wallet::{
    KeyRole, LocalKeySigner, SignMessageRequest, SignerResponse, SignerServiceClient,
    TransferRequest, WalletSigner,
};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the RPC relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Sign through the remote signer service instead of RELAY_SIGNER_PRIVATE_KEY.
    #[arg(long)]
    signer_service: bool,

    /// Signer service base URL, defaults to the configured service.
    #[arg(long)]
    signer_url: Option<String>,

    /// Access token for the signer service.
    #[arg(long, default_value = "")]
    access_token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay a single RPC call
    Call {
        method: String,
        /// JSON-encoded params
        #[arg(default_value = "[]")]
        params: String,
    },
    /// Check relay status
    Health,
    /// Sign a message with an account key
    SignMessage {
        account: String,
        message: String,
        #[arg(long, default_value = "posting")]
        key_role: String,
    },
    /// Transfer tokens through the signer service
    Transfer {
        from: String,
        to: String,
        amount: String,
        #[arg(long, default_value = "")]
        memo: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Call { ref method, ref params } => {
            let params: Value = serde_json::from_str(params)?;
            let res = client
                .post(format!("{}/api/rpc", cli.url))
                .json(&json!({ "method": method, "params": params }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::SignMessage {
            ref account,
            ref message,
            ref key_role,
        } => {
            let key_role: KeyRole = serde_json::from_value(json!(key_role))?;
            let signer = build_signer(&cli)?;
            let request = SignMessageRequest {
                account: account.clone(),
                message: message.clone(),
                key_role,
            };
            print_signed(signer.sign_message(&request).await?)?;
        }
        Commands::Transfer {
            ref from,
            ref to,
            ref amount,
            ref memo,
        } => {
            let signer = build_signer(&cli)?;
            let request = TransferRequest {
                from: from.clone(),
                to: to.clone(),
                amount: amount.clone(),
                memo: memo.clone(),
            };
            print_signed(signer.transfer(&request).await?)?;
        }
    }

    Ok(())
}

/// The signer service when requested, otherwise the local key. The local key
/// only signs messages.
fn build_signer(cli: &Cli) -> Result<Box<dyn WalletSigner>, Box<dyn std::error::Error>> {
    let defaults = WalletConfig::default();
    if cli.signer_service {
        let base_url = cli.signer_url.as_deref().unwrap_or(&defaults.signer_service_url);
        return Ok(Box::new(SignerServiceClient::new(base_url, cli.access_token.clone())?));
    }

    Ok(Box::new(LocalKeySigner::from_env()?))
}

fn print_signed(response: SignerResponse) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(message) = &response.message {
        eprintln!("{}", message);
    }
    println!("{}", serde_json::to_string_pretty(&response.result)?);
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
