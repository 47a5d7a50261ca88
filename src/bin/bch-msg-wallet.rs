#![forbid(unsafe_code)]
//! bch-msg-wallet - BCH wallet with end-to-end encrypted Nostr messaging

use bchmsg::cli::{self, files, message, sign, wallet};
use bchmsg::config::load_config;
use bchmsg::logging::init_logging;
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bch-msg-wallet")]
#[command(about = "A command-line BCH wallet with E2E encrypted messaging over Nostr")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet with a name and description
    WalletCreate {
        /// Wallet name
        #[arg(short, long)]
        name: Option<String>,
        /// What the wallet is being used for
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List existing wallets
    WalletList,
    /// Show the address and public key of a wallet
    WalletAddrs {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Show the BCH balance of a wallet
    WalletBalance {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Send BCH to an address
    SendBch {
        /// Wallet name sending BCH
        #[arg(short, long)]
        name: Option<String>,
        /// Address to send BCH to
        #[arg(short, long)]
        addr: Option<String>,
        /// Quantity of BCH to send
        #[arg(short, long)]
        qty: Option<String>,
    },
    /// Sign a message with the wallet's private key
    MsgSign {
        #[arg(short, long)]
        name: Option<String>,
        /// Message to sign
        #[arg(short, long)]
        msg: Option<String>,
    },
    /// Verify a signed message against an address
    MsgVerify {
        #[arg(short, long)]
        addr: Option<String>,
        #[arg(short, long)]
        msg: Option<String>,
        /// Base64 signature
        #[arg(short, long)]
        sig: Option<String>,
    },
    /// Send an E2E encrypted message to a BCH address
    MsgNostrSend {
        /// Wallet name paying for the signal
        #[arg(short, long)]
        name: Option<String>,
        /// Recipient address
        #[arg(short, long)]
        addr: Option<String>,
        /// Message text
        #[arg(short, long)]
        msg: Option<String>,
        /// JSON file holding a message object
        #[arg(short, long)]
        json: Option<PathBuf>,
        /// Message subject
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// List messages signalled to the wallet
    MsgNostrCheck {
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Read and decrypt a message by its signal TXID
    MsgNostrRead {
        #[arg(short, long)]
        name: Option<String>,
        /// Signal transaction id
        #[arg(short, long)]
        txid: Option<String>,
        /// Display attached data
        #[arg(short, long)]
        data: bool,
    },
    /// Upload a file to the file staging server
    FileStage {
        #[arg(short, long)]
        file: Option<String>,
    },
    /// Wrap a text file as a JSON message object
    #[command(name = "txt-2-json")]
    Txt2Json {
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            cli::print_error(&e.to_string());
            eprintln!("{}", "💡 Check config.toml or pass --config <path>".yellow());
            return;
        }
    };

    match &cli.command {
        Commands::WalletCreate { name, description } => {
            wallet::create(&config, name.as_deref(), description.as_deref());
        }
        Commands::WalletList => {
            wallet::list(&config);
        }
        Commands::WalletAddrs { name } => {
            wallet::addrs(&config, name.as_deref());
        }
        Commands::WalletBalance { name } => {
            wallet::balance(&config, name.as_deref()).await;
        }
        Commands::SendBch { name, addr, qty } => {
            wallet::send_bch(&config, name.as_deref(), addr.as_deref(), qty.as_deref()).await;
        }
        Commands::MsgSign { name, msg } => {
            sign::msg_sign(&config, name.as_deref(), msg.as_deref());
        }
        Commands::MsgVerify { addr, msg, sig } => {
            sign::msg_verify(addr.as_deref(), msg.as_deref(), sig.as_deref());
        }
        Commands::MsgNostrSend {
            name,
            addr,
            msg,
            json,
            subject,
        } => {
            message::nostr_send(
                &config,
                name.as_deref(),
                addr.as_deref(),
                msg.as_deref(),
                json.as_deref(),
                subject.as_deref(),
            )
            .await;
        }
        Commands::MsgNostrCheck { name } => {
            message::nostr_check(&config, name.as_deref()).await;
        }
        Commands::MsgNostrRead { name, txid, data } => {
            message::nostr_read(&config, name.as_deref(), txid.as_deref(), *data).await;
        }
        Commands::FileStage { file } => {
            files::file_stage(&config, file.as_deref()).await;
        }
        Commands::Txt2Json { file } => {
            files::txt_2_json(file.as_deref());
        }
    }
}
