// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for interacting with the Ledger alamgu app

use std::{
    fmt::{Debug, Display},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use ledger_transport::Exchange;
use log::{debug, error, info, LevelFilter};
use serde::{de::DeserializeOwned, Serialize};

use ledger_alamgu::{
    apdu::path::DerivationPath,
    config::Config,
    transport::{GenericTransport, TcpOptions},
    Connect, DeviceHandle, Filter, LedgerProvider,
};

mod helpers;
use helpers::*;

/// Ledger command line utility
#[derive(Clone, Debug, Parser)]
struct Options {
    /// Supported transports for ledger discovery
    #[clap(long, value_enum, default_value = "any")]
    target: Filter,

    /// Device index (where more than one device is available)
    #[clap(long, default_value = "0")]
    device_index: usize,

    /// Speculos connection options
    #[clap(flatten)]
    tcp: TcpOptions,

    /// Handle configuration
    #[clap(flatten)]
    config: Config,

    /// Load handle configuration from a JSON file (overrides flags)
    #[clap(long)]
    config_file: Option<PathBuf>,

    /// Write command output to a JSON file
    #[clap(long)]
    output: Option<PathBuf>,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Subcommand)]
#[non_exhaustive]
enum Actions {
    /// List available devices
    List,

    /// Fetch application version
    Version,

    /// Fetch the public key for a derivation path
    PublicKey {
        /// Derivation path (eg. m/44'/535348'/0')
        #[clap(long, value_parser = parse_path)]
        path: DerivationPath,

        /// Display the key on the device for confirmation
        #[clap(long)]
        confirm: bool,
    },

    /// Sign a transaction
    Sign {
        /// Derivation path (eg. m/44'/535348'/0')
        #[clap(long, value_parser = parse_path)]
        path: DerivationPath,

        /// Hex-encoded transaction
        #[clap(long, conflicts_with = "file", required_unless_present = "file")]
        tx: Option<HexData>,

        /// Binary transaction file
        #[clap(long)]
        file: Option<PathBuf>,
    },
}

/// Version command output
#[derive(Serialize)]
struct VersionOutput {
    name: String,
    version: String,
}

/// Public key command output
#[derive(Serialize)]
struct PublicKeyOutput {
    path: String,
    public_key: String,
    chain_code: String,
}

/// Sign command output
#[derive(Serialize)]
struct SignOutput {
    path: String,
    signature: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    // Resolve handle configuration
    let config = match &args.config_file {
        Some(f) => read_input::<Config>(f).await?,
        None => args.config.clone(),
    };
    config.validate()?;

    debug!("Using config: {:?}", config);

    // Connect to ledger device
    let p = LedgerProvider::new()?;

    debug!("Using transport: {:?}", args.target);

    // List available devices
    let devices = p.list_devices(args.target, &args.tcp).await;
    if devices.is_empty() {
        return Err(anyhow::anyhow!("No devices found"));
    }

    // Handle list command
    if args.cmd == Actions::List {
        info!("Devices:");
        for (i, d) in devices.iter().enumerate() {
            info!("  {}: {}", i, d);
        }

        return Ok(());
    }

    // Select device by index
    if args.device_index >= devices.len() {
        return Err(anyhow::anyhow!(
            "Invalid device index: {} (max: {})",
            args.device_index,
            devices.len() - 1
        ));
    }

    debug!(
        "Using device {}: {}",
        args.device_index, devices[args.device_index]
    );

    // Connect to device
    let t = match Connect::<GenericTransport>::connect(&p, &devices[args.device_index]).await {
        Ok(v) => v,
        Err(e) => {
            error!(
                "Failed to connect to device: {}",
                devices[args.device_index]
            );
            return Err(e.into());
        }
    };

    let d = DeviceHandle::with_config(t, &config);

    // Execute command
    execute(d, args.cmd, args.output.as_deref()).await?;

    Ok(())
}

/// Execute a command with the provided device handle
async fn execute<T, E>(
    d: DeviceHandle<T>,
    cmd: Actions,
    output: Option<&Path>,
) -> anyhow::Result<()>
where
    T: Exchange<Error = E> + Sync + Send + 'static,
    E: std::error::Error + Display + Debug + Sync + Send + 'static,
{
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Version => {
            let v = d.app_version().await?;

            info!("app version: {}", v);

            write_output(
                output,
                &VersionOutput {
                    name: v.name.clone(),
                    version: format!("{}.{}.{}", v.major, v.minor, v.patch),
                },
            )
            .await?;
        }
        Actions::PublicKey { path, confirm } => {
            let k = match confirm {
                true => {
                    let mut p = d.public_key_confirm(&path).await;
                    p.ready().await?;

                    info!("Confirm public key on the device");

                    p.response().await?
                }
                false => d.public_key(&path).await?,
            };

            info!("public key: {}", hex::encode(&k.public_key));
            info!("chain code: {}", hex::encode(&k.chain_code));

            write_output(
                output,
                &PublicKeyOutput {
                    path: path.to_string(),
                    public_key: hex::encode(&k.public_key),
                    chain_code: hex::encode(&k.chain_code),
                },
            )
            .await?;
        }
        Actions::Sign { path, tx, file } => {
            let tx = match (tx, file) {
                (Some(tx), _) => tx.0,
                (None, Some(f)) => {
                    debug!("Loading transaction from '{}'", f.display());
                    tokio::fs::read(&f).await?
                }
                (None, None) => return Err(anyhow::anyhow!("No transaction provided")),
            };

            let mut p = d.sign_tx_pending(&path, tx).await;
            p.ready().await?;

            info!("Approve transaction on the device");

            let signature = p.response().await?;

            info!("signature: {}", hex::encode(signature));

            write_output(
                output,
                &SignOutput {
                    path: path.to_string(),
                    signature: hex::encode(signature),
                },
            )
            .await?;
        }
        Actions::List => unreachable!(),
    }

    Ok(())
}

/// Helper to read input files where required
async fn read_input<T: DeserializeOwned>(p: &Path) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", p.display());

    let s = tokio::fs::read_to_string(p).await?;

    // Decode based on input extension
    let v = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to write output files if `--output` argument is provided
async fn write_output(p: Option<&Path>, value: &impl Serialize) -> anyhow::Result<()> {
    let p = match p {
        Some(p) => p,
        None => return Ok(()),
    };

    debug!("Writing output to '{}'", p.display());

    match p.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let s = serde_json::to_string_pretty(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
