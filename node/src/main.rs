// Copyright (c) 2017 Blockfreight, Inc. MIT License.
// See LICENSE for details.

//! # bftx
//!
//! Entry point for the `bftx` binary. Parses CLI arguments, initializes
//! logging, wires the sled record database, the Tendermint client and the
//! key-file signer into a [`Lifecycle`], and runs one command.
//!
//! Results go to stdout in the `-> bftx result: ...` form; logs go to
//! stderr. Any failure is reported as `<command> failed: <error>` and the
//! process exits non-zero.

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fmt::Display;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use bftx_protocol::config::DB_DIR_NAME;
use bftx_protocol::crypto::keys::BftxKeypair;
use bftx_protocol::network::{SubmitReceipt, TendermintClient};
use bftx_protocol::storage::BftxDb;
use bftx_protocol::transaction::{validate_content, KeyFileSigner, ShipmentContent};
use bftx_protocol::Lifecycle;

use cli::{BftxCli, Commands};
use logging::LogFormat;

type Engine = Lifecycle<BftxDb, TendermintClient, KeyFileSigner>;

fn main() -> ExitCode {
    let cli = BftxCli::parse();

    let filter = if cli.verbose {
        logging::VERBOSE_FILTER
    } else {
        logging::DEFAULT_FILTER
    };
    logging::init_logging(filter, LogFormat::from_str_lossy(&cli.log_format));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("{} failed: {:#}", cli.command.name(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &BftxCli) -> Result<()> {
    match &cli.command {
        Commands::Version => print_version(),
        Commands::Keygen { force } => keygen(cli, *force)?,
        Commands::Validate { file } => {
            let content = read_content(&cli.resolve_input(file))?;
            validate_content(&content)?;
            print_result("valid BF_TX content");
        }
        Commands::Info => {
            let info = open_engine(cli)?.chain_info()?;
            print_result(format!("height {}", info.last_block_height));
            print_data(&info.last_block_app_hash);
            print_log(&info.data);
        }
        Commands::Construct { file } => {
            let content = read_content(&cli.resolve_input(file))?;
            print_result(open_engine(cli)?.construct(content)?);
        }
        Commands::Sign { id } => {
            open_engine(cli)?.sign(id)?;
            print_result(format!("{id} signed"));
        }
        Commands::Broadcast { id } => {
            let receipt = open_engine(cli)?.broadcast(id)?;
            print_receipt(&receipt);
        }
        Commands::Append { file, target } => {
            let content = read_content(&cli.resolve_input(file))?;
            let new_id = open_engine(cli)?.append(content, target)?;
            print_result(format!("{new_id} amends {target}"));
        }
        Commands::State { id } => print_result(open_engine(cli)?.state(id)?),
        Commands::Get { id } => print_result(open_engine(cli)?.get(id)?.canonical()?),
        Commands::Echo { id } => println!("{}", open_engine(cli)?.get(id)?.pretty()?),
        Commands::Total => print_result(open_engine(cli)?.total()?),
        Commands::Verify { file } => {
            let content = read_content(&cli.resolve_input(file))?;
            print_result(open_engine(cli)?.verify(&content)?);
        }
        Commands::Query { id } => println!("{}", open_engine(cli)?.query(id)?.pretty()?),
    }
    Ok(())
}

/// Open the local database and the chain client.
fn open_engine(cli: &BftxCli) -> Result<Engine> {
    let db_path = cli.data_dir.join(DB_DIR_NAME);
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let db = BftxDb::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::debug!(path = %db_path.display(), "database opened");

    let chain = TendermintClient::new(&cli.rpc_url, Duration::from_secs(cli.rpc_timeout))
        .context("failed to build RPC client")?;

    Ok(Lifecycle::new(db, chain, KeyFileSigner::new(cli.key_path())))
}

fn read_content(path: &Path) -> Result<ShipmentContent> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ShipmentContent::from_json(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn keygen(cli: &BftxCli, force: bool) -> Result<()> {
    let key_path = cli.key_path();
    if key_path.exists() && !force {
        bail!(
            "{} already exists; pass --force to replace it",
            key_path.display()
        );
    }

    let keypair = BftxKeypair::generate();
    keypair.save(&key_path)?;
    tracing::info!(key_path = %key_path.display(), "signing key generated");
    print_result(keypair.public_key());
    Ok(())
}

fn print_result(result: impl Display) {
    println!("-> bftx result: {}", result);
}

fn print_data(data: &[u8]) {
    if !data.is_empty() {
        println!("-> data.hex: 0x{}", hex::encode_upper(data));
    }
}

fn print_log(log: &str) {
    if !log.is_empty() {
        println!("-> log: {}", log);
    }
}

fn print_receipt(receipt: &SubmitReceipt) {
    print_result(&receipt.hash);
    print_data(&receipt.data);
    print_log(&receipt.log);
}

fn print_version() {
    println!("bftx     {}", env!("CARGO_PKG_VERSION"));
    println!(
        "schema   {}",
        bftx_protocol::config::RECORD_SCHEMA_VERSION
    );
    println!("signing  {}", bftx_protocol::config::SIGNING_ALGORITHM);
}
