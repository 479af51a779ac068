//! # CLI Interface
//!
//! Defines the command-line argument structure for `bftx` using `clap`
//! derive. Global options select the chain endpoint, the local data
//! directory and the signing key; each subcommand maps to one lifecycle
//! operation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use bftx_protocol::config::{DEFAULT_DATA_DIR, DEFAULT_RPC_URL, KEY_FILE_NAME, RPC_REQUEST_TIMEOUT};

/// Blockfreight BF_TX transaction tool.
///
/// Constructs, signs and broadcasts shipment transactions against a
/// Tendermint chain, keeping a local record database in step.
#[derive(Parser, Debug)]
#[command(
    name = "bftx",
    about = "Blockfreight BF_TX transaction tool",
    version,
    propagate_version = true
)]
pub struct BftxCli {
    /// Tendermint RPC endpoint.
    #[arg(long, global = true, env = "BFTX_RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Directory holding the record database and the default signing key.
    #[arg(long, short = 'd', global = true, env = "BFTX_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Directory that relative shipment file paths are resolved against.
    #[arg(long, global = true, env = "BFTX_JSON_PATH")]
    pub json_path: Option<PathBuf>,

    /// Hex-encoded Ed25519 secret key file. Defaults to `signer.key` in the
    /// data directory.
    #[arg(long, global = true, env = "BFTX_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    /// RPC request timeout in seconds.
    #[arg(long, global = true, env = "BFTX_RPC_TIMEOUT", default_value_t = RPC_REQUEST_TIMEOUT.as_secs())]
    pub rpc_timeout: u64,

    /// Log output format: "pretty" or "json".
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: String,

    /// Enable debug logging.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the chain head: height and latest app hash.
    Info,
    /// Check a shipment file against the BF_TX rules without storing it.
    Validate { file: PathBuf },
    /// Store a shipment file as a new Draft record and print its ID.
    Construct { file: PathBuf },
    /// Sign a Draft record.
    Sign { id: String },
    /// Submit a signed record to the chain.
    Broadcast { id: String },
    /// Construct a record from a file and mark TARGET as amended by it.
    Append { file: PathBuf, target: String },
    /// Show the lifecycle state of a record.
    State { id: String },
    /// Print a stored record as canonical JSON.
    Get { id: String },
    /// Print a stored record as indented JSON.
    Echo { id: String },
    /// Number of records in the local database.
    Total,
    /// Find the stored record whose content matches a shipment file.
    Verify { file: PathBuf },
    /// Fetch the record committed on chain under an ID.
    Query { id: String },
    /// Generate a new signing key.
    Keygen {
        /// Overwrite an existing key file.
        #[arg(long)]
        force: bool,
    },
    /// Print version information and exit.
    Version,
}

impl Commands {
    /// Name used in error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Info => "info",
            Commands::Validate { .. } => "validate",
            Commands::Construct { .. } => "construct",
            Commands::Sign { .. } => "sign",
            Commands::Broadcast { .. } => "broadcast",
            Commands::Append { .. } => "append",
            Commands::State { .. } => "state",
            Commands::Get { .. } => "get",
            Commands::Echo { .. } => "echo",
            Commands::Total => "total",
            Commands::Verify { .. } => "verify",
            Commands::Query { .. } => "query",
            Commands::Keygen { .. } => "keygen",
            Commands::Version => "version",
        }
    }
}

impl BftxCli {
    /// Signing key location: `--key-file`, else `signer.key` in the data
    /// directory.
    pub fn key_path(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join(KEY_FILE_NAME))
    }

    /// Shipment file location. Relative paths are taken from `--json-path`
    /// when it is set.
    pub fn resolve_input(&self, file: &std::path::Path) -> PathBuf {
        match &self.json_path {
            Some(base) if file.is_relative() => base.join(file),
            _ => file.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        BftxCli::command().debug_assert();
    }

    #[test]
    fn append_takes_file_then_target() {
        let cli = BftxCli::try_parse_from(["bftx", "append", "bol.json", "abc"]).unwrap();
        match cli.command {
            Commands::Append { file, target } => {
                assert_eq!(file, PathBuf::from("bol.json"));
                assert_eq!(target, "abc");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = BftxCli::try_parse_from([
            "bftx",
            "sign",
            "abc",
            "--data-dir",
            "/tmp/bftx",
            "--key-file",
            "/keys/k.hex",
        ])
        .unwrap();
        assert_eq!(cli.command.name(), "sign");
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/bftx"));
        assert_eq!(cli.key_path(), PathBuf::from("/keys/k.hex"));
    }

    #[test]
    fn key_path_defaults_into_data_dir() {
        let cli = BftxCli::try_parse_from(["bftx", "--data-dir", "/srv/bftx", "total"]).unwrap();
        assert_eq!(cli.key_path(), PathBuf::from("/srv/bftx/signer.key"));
    }

    #[test]
    fn relative_inputs_use_json_path() {
        let cli =
            BftxCli::try_parse_from(["bftx", "--json-path", "/data/bols", "validate", "a.json"])
                .unwrap();
        assert_eq!(
            cli.resolve_input(std::path::Path::new("a.json")),
            PathBuf::from("/data/bols/a.json")
        );
        assert_eq!(
            cli.resolve_input(std::path::Path::new("/abs/b.json")),
            PathBuf::from("/abs/b.json")
        );
    }
}
