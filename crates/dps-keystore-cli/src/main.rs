//! DPS key store command-line front end.
//!
//! Builds a key store the way a node would at start-up and answers one
//! request against it, printing a JSON report on stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Pre-shared key mode with the built-in test credentials
//! dps-keystore status
//!
//! # Certificate mode, debug logging, resolve the subscriber identity
//! dps-keystore -x 2 -d resolve --text "DPS Test Subscriber"
//!
//! # Provisioned keys, print secret bytes
//! dps-keystore --provisioning node.json --reveal resolve ed5414a85c4d4d15b69f0e998ab171f2
//!
//! # Fresh P-521 key pair
//! dps-keystore ephemeral p521
//! ```

mod report;
mod test_keys;

use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use dps_keystore::{
    ConfigError, CurveId, EncryptionMode, EphemeralRequest, KeyId, KeyProvider, KeyStore,
    KeyStoreError, Provisioning, ProvisionError,
};
use report::Report;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// DPS key store
#[derive(Parser, Debug)]
#[command(name = "dps-keystore")]
#[command(about = "Build a DPS key store and answer key requests against it")]
#[command(version)]
struct Args {
    /// Encryption mode: 0 = none, 1 = pre-shared key, 2 = certificate
    #[arg(short = 'x', long = "encryption", default_value_t = 1)]
    encryption: u8,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// JSON provisioning document. Built-in test credentials when absent
    #[arg(long)]
    provisioning: Option<PathBuf>,

    /// Print secret bytes instead of their length
    #[arg(long, global = true)]
    reveal: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Mode, node identity and provisioned key counts
    Status,
    /// Resolve an identifier
    Resolve {
        /// Identifier, hex unless `--text` is given
        id: String,
        /// Take the identifier bytes verbatim from the argument
        #[arg(long)]
        text: bool,
    },
    /// The network key and its identifier
    NetworkKey,
    /// Generate a fresh key
    Ephemeral {
        #[command(subcommand)]
        kind: EphemeralKind,
    },
    /// The certificate authority chain (certificate mode only)
    TrustAnchor,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum EphemeralKind {
    /// 32-byte symmetric key
    Symmetric,
    /// P-384 key pair
    P384,
    /// P-521 key pair
    P521,
    /// Key pair on a wire curve identifier
    Curve {
        /// COSE curve identifier
        #[arg(allow_negative_numbers = true)]
        id: i32,
    },
}

impl From<EphemeralKind> for EphemeralRequest {
    fn from(kind: EphemeralKind) -> Self {
        match kind {
            EphemeralKind::Symmetric => Self::Symmetric,
            EphemeralKind::P384 => Self::EllipticCurve { curve: CurveId::P384 },
            EphemeralKind::P521 => Self::EllipticCurve { curve: CurveId::P521 },
            EphemeralKind::Curve { id } => Self::EllipticCurve { curve: CurveId(id) },
        }
    }
}

/// Failure to answer the command.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// Invalid key store configuration
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// Provisioning document could not be used
    #[error("provisioning: {0}")]
    Provision(#[from] ProvisionError),

    /// The key store refused the request
    #[error("key request: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// Identifier argument is not hex
    #[error("identifier {id:?} is not hex: {source}")]
    Identifier {
        /// Argument as given
        id: String,
        /// Decoder error
        source: hex::FromHexError,
    },

    /// Report could not be rendered
    #[error("report: {0}")]
    Json(#[from] serde_json::Error),

    /// Report could not be written
    #[error("stdout: {0}")]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "request failed");
            ExitCode::FAILURE
        },
    }
}

/// `RUST_LOG` wins; otherwise `-d` forces debug, else `--log-level`.
fn init_tracing(args: &Args) {
    let default = if args.debug { "debug" } else { args.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();
}

fn run(args: &Args) -> Result<(), CliError> {
    let store = build_store(args)?;
    let report = answer(&store, args.command.as_ref().unwrap_or(&Command::Status), args.reveal)?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report)?;
    writeln!(stdout)?;
    Ok(())
}

fn build_store(args: &Args) -> Result<KeyStore, CliError> {
    let mode = EncryptionMode::try_from(args.encryption)?;

    let provisioning = match &args.provisioning {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading provisioning document");
            Provisioning::from_path(path)?
        },
        None => {
            tracing::warn!("no provisioning document, using built-in test credentials");
            tracing::warn!("These keys are public and NOT suitable for real use!");
            test_keys::provisioning()
        },
    };

    Ok(provisioning.build(mode)?)
}

fn answer(store: &KeyStore, command: &Command, reveal: bool) -> Result<Report, CliError> {
    let report = match command {
        Command::Status => Report::status(store),
        Command::Resolve { id, text } => {
            let key_id = parse_id(id, *text)?;
            let material = store.key(&key_id)?;
            let source = store
                .resolver()
                .lookup(&key_id)
                .map(|(source, _)| source)
                .ok_or(KeyStoreError::MissingKey)?;
            Report::key(&key_id, source, &material, reveal)
        },
        Command::NetworkKey => Report::network_key(&store.network_key()?, reveal),
        Command::Ephemeral { kind } => {
            Report::ephemeral(&store.ephemeral_key((*kind).into())?, reveal)
        },
        Command::TrustAnchor => Report::trust_anchor(&store.trust_anchor()?),
    };
    Ok(report)
}

fn parse_id(id: &str, text: bool) -> Result<KeyId, CliError> {
    if text {
        return Ok(KeyId::from(id));
    }
    hex::decode(id)
        .map(KeyId::new)
        .map_err(|source| CliError::Identifier { id: id.to_string(), source })
}

#[cfg(test)]
mod tests {
    use dps_keystore::{KeyMaterial, KeySource};

    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dps-keystore").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_to_pre_shared_key_status() {
        let args = parse(&[]);
        assert_eq!(args.encryption, 1);
        assert!(!args.debug);
        assert!(!args.reveal);
        assert_eq!(args.log_level, "info");
        assert_eq!(args.command, None);
    }

    #[test]
    fn parses_short_flags() {
        let args = parse(&["-x", "2", "-d", "trust-anchor"]);
        assert_eq!(args.encryption, 2);
        assert!(args.debug);
        assert_eq!(args.command, Some(Command::TrustAnchor));
    }

    #[test]
    fn parses_negative_curve_identifier() {
        let args = parse(&["ephemeral", "curve", "-7"]);
        let Some(Command::Ephemeral { kind }) = args.command else {
            unreachable!("ephemeral command expected");
        };
        assert_eq!(
            EphemeralRequest::from(kind),
            EphemeralRequest::EllipticCurve { curve: CurveId(-7) }
        );
    }

    #[test]
    fn reveal_is_accepted_after_subcommand() {
        let args = parse(&["network-key", "--reveal"]);
        assert!(args.reveal);
    }

    #[test]
    fn unknown_mode_fails_construction() {
        let args = parse(&["-x", "3"]);
        assert!(matches!(build_store(&args), Err(CliError::Config(ConfigError::UnknownMode(3)))));
    }

    #[test]
    fn certificate_mode_reports_node_identity() {
        let store = build_store(&parse(&["-x", "2"])).unwrap();
        let value = serde_json::to_value(answer(&store, &Command::Status, false).unwrap()).unwrap();

        assert_eq!(value["mode"], "certificate");
        assert_eq!(value["selector"], 2);
        assert_eq!(value["node_identity"]["text"], test_keys::SUBSCRIBER_ID);
        assert_eq!(value["trust_anchor"], true);
    }

    #[test]
    fn pre_shared_key_mode_is_anonymous() {
        let store = build_store(&parse(&[])).unwrap();
        let value = serde_json::to_value(answer(&store, &Command::Status, false).unwrap()).unwrap();

        assert!(value["node_identity"].is_null());
        assert_eq!(value["bindings"], 2);
        assert_eq!(value["trust_anchor"], false);
    }

    #[test]
    fn resolves_hex_identifier() {
        let store = build_store(&parse(&[])).unwrap();
        let command = Command::Resolve { id: test_keys::BINDINGS[0].0.to_string(), text: false };
        let value = serde_json::to_value(answer(&store, &command, true).unwrap()).unwrap();

        assert_eq!(value["source"], "binding");
        assert_eq!(value["material"]["key"], test_keys::BINDINGS[0].1);
    }

    #[test]
    fn resolves_text_identifier_from_fallback() {
        let store = build_store(&parse(&[])).unwrap();
        let command = Command::Resolve { id: test_keys::PUBLISHER_ID.to_string(), text: true };
        let value = serde_json::to_value(answer(&store, &command, false).unwrap()).unwrap();

        assert_eq!(value["source"], KeySource::Publisher.to_string());
        assert_eq!(value["material"]["kind"], "certificate");
    }

    #[test]
    fn unknown_identifier_is_missing() {
        let store = build_store(&parse(&[])).unwrap();
        let command = Command::Resolve { id: "00".repeat(16), text: false };
        assert!(matches!(
            answer(&store, &command, false),
            Err(CliError::KeyStore(KeyStoreError::MissingKey))
        ));
    }

    #[test]
    fn malformed_hex_identifier_is_rejected() {
        assert!(matches!(parse_id("not-hex", false), Err(CliError::Identifier { .. })));
    }

    #[test]
    fn trust_anchor_is_missing_outside_certificate_mode() {
        let store = build_store(&parse(&["-x", "0"])).unwrap();
        assert!(matches!(
            answer(&store, &Command::TrustAnchor, false),
            Err(CliError::KeyStore(KeyStoreError::MissingKey))
        ));
    }

    #[test]
    fn unsupported_curve_is_reported() {
        let store = build_store(&parse(&[])).unwrap();
        let command = Command::Ephemeral { kind: EphemeralKind::Curve { id: 1 } };
        assert!(matches!(
            answer(&store, &command, false),
            Err(CliError::KeyStore(KeyStoreError::UnsupportedKey { curve: CurveId::P256 }))
        ));
    }

    #[test]
    fn ephemeral_p521_has_wire_width() {
        let store = build_store(&parse(&[])).unwrap();
        let material = store.ephemeral_key(EphemeralKind::P521.into()).unwrap();
        let KeyMaterial::EllipticCurve(pair) = material else {
            unreachable!("key pair expected");
        };
        assert_eq!(pair.x().len(), 66);
    }

    #[test]
    fn loads_provisioning_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(test_keys::provisioning().to_json().unwrap().as_bytes()).unwrap();

        let path = file.path().to_str().unwrap();
        let store = build_store(&parse(&["--provisioning", path, "-x", "2"])).unwrap();
        assert_eq!(store.node_identity(), Some(&KeyId::from(test_keys::SUBSCRIBER_ID)));
    }
}
