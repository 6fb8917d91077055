// The natcert CLI.
// You can prove a single identity, evaluate an inline expression, build a request file,
// or reverify stored certificates.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mimalloc::MiMalloc;
use natcert::emitter::{ProofKind, Request};
use natcert::error::Error;
use natcert::evaluator::evaluate_inline;
use natcert::project::ConfigOverride;
use natcert::verifier::{Target, Verifier};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(
    name = "natcert",
    about = "Proof certificates for arithmetic over unary naturals",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// The longest single chain a certificate may contain
    #[clap(long, global = true, value_name = "N")]
    max_chain_length: Option<u64>,

    /// Where certificates and the manifest are stored
    #[clap(long, global = true, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    MultiplicationTable,
    Fibonacci,
    GoldenRatio,
    PiLeibniz,
    Sqrt2Matrix,
    Commutativity,
    Associativity,
    Addition,
}

#[derive(Subcommand)]
enum Command {
    /// Emit one certificate, print its declarations and verify it
    Prove {
        #[clap(value_enum)]
        kind: Kind,

        /// The container the declarations go in
        #[clap(long)]
        container: String,

        #[clap(long)]
        depth: Option<u64>,

        #[clap(long)]
        multiplier: Option<u64>,

        /// The left operand, for commutativity, associativity and addition
        #[clap(long)]
        left: Option<u64>,

        /// The middle operand, for associativity
        #[clap(long)]
        middle: Option<u64>,

        /// The right operand, for addition
        #[clap(long)]
        right: Option<u64>,
    },

    /// Evaluate an inline expression like "3 * 4" or "fibonacci(10) == 55"
    Eval {
        #[clap(value_name = "EXPR")]
        expr: String,
    },

    /// Build every request in a request file and write the build cache
    Build {
        #[clap(value_name = "FILE")]
        requests: PathBuf,

        /// Ignore cached certificates and emit everything again
        #[clap(long)]
        nohash: bool,

        /// Do not write the build cache
        #[clap(long)]
        dry_run: bool,
    },

    /// Reverify a file of stored certificates from scratch
    Verify {
        #[clap(value_name = "FILE")]
        certificates: PathBuf,
    },
}

fn required(value: Option<u64>, flag: &str, kind: Kind) -> Result<u64, String> {
    value.ok_or_else(|| format!("Error: {:?} needs --{}", kind, flag))
}

fn proof_kind(
    kind: Kind,
    depth: Option<u64>,
    multiplier: Option<u64>,
    left: Option<u64>,
    middle: Option<u64>,
    right: Option<u64>,
) -> Result<ProofKind, String> {
    let need_depth = || required(depth, "depth", kind);
    Ok(match kind {
        Kind::MultiplicationTable => ProofKind::MultiplicationTable {
            multiplier: required(multiplier, "multiplier", kind)?,
            depth: need_depth()?,
        },
        Kind::Fibonacci => ProofKind::Fibonacci { depth: need_depth()? },
        Kind::GoldenRatio => ProofKind::GoldenRatio { depth: need_depth()? },
        Kind::PiLeibniz => ProofKind::PiLeibniz { depth: need_depth()? },
        Kind::Sqrt2Matrix => ProofKind::Sqrt2Matrix { depth: need_depth()? },
        Kind::Commutativity => ProofKind::Commutativity {
            left_operand: required(left, "left", kind)?,
            depth: need_depth()?,
        },
        Kind::Associativity => ProofKind::Associativity {
            left: required(left, "left", kind)?,
            middle: required(middle, "middle", kind)?,
            depth: need_depth()?,
        },
        Kind::Addition => ProofKind::Addition {
            left: required(left, "left", kind)?,
            right: required(right, "right", kind)?,
        },
    })
}

fn run(verifier: Verifier) {
    match verifier.run() {
        Err(e) => {
            println!("{}", e);
            std::process::exit(1);
        }
        Ok(output) => {
            if !output.is_success() {
                std::process::exit(1);
            }
        }
    }
}

fn main() {
    // Use RUST_LOG env var to control log levels, e.g.:
    //   RUST_LOG=natcert::emitter=debug natcert prove fibonacci --container Fib --depth 5
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let mut overrides = ConfigOverride {
        max_chain_length: args.max_chain_length,
        build_dir: args.build_dir,
        ..ConfigOverride::default()
    };

    match args.command {
        Command::Prove {
            kind,
            container,
            depth,
            multiplier,
            left,
            middle,
            right,
        } => {
            let proof = match proof_kind(kind, depth, multiplier, left, middle, right) {
                Ok(proof) => proof,
                Err(e) => {
                    println!("{}", e);
                    std::process::exit(1);
                }
            };
            let request = Request::new(container, proof);
            let mut verifier = Verifier::new(Target::Request(request), overrides);
            verifier.verbose = true;
            run(verifier);
        }

        Command::Eval { expr } => match evaluate_inline(&expr) {
            Ok(result) => println!("{}", result),
            Err(e) => {
                let e = Error::from(e);
                println!("{}: {}", e.error_type(), e);
                std::process::exit(1);
            }
        },

        Command::Build {
            requests,
            nohash,
            dry_run,
        } => {
            if dry_run {
                overrides.write_cache = Some(false);
            }
            let mut verifier = Verifier::new(Target::Requests(requests), overrides);
            verifier.check_hashes = !nohash;
            run(verifier);
        }

        Command::Verify { certificates } => {
            run(Verifier::new(Target::Certificates(certificates), overrides));
        }
    }
}
