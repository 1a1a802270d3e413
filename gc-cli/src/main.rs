//! Command-line front end for the garbler, evaluator, and local tester.

use std::net::{TcpListener, TcpStream};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gc::circuit::{Assignment, CircuitFile};
use gc::protocol::{EvaluatorSession, GarblerSession, TcpChannel};
use gc::{local, GarblerState};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gc-cli", about = "Run the garbled-circuits protocol")]
struct Cli {
    /// Log verbosity, also overridable via RUST_LOG.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum PrintMode {
    Circuit,
    Table,
}

#[derive(Subcommand)]
enum Command {
    /// Garble a circuit and serve evaluators that connect.
    Garbler {
        /// Circuit JSON file.
        #[arg(short, long, default_value = "circuits/default.json")]
        circuit: String,
        /// Circuit id within the file to garble.
        #[arg(long)]
        id: String,
        /// Address to listen on, e.g. 127.0.0.1:9009.
        #[arg(long, default_value = "127.0.0.1:9009")]
        bind: String,
        /// Send labels in the clear instead of running oblivious transfer.
        #[arg(long)]
        no_oblivious_transfer: bool,
        /// This garbler's own cleartext input bits, in wire order.
        #[arg(long, value_delimiter = ',')]
        inputs: Vec<bool>,
    },
    /// Connect to a garbler and evaluate a circuit.
    Evaluator {
        /// Address to connect to.
        #[arg(long, default_value = "127.0.0.1:9009")]
        connect: String,
        /// Send labels in the clear instead of running oblivious transfer.
        #[arg(long)]
        no_oblivious_transfer: bool,
        /// This evaluator's own cleartext input bits, in wire order.
        #[arg(long, value_delimiter = ',')]
        inputs: Vec<bool>,
    },
    /// Garble and evaluate in one process, with no network involved.
    Local {
        /// Circuit JSON file.
        #[arg(short, long, default_value = "circuits/default.json")]
        circuit: String,
        /// Circuit id within the file to run.
        #[arg(long)]
        id: String,
        /// What to print: the full truth table, or the garbled tables.
        #[arg(short = 'm', long, value_enum, default_value = "circuit")]
        mode: PrintMode,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str())),
        )
        .init();

    match cli.command {
        Command::Garbler {
            circuit,
            id,
            bind,
            no_oblivious_transfer,
            inputs,
        } => run_garbler(&circuit, &id, &bind, no_oblivious_transfer, &inputs),
        Command::Evaluator {
            connect,
            no_oblivious_transfer,
            inputs,
        } => run_evaluator(&connect, no_oblivious_transfer, &inputs),
        Command::Local { circuit, id, mode } => run_local(&circuit, &id, mode),
    }
}

fn run_garbler(
    circuit_path: &str,
    id: &str,
    bind: &str,
    no_ot: bool,
    inputs: &[bool],
) -> Result<()> {
    let file = CircuitFile::load(circuit_path)
        .with_context(|| format!("loading circuit file {circuit_path}"))?;
    let circuit = file
        .circuit(id)
        .with_context(|| format!("circuit {id} not found in {circuit_path}"))?
        .clone();

    let mut rng = ChaCha20Rng::from_entropy();
    let state = GarblerState::garble(circuit.clone(), &mut rng).context("garbling circuit")?;

    let listener = TcpListener::bind(bind).with_context(|| format!("binding to {bind}"))?;
    tracing::info!(%bind, "garbler listening");
    let (stream, peer) = listener.accept().context("accepting evaluator connection")?;
    tracing::info!(%peer, "evaluator connected");

    let mut channel = TcpChannel::new(stream);
    let mut session = GarblerSession::new(&mut channel, state, no_ot);
    session.init()?;

    let alice_bits = wire_assignment(&circuit.alice, inputs)?;
    let outputs = session.run_assignment(&alice_bits, &mut rng)?;
    session.finish()?;
    print_outputs(&outputs);
    Ok(())
}

fn run_evaluator(connect: &str, no_ot: bool, inputs: &[bool]) -> Result<()> {
    let stream = TcpStream::connect(connect).with_context(|| format!("connecting to {connect}"))?;
    let mut channel = TcpChannel::new(stream);
    let mut rng = ChaCha20Rng::from_entropy();

    let mut session = EvaluatorSession::new(&mut channel, no_ot);
    let init = session.init()?;
    let bob_bits = wire_assignment(&init.circuit.bob, inputs)?;
    let outputs = session.run_assignment(&init, &bob_bits, &mut rng)?;
    print_outputs(&outputs);
    Ok(())
}

fn run_local(circuit_path: &str, id: &str, mode: PrintMode) -> Result<()> {
    let file = CircuitFile::load(circuit_path)
        .with_context(|| format!("loading circuit file {circuit_path}"))?;
    let circuit = file
        .circuit(id)
        .with_context(|| format!("circuit {id} not found in {circuit_path}"))?
        .clone();
    let mut rng = ChaCha20Rng::from_entropy();

    match mode {
        PrintMode::Table => {
            let rendered = local::dump_tables(circuit, &mut rng)?;
            print!("{rendered}");
        }
        PrintMode::Circuit => {
            println!("======== {id} ========");
            for (inputs, outputs) in local::truth_table(circuit.clone(), &mut rng)? {
                let a: Vec<String> = circuit
                    .alice
                    .iter()
                    .map(|w| (inputs[w] as u8).to_string())
                    .collect();
                let b: Vec<String> = circuit
                    .bob
                    .iter()
                    .map(|w| (inputs[w] as u8).to_string())
                    .collect();
                let out: Vec<String> = circuit
                    .out
                    .iter()
                    .map(|w| (outputs[w] as u8).to_string())
                    .collect();
                println!(
                    "  alice{:?} = {} bob{:?} = {}  outputs{:?} = {}",
                    circuit.alice,
                    a.join(" "),
                    circuit.bob,
                    b.join(" "),
                    circuit.out,
                    out.join(" ")
                );
            }
        }
    }
    Ok(())
}

fn wire_assignment(wires: &[u32], bits: &[bool]) -> Result<Assignment> {
    anyhow::ensure!(
        wires.len() == bits.len(),
        "expected {} input bits, got {}",
        wires.len(),
        bits.len()
    );
    Ok(wires.iter().copied().zip(bits.iter().copied()).collect())
}

fn print_outputs(outputs: &Assignment) {
    let mut wires: Vec<_> = outputs.keys().copied().collect();
    wires.sort_unstable();
    for w in wires {
        println!("wire {w} = {}", outputs[&w] as u8);
    }
}
