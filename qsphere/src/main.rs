use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use qsphere::events::emit_event;
use qsphere::notation::{format_complex, parse_complex};
use qsphere::{
    Decompositions, Gate, OperatorQueue, RotationForm, Scene, State, StateInput, UnitaryMatrix,
    VisualizerConfig,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Single-qubit states and operators on the Bloch sphere
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults are used when absent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// File to write results to. If not provided, writes to stdout.
    #[arg(short, long, global = true)]
    output_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every decomposition of an operator as JSON.
    Decompose {
        /// Named gate, e.g. `h` or `rx(0.5)`.
        #[arg(short, long, conflicts_with = "matrix")]
        gate: Option<Gate>,
        /// The four entries a, b, c, d in complex notation.
        #[arg(
            short,
            long,
            num_args = 4,
            value_names = ["A", "B", "C", "D"],
            allow_hyphen_values = true
        )]
        matrix: Option<Vec<String>>,
    },
    /// Animate gates on a state and print one JSON event per line.
    Animate {
        /// Gates forming the product G1·G2·…; the last one acts first.
        #[arg(short, long, required = true)]
        gate: Vec<Gate>,
        /// Starting point as `x, y, z`.
        #[arg(long, conflicts_with = "polar", allow_hyphen_values = true)]
        state: Option<String>,
        /// Starting point as `theta, phi` in degrees.
        #[arg(long, allow_hyphen_values = true)]
        polar: Option<String>,
        /// zy, zx, xy, zyx or axis.
        #[arg(short, long, default_value = "zy")]
        form: RotationForm,
    },
    /// Seeded random unitaries with their decompositions.
    Random {
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Overrides the configured seed.
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Check text against the complex number grammar and print it back canonically.
    Parse {
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<VisualizerConfig> {
    match path {
        Some(path) => VisualizerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(VisualizerConfig::default()),
    }
}

fn operator_from_args(gate: Option<Gate>, matrix: Option<Vec<String>>) -> Result<UnitaryMatrix> {
    match (gate, matrix) {
        (Some(gate), _) => Ok(gate.matrix()),
        (None, Some(entries)) => {
            let [a, b, c, d] = <[String; 4]>::try_from(entries)
                .map_err(|_| anyhow::anyhow!("expected exactly four matrix entries"))?;
            UnitaryMatrix::parse([a.as_str(), b.as_str(), c.as_str(), d.as_str()])
                .context("invalid operator")
        }
        (None, None) => bail!("either --gate or --matrix is required"),
    }
}

fn start_state(
    state: Option<String>,
    polar: Option<String>,
    config: &VisualizerConfig,
) -> Result<State> {
    let input = match (state, polar) {
        (Some(text), _) => StateInput::parse_cartesian(&text)?,
        (None, Some(text)) => StateInput::parse_polar_degrees(&text)?,
        (None, None) => return Ok(State::default()),
    };
    State::from_input(input, config.unit_policy).context("invalid starting state")
}

fn run(cli: Cli, writer: &mut impl Write) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Decompose { gate, matrix } => {
            let operator = operator_from_args(gate, matrix)?;
            let all = Decompositions::from_operator(operator);
            let json_output = serde_json::to_string_pretty(&all)?;
            writeln!(writer, "{}", json_output)?;
        }
        Command::Animate {
            gate,
            state,
            polar,
            form,
        } => {
            let start = start_state(state, polar, &config)?;
            let mut queue = OperatorQueue::new();
            for g in &gate {
                queue.push(g.matrix());
            }

            let mut scene = Scene::new(config);
            let id = scene.add_vector(start)?;
            info!(gates = gate.len(), %form, "animating");
            let mut playback = queue.start(id);
            for event in playback.run(&mut scene, form)? {
                emit_event(&event, writer)?;
            }
        }
        Command::Random { count, seed } => {
            let seed = seed.unwrap_or(config.random_seed);
            let all: Vec<Decompositions> = UnitaryMatrix::random_batch(seed, count)
                .into_iter()
                .map(Decompositions::from_operator)
                .collect();
            let json_output = serde_json::to_string_pretty(&all)?;
            writeln!(writer, "{}", json_output)?;
        }
        Command::Parse { text } => {
            let z = parse_complex(&text).with_context(|| format!("cannot parse {text:?}"))?;
            writeln!(writer, "{}", format_complex(z))?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // logs go to stderr so JSON on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.output_file.clone() {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            run(cli, &mut writer)?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            run(cli, &mut writer)?;
        }
    }
    Ok(())
}
