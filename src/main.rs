use clap::Parser;
use speedy_softmax::bench::{self, BenchConfig};
use speedy_softmax::SoftmaxError;
use tracing_subscriber::EnvFilter;

/// Times a row-wise softmax over a random batch and reports latency and bandwidth.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rows in the input batch.
    #[arg(long, default_value_t = 128)]
    batch_size: usize,

    /// Columns of the input batch.
    #[arg(long, default_value_t = 1024)]
    input_dim: usize,

    /// Number of timed repetitions.
    #[arg(long, default_value_t = 1000)]
    num_reps: usize,

    /// Execution device: `cpu`, `cuda` or `cuda:N`.
    #[arg(long, default_value = "cpu")]
    device: String,
}

impl From<Args> for BenchConfig {
    fn from(args: Args) -> Self {
        Self {
            batch_size: args.batch_size,
            input_dim: args.input_dim,
            num_reps: args.num_reps,
            device: args.device,
        }
    }
}

fn main() -> Result<(), SoftmaxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config: BenchConfig = Args::parse().into();
    tracing::debug!(?config, "parsed arguments");

    let report = bench::run(&config)?;
    println!("{report}");
    Ok(())
}
