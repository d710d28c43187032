mod cli;

fn main() -> anyhow::Result<()> {
    // stdout carries the sample stream
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    cli::run()
}
