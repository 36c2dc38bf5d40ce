mod cli;

fn main() -> anyhow::Result<()> {
    cli::start::run()
}
