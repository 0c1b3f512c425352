use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use factory_harvest::{DirSession, HarvestConfig, Harvester, render};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "factory-harvest")]
#[command(about = "Factory simulation telemetry harvester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one acquisition cycle over saved pages and export the dataset.
    Harvest {
        #[arg(long)]
        config: String,

        /// Directory of saved pages.
        #[arg(long)]
        pages: String,

        /// Output file; stdout when omitted.
        #[arg(short = 'o', long)]
        out: Option<String>,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },
    /// Validate the config and list stations with their children.
    Graph {
        #[arg(long)]
        config: String,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Harvest {
            config,
            pages,
            out,
            format,
        } => {
            // 1) Config + graph, validated before any fetch.
            let cfg = HarvestConfig::from_file(&config)
                .with_context(|| format!("load config {}", config))?;
            let mut harvester = Harvester::from_config(&cfg)?;

            // 2) One cycle over the saved pages.
            let mut session = DirSession::new(&pages);
            let data = harvester.dataset(&mut session, false)?;

            // 3) Export.
            let text = match format {
                Format::Csv => render::render_csv(data)?,
                Format::Json => render::render_json(data)?,
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, text).with_context(|| format!("write {}", path))?;
                    info!(path = %path, "wrote dataset");
                }
                None => print!("{}", text),
            }
        }
        Commands::Graph { config } => {
            let cfg = HarvestConfig::from_file(&config)
                .with_context(|| format!("load config {}", config))?;
            let graph = cfg.build_graph()?;
            let roots: Vec<&str> = graph.roots().iter().map(|s| s.id.as_str()).collect();
            println!("roots: {}", roots.join(", "));
            for s in graph.stations() {
                println!(
                    "{} ({}) {} -> [{}]",
                    s.id,
                    s.alias,
                    s.address,
                    s.children.join(", ")
                );
            }
        }
    }

    Ok(())
}
