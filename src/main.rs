use agent_practice::practice::config::{Services, Settings};
use agent_practice::practice::newsletter::{NewsletterPipeline, NewsletterRequest};
use agent_practice::practice::server::{self, AppState};
use agent_practice::practice::stock::{StockPipeline, StockRequest};
use agent_practice::practice::types::Language;
use agent_practice::practice::workflow::graph::RunEvent;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a newsletter about a keyword
    Newsletter {
        #[arg(short, long)]
        keyword: String,

        #[arg(short, long, value_enum, default_value_t = Language::English)]
        language: Language,
    },
    /// Ask the stock analysis team a question
    Stock {
        #[arg(short, long)]
        question: String,

        #[arg(short, long, value_enum, default_value_t = Language::English)]
        language: Language,
    },
    /// Serve the browser UI and HTTP API
    Serve {
        /// Overrides the port from the settings file
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Print step progress as the run reports it
fn print_progress(mut rx: mpsc::Receiver<RunEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                RunEvent::StepStarted { step, .. } => println!("▶ {}", step),
                RunEvent::StepCompleted { step, .. } => println!("✔ {}", step),
                RunEvent::Failed { step, error, .. } => match step {
                    Some(step) => println!("✘ {}: {}", step, error),
                    None => println!("✘ {}", error),
                },
                RunEvent::Finished { .. } => println!("Done."),
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Args::parse();

    if matches!(args.command, Commands::Serve { .. }) {
        tracing_subscriber::fmt::init();
    } else {
        env_logger::init();
    }

    let settings = Settings::load(args.config.as_deref())?;
    let services = Services::from_settings(&settings).await?;

    match args.command {
        Commands::Newsletter { keyword, language } => {
            let pipeline = NewsletterPipeline::new(&services, &settings)?;

            let (tx, rx) = mpsc::channel(100);
            let printer = print_progress(rx);
            let result = pipeline
                .stream(NewsletterRequest { keyword, language }, tx)
                .await;
            printer.await?;

            let newsletter = result?;
            println!("\n{}", newsletter.content);
        }
        Commands::Stock { question, language } => {
            let pipeline = StockPipeline::new(&services, &settings).await?;

            let (tx, rx) = mpsc::channel(100);
            let printer = print_progress(rx);
            let result = pipeline.stream(StockRequest { question, language }, tx).await;
            printer.await?;

            let report = result?;
            for message in report.messages.iter().skip(1) {
                let author = message.name.as_deref().unwrap_or(&message.role);
                println!("\n## {}\n\n{}", author, message.content);
            }
            if report.chart.is_some() {
                println!("\n(chart generated; open the web UI to view it)");
            }
        }
        Commands::Serve { port } => {
            let state = AppState {
                newsletter: Arc::new(NewsletterPipeline::new(&services, &settings)?),
                stock: Arc::new(StockPipeline::new(&services, &settings).await?),
            };
            server::serve(port.unwrap_or(settings.server.port), state).await?;
        }
    }

    Ok(())
}
