use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use stock_agent_rs::api::{AgentServer, AppState};
use stock_agent_rs::tools::SerpApiClient;
use stock_agent_rs::{AgentConfig, ComparisonAgent, ComparisonRequest, SessionOutcome};

#[derive(Debug, Parser)]
#[command(name = "stock-agent", version, about = "Compare the total return of two stocks with a tool-calling model")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one comparison session and print the outcome.
    Compare {
        #[arg(default_value = "AAPL")]
        ticker_a: String,
        #[arg(default_value = "MSFT")]
        ticker_b: String,
        #[arg(long, default_value = "1 year")]
        period: String,
        /// Print the full outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Serve the calculation endpoints and, unless --calc-only, the session API.
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8000)]
        port: u16,
        #[arg(long)]
        calc_only: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compare {
            ticker_a,
            ticker_b,
            period,
            json,
        } => compare(&ticker_a, &ticker_b, &period, json),
        Command::Serve { port, calc_only } => serve(port, calc_only),
    }
}

fn load_agent() -> Result<ComparisonAgent, String> {
    let config = AgentConfig::from_env().map_err(|err| err.to_string())?;
    ComparisonAgent::from_config("stock-agent", config).map_err(|err| err.to_string())
}

fn compare(ticker_a: &str, ticker_b: &str, period: &str, json: bool) -> ExitCode {
    let agent = match load_agent() {
        Ok(agent) => agent,
        Err(err) => {
            error!(%err, "could not start agent");
            return ExitCode::FAILURE;
        }
    };
    let request = ComparisonRequest::new(ticker_a, ticker_b).with_period(period);
    let result = agent.execute(&request);

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(rendered) => println!("{}", rendered),
            Err(err) => eprintln!("error: {}", err),
        }
    } else if let Some(err) = &result.error {
        eprintln!("error: {}", err);
    } else {
        match &result.outcome {
            Some(SessionOutcome::Completed(report)) => {
                for side in [&report.comparison.a, &report.comparison.b] {
                    println!(
                        "{}: price return {:.2}%, dividend yield {:.2}%, total return {:.2}%",
                        side.ticker, side.price_return, side.dividend_yield, side.total_return
                    );
                }
                println!("Final comparison: {}", report.comparison.summary);
            }
            Some(outcome) => println!("{}", outcome),
            None => {}
        }
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn serve(port: u16, calc_only: bool) -> ExitCode {
    let state = if calc_only {
        calc_only_state()
    } else {
        match load_agent() {
            Ok(agent) => AppState::with_agent(Arc::new(agent)),
            Err(err) => {
                error!(%err, "could not start agent");
                return ExitCode::FAILURE;
            }
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "could not start runtime");
            return ExitCode::FAILURE;
        }
    };
    let server = AgentServer::new(port, state);
    if let Err(err) = runtime.block_on(server.start()) {
        error!(%err, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Calculation routes only; `/search` is mounted when a SerpAPI key is set.
fn calc_only_state() -> AppState {
    let search = match AgentConfig::from_env() {
        Ok(config) => SerpApiClient::new(config.search),
        Err(err) => {
            warn!(%err, "search proxy disabled");
            return AppState::default();
        }
    };
    match search {
        Ok(client) => AppState::default().with_search(Arc::new(client)),
        Err(err) => {
            warn!(%err, "search proxy disabled");
            AppState::default()
        }
    }
}
