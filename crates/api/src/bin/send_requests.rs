//! Operator CLI: run one batch for a single request type.
//!
//! ```text
//! send_requests --request-type open_case --number 20 [--dry-run]
//! ```

use std::sync::Arc;

use casebridge_api::{logging, AppContext};
use casebridge_core::{BatchOperation, RequestType};
use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "send_requests", about = "Dispatch pending registry requests for one request type")]
struct Cli {
    /// Request type to process.
    #[arg(long = "request-type", value_enum)]
    request_type: CliRequestType,

    /// Maximum number of applications to process.
    #[arg(long, default_value_t = 50)]
    number: usize,

    /// List candidates without dispatching anything.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum CliRequestType {
    OpenCase,
    SendDecisionProposal,
    AddRecords,
    UpdateApplication,
    GetDecisionDetails,
}

impl From<CliRequestType> for BatchOperation {
    fn from(value: CliRequestType) -> Self {
        match value {
            CliRequestType::OpenCase => Self::Dispatch(RequestType::OpenCase),
            CliRequestType::SendDecisionProposal => Self::Dispatch(RequestType::DecisionProposal),
            CliRequestType::AddRecords => Self::Dispatch(RequestType::AddRecords),
            CliRequestType::UpdateApplication => Self::Dispatch(RequestType::UpdateRecords),
            CliRequestType::GetDecisionDetails => Self::FetchDecisions,
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    logging::init();
    let cli = Cli::parse();

    let config = match casebridge_infra::config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    let ctx = match AppContext::new(config) {
        Ok(ctx) => Arc::new(ctx),
        Err(err) => {
            eprintln!("failed to initialise: {err}");
            std::process::exit(1);
        }
    };

    let operation = BatchOperation::from(cli.request_type);
    match ctx.dispatch.run(operation, cli.number, cli.dry_run).await {
        Ok(summary) => {
            println!("{summary}");
        }
        Err(err) => {
            eprintln!("run failed: {err}");
            std::process::exit(1);
        }
    }
}
