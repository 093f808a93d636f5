use std::path::Path;

use pricewise_core::config::LoadOptions;
use pricewise_core::{FinalTotals, QuoteDataProvider};
use serde::Serialize;

use crate::commands::{
    application_failure, load_config, load_quote, service_for, to_data, CommandResult,
};

const COMMAND: &str = "final-total";

#[derive(Debug, Serialize)]
struct FinalTotalReport {
    #[serde(flatten)]
    totals: FinalTotals,
    /// Distributor totals cached on the quote after the run.
    distributions: Vec<MaterializedDistribution>,
}

#[derive(Debug, Serialize)]
struct MaterializedDistribution {
    id: String,
    total_price: Option<rust_decimal::Decimal>,
    final_total_price: Option<rust_decimal::Decimal>,
}

pub fn run(options: &LoadOptions, path: &Path) -> CommandResult {
    match execute(options, path) {
        Ok(result) | Err(result) => result,
    }
}

fn execute(options: &LoadOptions, path: &Path) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, options)?;
    let quote = load_quote(COMMAND, path)?;
    let quote_id = quote.id.clone();

    let service = service_for(quote);
    let totals = service
        .quote_final_total(&quote_id)
        .map_err(|error| application_failure(COMMAND, &quote_id.0, error))?;

    let stored = service
        .provider()
        .find_quote(&quote_id)
        .map_err(|error| application_failure(COMMAND, &quote_id.0, error.into()))?;

    let scale = config.pricing.display_scale;
    let strategy = config.pricing.rounding.strategy();
    let round = |value: rust_decimal::Decimal| value.round_dp_with_strategy(scale, strategy);

    let report = FinalTotalReport {
        totals: FinalTotals {
            total_price: round(totals.total_price),
            final_total_price: round(totals.final_total_price),
        },
        distributions: stored
            .map(|quote| quote.distributions)
            .unwrap_or_default()
            .into_iter()
            .map(|distribution| MaterializedDistribution {
                id: distribution.id.0,
                total_price: distribution.total_price.map(round),
                final_total_price: distribution.final_total_price.map(round),
            })
            .collect(),
    };

    Ok(CommandResult::success_with_data(
        COMMAND,
        format!("computed final total for quote {}", quote_id.0),
        Some(to_data(COMMAND, &report)?),
    ))
}
