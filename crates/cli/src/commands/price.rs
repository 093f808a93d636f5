use std::path::Path;

use pricewise_core::config::LoadOptions;
use pricewise_core::{QuotePriceSummary, RoundingMode};
use tracing::info;

use crate::commands::{
    application_failure, load_config, load_quote, service_for, to_data, CommandResult,
};

const COMMAND: &str = "price";

pub fn run(options: &LoadOptions, path: &Path, raw: bool) -> CommandResult {
    match execute(options, path, raw) {
        Ok(result) | Err(result) => result,
    }
}

fn execute(options: &LoadOptions, path: &Path, raw: bool) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, options)?;
    let quote = load_quote(COMMAND, path)?;
    let quote_id = quote.id.clone();

    let summary = service_for(quote)
        .price_quote(&quote_id)
        .map_err(|error| application_failure(COMMAND, &quote_id.0, error))?;

    let summary = if raw {
        summary
    } else {
        for_display(summary, config.pricing.display_scale, config.pricing.rounding)
    };

    info!(
        event_name = "cli.price.completed",
        quote_id = %quote_id.0,
        distributions = summary.distributions.len(),
        "quote priced"
    );

    Ok(CommandResult::success_with_data(
        COMMAND,
        format!("priced quote {}", quote_id.0),
        Some(to_data(COMMAND, &summary)?),
    ))
}

pub(crate) fn for_display(
    mut summary: QuotePriceSummary,
    scale: u32,
    mode: RoundingMode,
) -> QuotePriceSummary {
    summary.quote = summary.quote.rounded(scale, mode);
    for distribution in &mut summary.distributions {
        distribution.summary = distribution.summary.rounded(scale, mode);
    }
    summary
}
