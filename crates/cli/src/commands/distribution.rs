use std::path::Path;

use pricewise_core::config::LoadOptions;
use pricewise_core::{DistributionId, MarginTaxChange};
use rust_decimal::Decimal;

use crate::commands::{
    application_failure, load_config, load_quote, service_for, to_data, CommandResult,
};

const COMMAND: &str = "distribution";

/// Optional margin/tax what-if. Unset values fall back to the stored terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarginTaxOverride {
    pub margin_value: Option<Decimal>,
    pub tax_value: Option<Decimal>,
}

impl MarginTaxOverride {
    fn is_empty(&self) -> bool {
        self.margin_value.is_none() && self.tax_value.is_none()
    }
}

pub fn run(
    options: &LoadOptions,
    path: &Path,
    distribution_id: &str,
    what_if: MarginTaxOverride,
) -> CommandResult {
    match execute(options, path, distribution_id, what_if) {
        Ok(result) | Err(result) => result,
    }
}

fn execute(
    options: &LoadOptions,
    path: &Path,
    distribution_id: &str,
    what_if: MarginTaxOverride,
) -> Result<CommandResult, CommandResult> {
    let config = load_config(COMMAND, options)?;
    let quote = load_quote(COMMAND, path)?;
    let id = DistributionId(distribution_id.to_string());

    let stored_terms = quote.distribution(&id).map(|distribution| distribution.terms.clone());
    let service = service_for(quote);

    let summary = match stored_terms {
        Some(terms) if !what_if.is_empty() => {
            let change = MarginTaxChange {
                margin_value: what_if.margin_value.unwrap_or(terms.margin_value),
                tax_value: what_if.tax_value.unwrap_or(terms.tax_value),
            };
            service.recalculate_distribution_after_margin(&id, change)
        }
        _ => service.price_distribution(&id),
    }
    .map_err(|error| application_failure(COMMAND, distribution_id, error))?;

    let summary = summary.rounded(config.pricing.display_scale, config.pricing.rounding);

    Ok(CommandResult::success_with_data(
        COMMAND,
        format!("priced distribution {distribution_id}"),
        Some(to_data(COMMAND, &summary)?),
    ))
}
