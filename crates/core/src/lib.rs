pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;
pub mod provider;

pub use cpq::distribution::DistributionCalculator;
pub use cpq::pipeline::{DiscountApplication, DiscountStage, StageOutcome};
pub use cpq::quote::{DistributionPriceSummary, FinalTotals, QuoteCalculator, QuotePriceSummary};
pub use cpq::validation::{DeterministicPriceValidator, PriceValidator};
pub use cpq::PricingService;
pub use domain::discount::{
    ApplicablePredefinedDiscounts, CustomDiscount, DiscountKind, DiscountMode, DiscountSelection,
    MultiYearDiscount, PrePayDiscount, PredefinedDiscount, PromotionalDiscount,
    SpecialNegotiationDiscount,
};
pub use domain::price::{MarginTaxChange, PriceInput, PriceSummary, RoundingMode};
pub use domain::quote::{
    ContractType, Distribution, DistributionId, PriceRow, PricingTerms, Quote, QuoteId,
};
pub use errors::{ApplicationError, CalculationError, ConstraintViolation, InterfaceError};
pub use provider::{InMemoryQuoteDataProvider, ProviderError, QuoteDataProvider};
