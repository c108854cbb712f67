//! Search backends

pub mod premium;
pub mod scraper;
pub mod standard;

// Re-export providers for convenience
pub use premium::{collect_results, PremiumSearchArgs, PremiumSearchProvider, ResultStream, RulePayload};
pub use scraper::{run_scraper, ScraperConfig};
pub use standard::StandardSearchProvider;
