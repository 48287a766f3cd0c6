//! Income statements fetched from the Alpha Vantage market data API

use miette::{IntoDiagnostic, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://www.alphavantage.co/query";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch the raw `INCOME_STATEMENT` document for a ticker symbol
///
/// The body is returned unparsed; in-band API errors are detected by
/// `IncomeStatement::from_json`.
pub fn fetch_income_statement(api_url: &str, symbol: &str, api_key: &str) -> Result<String> {
    tracing::debug!(symbol, url = api_url, "fetching income statement");

    let response = ureq::get(api_url)
        .timeout(REQUEST_TIMEOUT)
        .query("function", "INCOME_STATEMENT")
        .query("symbol", symbol)
        .query("apikey", api_key)
        .call();

    // Error displays carry the full URL, api key included
    match response {
        Ok(resp) => resp.into_string().into_diagnostic(),
        Err(ureq::Error::Status(code, _)) => Err(miette::miette!(
            "Income statement request for {} failed with HTTP {}",
            symbol,
            code
        )),
        Err(ureq::Error::Transport(t)) => Err(miette::miette!(
            "Income statement request for {} failed: {}",
            symbol,
            t.kind()
        )),
    }
}
