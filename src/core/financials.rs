//! Manufacturer income-statement ingestion
//!
//! Accepts the JSON document returned by the `INCOME_STATEMENT` market-data
//! endpoint (fetching it is left to the caller) and turns it into a
//! [`Patch`] for the manufacturer's financial fields.
//!
//! Amounts arrive as strings; the literal `"None"` marks a missing value.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::core::error::CatalogError;
use crate::core::record::Patch;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatement {
    symbol: Option<String>,
    #[serde(default)]
    annual_reports: Vec<RawReport>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReport {
    fiscal_date_ending: String,
    #[serde(default)]
    total_revenue: Option<String>,
    #[serde(default)]
    net_income: Option<String>,
    #[serde(default)]
    ebitda: Option<String>,
}

/// One fiscal year of an income statement
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualReport {
    pub fiscal_date_ending: NaiveDate,
    pub total_revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub ebitda: Option<f64>,
}

/// Parsed income statement, newest fiscal year first
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeStatement {
    pub symbol: Option<String>,
    pub annual_reports: Vec<AnnualReport>,
}

fn invalid(field: &str, message: impl Into<String>) -> CatalogError {
    CatalogError::validation(None, field, message)
}

fn parse_amount(field: &str, raw: Option<&str>) -> Result<Option<f64>, CatalogError> {
    match raw.map(str::trim) {
        None | Some("") | Some("None") => Ok(None),
        Some(text) => text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(field, format!("not a number: '{}'", text))),
    }
}

impl IncomeStatement {
    /// Parse the endpoint's JSON document
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| invalid("statement", format!("malformed JSON: {}", e)))?;

        // The endpoint reports throttling and bad symbols in-band
        for key in ["Error Message", "Note", "Information"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return Err(invalid("statement", message));
            }
        }

        let raw: RawStatement = serde_json::from_value(value)
            .map_err(|e| invalid("annualReports", e.to_string()))?;

        let mut annual_reports = raw
            .annual_reports
            .into_iter()
            .map(|r| {
                let fiscal_date_ending = NaiveDate::parse_from_str(&r.fiscal_date_ending, "%Y-%m-%d")
                    .map_err(|e| {
                        invalid(
                            "fiscalDateEnding",
                            format!("'{}': {}", r.fiscal_date_ending, e),
                        )
                    })?;
                Ok(AnnualReport {
                    fiscal_date_ending,
                    total_revenue: parse_amount("totalRevenue", r.total_revenue.as_deref())?,
                    net_income: parse_amount("netIncome", r.net_income.as_deref())?,
                    ebitda: parse_amount("ebitda", r.ebitda.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        if annual_reports.is_empty() {
            return Err(invalid("annualReports", "statement has no annual reports"));
        }
        annual_reports.sort_by(|a, b| b.fiscal_date_ending.cmp(&a.fiscal_date_ending));

        Ok(Self {
            symbol: raw.symbol,
            annual_reports,
        })
    }

    /// Most recent fiscal year
    pub fn latest(&self) -> Option<&AnnualReport> {
        self.annual_reports.first()
    }

    /// Year-over-year revenue growth in percent, latest vs prior year
    pub fn revenue_growth_rate(&self) -> Option<f64> {
        let latest = self.annual_reports.first()?.total_revenue?;
        let prior = self.annual_reports.get(1)?.total_revenue?;
        if prior == 0.0 {
            return None;
        }
        let growth = (latest - prior) / prior.abs() * 100.0;
        Some((growth * 100.0).round() / 100.0)
    }

    /// Manufacturer patch carrying the latest figures and the review date
    ///
    /// Figures the statement leaves out are not touched.
    pub fn to_patch(&self, reviewed_on: NaiveDate) -> Patch {
        let mut patch = Patch::new().set("last_financial_review", reviewed_on);
        if let Some(latest) = self.latest() {
            for (field, value) in [
                ("annual_revenue", latest.total_revenue),
                ("net_income", latest.net_income),
                ("ebitda", latest.ebitda),
                ("revenue_growth_rate", self.revenue_growth_rate()),
            ] {
                if let Some(v) = value {
                    patch = patch.set(field, v);
                }
            }
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::FinancialHealth;
    use crate::entities::Manufacturer;

    const SAMPLE: &str = r#"{
        "symbol": "HON",
        "annualReports": [
            {
                "fiscalDateEnding": "2023-12-31",
                "reportedCurrency": "USD",
                "totalRevenue": "36662000000",
                "netIncome": "5658000000",
                "ebitda": "None"
            },
            {
                "fiscalDateEnding": "2024-12-31",
                "reportedCurrency": "USD",
                "totalRevenue": "38498000000",
                "netIncome": "5705000000",
                "ebitda": "9700000000"
            }
        ],
        "quarterlyReports": []
    }"#;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_orders_newest_first() {
        let statement = IncomeStatement::from_json(SAMPLE).unwrap();
        assert_eq!(statement.symbol.as_deref(), Some("HON"));
        let latest = statement.latest().unwrap();
        assert_eq!(latest.fiscal_date_ending, date(2024, 12, 31));
        assert_eq!(latest.ebitda, Some(9.7e9));
        assert_eq!(statement.annual_reports[1].ebitda, None);
    }

    #[test]
    fn test_revenue_growth() {
        let statement = IncomeStatement::from_json(SAMPLE).unwrap();
        assert_eq!(statement.revenue_growth_rate(), Some(5.01));
    }

    #[test]
    fn test_patch_updates_manufacturer() {
        let statement = IncomeStatement::from_json(SAMPLE).unwrap();
        let record = Manufacturer::new("Honeywell", FinancialHealth::A).into();
        let updated = statement
            .to_patch(date(2026, 3, 1))
            .apply(&record)
            .unwrap();
        let mfr = updated.as_entity::<Manufacturer>().unwrap();
        assert_eq!(mfr.annual_revenue, Some(38_498_000_000.0));
        assert_eq!(mfr.net_income, Some(5_705_000_000.0));
        assert_eq!(mfr.revenue_growth_rate, Some(5.01));
        assert_eq!(mfr.last_financial_review, Some(date(2026, 3, 1)));
    }

    #[test]
    fn test_in_band_error_is_validation() {
        let err = IncomeStatement::from_json(
            r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref message, .. } if message.contains("frequency")));
    }

    #[test]
    fn test_rejects_bad_amount_and_empty_reports() {
        let bad = r#"{"annualReports": [{"fiscalDateEnding": "2024-12-31", "totalRevenue": "lots"}]}"#;
        assert!(matches!(
            IncomeStatement::from_json(bad),
            Err(CatalogError::Validation { ref field, .. }) if field == "totalRevenue"
        ));
        assert!(IncomeStatement::from_json(r#"{"annualReports": []}"#).is_err());
        assert!(IncomeStatement::from_json("not json").is_err());
    }
}
