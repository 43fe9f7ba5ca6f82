//! Yahoo Finance API client

use crate::collector::FinancialDataProvider;
use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use yahoo_finance_api as yahoo;

const BASE_URL: &str = "https://query2.finance.yahoo.com";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

const SUMMARY_MODULES: &str = "price,summaryProfile,summaryDetail,defaultKeyStatistics,financialData,\
incomeStatementHistory,balanceSheetHistory,cashflowStatementHistory,incomeStatementHistoryQuarterly";

/// Company fields copied into the snapshot, in display order
pub const INFO_FIELDS: [&str; 19] = [
    "shortName",
    "sector",
    "industry",
    "marketCap",
    "trailingPE",
    "forwardPE",
    "trailingEps",
    "forwardEps",
    "dividendYield",
    "beta",
    "fiftyTwoWeekHigh",
    "fiftyTwoWeekLow",
    "totalRevenue",
    "netIncomeToCommon",
    "debtToEquity",
    "returnOnEquity",
    "currentRatio",
    "freeCashflow",
    "operatingCashflow",
];

// Modules searched for company fields, first hit wins.
const INFO_MODULES: [&str; 5] = [
    "price",
    "summaryProfile",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
];

/// Structured financial data for one ticker
///
/// Statement tables map a period end date (`YYYY-MM-DD`) to that period's
/// line items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialSnapshot {
    pub info: Map<String, Value>,
    pub income_statement: Map<String, Value>,
    pub balance_sheet: Map<String, Value>,
    pub cash_flow: Map<String, Value>,
    pub quarterly_income: Map<String, Value>,
}

impl FinancialSnapshot {
    /// Render as the structured-data half of the financial document
    pub fn render(&self) -> String {
        let sections = [
            ("Company Info", &self.info),
            ("Income Statement", &self.income_statement),
            ("Balance Sheet", &self.balance_sheet),
            ("Cash Flow", &self.cash_flow),
            ("Quarterly Income Statement", &self.quarterly_income),
        ];

        let mut out = String::from("## Part A: Yahoo Finance Structured Data\n");
        for (title, table) in sections {
            let body = serde_json::to_string_pretty(table).unwrap_or_else(|_| "{}".to_string());
            out.push_str(&format!("### {title}\n{body}\n\n"));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
            && self.income_statement.is_empty()
            && self.balance_sheet.is_empty()
            && self.cash_flow.is_empty()
            && self.quarterly_income.is_empty()
    }
}

/// Yahoo Finance API client
///
/// `quoteSummary` only answers requests carrying a session cookie and the
/// matching crumb. The session is created on first use and shared by clones.
#[derive(Debug, Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb_url: String,
    session: Arc<Mutex<Option<Session>>>,
    latest_close: bool,
}

#[derive(Debug, Clone)]
struct Session {
    cookie: String,
    crumb: String,
}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            cookie_url: COOKIE_URL.to_string(),
            crumb_url: CRUMB_URL.to_string(),
            session: Arc::new(Mutex::new(None)),
            latest_close: true,
        })
    }

    /// Point the summary endpoint elsewhere
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Point the cookie and crumb endpoints elsewhere
    pub fn with_session_urls(
        mut self,
        cookie_url: impl Into<String>,
        crumb_url: impl Into<String>,
    ) -> Self {
        self.cookie_url = cookie_url.into();
        self.crumb_url = crumb_url.into();
        self
    }

    /// Skip the latest-close lookup
    pub fn without_latest_close(mut self) -> Self {
        self.latest_close = false;
        self
    }

    async fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }

        let session = self.open_session().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn reset_session(&self) {
        *self.session.lock().await = None;
    }

    // The cookie endpoint answers 404 but still sets the cookie, so its status is not checked.
    async fn open_session(&self) -> Result<Session> {
        let response = self.client.get(&self.cookie_url).send().await?;
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .ok_or_else(|| StockError::YahooFinanceError("no session cookie returned".to_string()))?
            .to_string();

        let response = self
            .client
            .get(&self.crumb_url)
            .header(COOKIE, &cookie)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StockError::YahooFinanceError(format!(
                "HTTP error fetching crumb: {}",
                response.status()
            )));
        }

        let crumb = response.text().await?.trim().to_string();
        if crumb.is_empty() || crumb.contains(' ') {
            return Err(StockError::YahooFinanceError(format!("invalid crumb '{crumb}'")));
        }

        debug!("Opened Yahoo session");
        Ok(Session { cookie, crumb })
    }

    /// Fetch the raw `quoteSummary` result object for a symbol
    ///
    /// A rejected session is renewed once before giving up.
    pub async fn fetch_summary(&self, symbol: &str) -> Result<Value> {
        let mut response = self.request_summary(symbol, &self.session().await?).await?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!("Yahoo session rejected ({}), renewing", response.status());
            self.reset_session().await;
            response = self.request_summary(symbol, &self.session().await?).await?;
        }

        if !response.status().is_success() {
            return Err(StockError::YahooFinanceError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let data: Value = response.json().await?;
        let summary = &data["quoteSummary"];

        if let Some(error) = summary.get("error").filter(|e| !e.is_null()) {
            return Err(StockError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: error["description"]
                    .as_str()
                    .map_or_else(|| error.to_string(), ToString::to_string),
            });
        }

        summary["result"]
            .get(0)
            .cloned()
            .ok_or_else(|| StockError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "empty quoteSummary result".to_string(),
            })
    }

    async fn request_summary(&self, symbol: &str, session: &Session) -> Result<Response> {
        let url = format!("{}/v10/finance/quoteSummary/{symbol}", self.base_url);
        Ok(self
            .client
            .get(&url)
            .header(COOKIE, &session.cookie)
            .query(&[("modules", SUMMARY_MODULES), ("crumb", session.crumb.as_str())])
            .send()
            .await?)
    }

    /// Latest closing price
    pub async fn get_latest_close(&self, symbol: &str) -> Result<f64> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let response = provider
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quote = response
            .last_quote()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        Ok(quote.close)
    }
}

#[async_trait]
impl FinancialDataProvider for YahooFinanceClient {
    #[instrument(skip(self))]
    async fn snapshot(&self, ticker: &str) -> Result<FinancialSnapshot> {
        let summary = self.fetch_summary(ticker).await?;
        let mut snapshot = parse_quote_summary(&summary);

        if self.latest_close {
            match self.get_latest_close(ticker).await {
                Ok(close) => {
                    snapshot.info.insert("latestClose".to_string(), Value::from(close));
                }
                Err(e) => warn!("Latest close unavailable for {ticker}: {e}"),
            }
        }

        debug!("Snapshot for {ticker}: {} info fields", snapshot.info.len());
        Ok(snapshot)
    }
}

/// Extract the whitelisted fields and statement tables from a `quoteSummary` result
pub fn parse_quote_summary(summary: &Value) -> FinancialSnapshot {
    let mut info = Map::new();
    for field in INFO_FIELDS {
        let found = INFO_MODULES
            .iter()
            .filter_map(|module| summary[*module].get(field))
            .find_map(plain_value);
        if let Some(value) = found {
            info.insert(field.to_string(), value);
        }
    }

    FinancialSnapshot {
        info,
        income_statement: statement_table(
            &summary["incomeStatementHistory"]["incomeStatementHistory"],
        ),
        balance_sheet: statement_table(&summary["balanceSheetHistory"]["balanceSheetStatements"]),
        cash_flow: statement_table(&summary["cashflowStatementHistory"]["cashflowStatements"]),
        quarterly_income: statement_table(
            &summary["incomeStatementHistoryQuarterly"]["incomeStatementHistory"],
        ),
    }
}

// Yahoo wraps numbers as {"raw": .., "fmt": ..} and uses {} for missing values.
fn plain_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(obj) if obj.is_empty() => None,
        Value::Object(obj) => obj.get("raw").cloned(),
        other => Some(other.clone()),
    }
}

fn statement_table(rows: &Value) -> Map<String, Value> {
    let mut table = Map::new();
    let Some(rows) = rows.as_array() else {
        return table;
    };

    for row in rows {
        let Some(date) = period_key(&row["endDate"]) else {
            continue;
        };
        let Some(fields) = row.as_object() else {
            continue;
        };

        let items: Map<String, Value> = fields
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "endDate" | "maxAge"))
            .filter_map(|(key, value)| plain_value(value).map(|v| (key.clone(), v)))
            .collect();
        table.insert(date, Value::Object(items));
    }
    table
}

fn period_key(end_date: &Value) -> Option<String> {
    if let Some(fmt) = end_date["fmt"].as_str() {
        return Some(fmt.to_string());
    }
    let raw = end_date["raw"].as_i64().or_else(|| end_date.as_i64())?;
    DateTime::from_timestamp(raw, 0).map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_summary() -> Value {
        json!({
            "price": {"shortName": "Apple Inc.", "marketCap": {"raw": 3.5e12, "fmt": "3.5T"}},
            "summaryProfile": {"sector": "Technology", "industry": "Consumer Electronics"},
            "summaryDetail": {"trailingPE": {"raw": 33.1}, "dividendYield": {}, "beta": {"raw": 1.2}},
            "financialData": {"totalRevenue": {"raw": 391035000000_i64}, "currentRatio": {"raw": 0.87}},
            "incomeStatementHistory": {"incomeStatementHistory": [
                {"maxAge": 1, "endDate": {"raw": 1727654400, "fmt": "2024-09-30"},
                 "totalRevenue": {"raw": 391035000000_i64}, "netIncome": {"raw": 93736000000_i64}}
            ]},
            "balanceSheetHistory": {"balanceSheetStatements": [
                {"endDate": {"raw": 1727654400}, "totalAssets": {"raw": 364980000000_i64}}
            ]}
        })
    }

    #[test]
    fn test_parse_whitelisted_fields() {
        let snapshot = parse_quote_summary(&sample_summary());

        assert_eq!(snapshot.info["shortName"], "Apple Inc.");
        assert_eq!(snapshot.info["sector"], "Technology");
        assert_eq!(snapshot.info["trailingPE"], 33.1);
        assert!(!snapshot.info.contains_key("dividendYield"));
        assert!(!snapshot.info.contains_key("forwardEps"));
    }

    #[test]
    fn test_parse_statement_tables() {
        let snapshot = parse_quote_summary(&sample_summary());

        let year = &snapshot.income_statement["2024-09-30"];
        assert_eq!(year["netIncome"], 93736000000_i64);
        assert!(year.get("maxAge").is_none());
        assert!(year.get("endDate").is_none());

        // falls back to the raw timestamp when fmt is missing
        assert!(snapshot.balance_sheet.contains_key("2024-09-30"));
        assert!(snapshot.cash_flow.is_empty());
    }

    #[test]
    fn test_empty_summary_degrades() {
        let snapshot = parse_quote_summary(&json!({}));
        assert!(snapshot.is_empty());

        let rendered = snapshot.render();
        assert!(rendered.starts_with("## Part A: Yahoo Finance Structured Data\n### Company Info\n{}"));
        assert!(rendered.contains("### Quarterly Income Statement\n{}"));
    }

    mod http {
        use super::*;
        use wiremock::matchers::{header, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn mount_session(server: &MockServer, crumb: &str) {
            Mock::given(method("GET"))
                .and(path("/cookie"))
                .respond_with(
                    ResponseTemplate::new(404)
                        .insert_header("set-cookie", "A3=session-token; Max-Age=31557600; Domain=.yahoo.com; Path=/"),
                )
                .mount(server)
                .await;
            Mock::given(method("GET"))
                .and(path("/v1/test/getcrumb"))
                .and(header("cookie", "A3=session-token"))
                .respond_with(ResponseTemplate::new(200).set_body_string(crumb))
                .mount(server)
                .await;
        }

        fn client(server: &MockServer) -> YahooFinanceClient {
            YahooFinanceClient::new(Duration::from_secs(5))
                .unwrap()
                .with_base_url(server.uri())
                .with_session_urls(
                    format!("{}/cookie", server.uri()),
                    format!("{}/v1/test/getcrumb", server.uri()),
                )
                .without_latest_close()
        }

        #[tokio::test]
        async fn test_snapshot_sends_crumb_and_cookie() {
            let server = MockServer::start().await;
            mount_session(&server, "Xy7crumb").await;
            Mock::given(method("GET"))
                .and(path("/v10/finance/quoteSummary/AAPL"))
                .and(query_param("modules", SUMMARY_MODULES))
                .and(query_param("crumb", "Xy7crumb"))
                .and(header("cookie", "A3=session-token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "quoteSummary": {"result": [sample_summary()], "error": null}
                })))
                .expect(2)
                .mount(&server)
                .await;

            let client = client(&server);
            let snapshot = client.snapshot("AAPL").await.unwrap();
            assert_eq!(snapshot.info["industry"], "Consumer Electronics");

            // the session is reused
            client.clone().snapshot("AAPL").await.unwrap();
            let cookie_calls = server
                .received_requests()
                .await
                .unwrap()
                .iter()
                .filter(|r| r.url.path() == "/cookie")
                .count();
            assert_eq!(cookie_calls, 1);
        }

        #[tokio::test]
        async fn test_rejected_crumb_is_renewed() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/v1/test/getcrumb"))
                .respond_with(ResponseTemplate::new(200).set_body_string("stale"))
                .up_to_n_times(1)
                .with_priority(1)
                .mount(&server)
                .await;
            mount_session(&server, "fresh").await;
            Mock::given(method("GET"))
                .and(path("/v10/finance/quoteSummary/MSFT"))
                .and(query_param("crumb", "stale"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/v10/finance/quoteSummary/MSFT"))
                .and(query_param("crumb", "fresh"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "quoteSummary": {"result": [sample_summary()], "error": null}
                })))
                .mount(&server)
                .await;

            let snapshot = client(&server).snapshot("MSFT").await.unwrap();
            assert_eq!(snapshot.info["shortName"], "Apple Inc.");
        }

        #[tokio::test]
        async fn test_missing_cookie_is_an_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/cookie"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let err = client(&server).snapshot("AAPL").await.unwrap_err();
            assert!(matches!(err, StockError::YahooFinanceError(ref m) if m.contains("cookie")));
        }

        #[tokio::test]
        async fn test_unknown_symbol_is_unavailable() {
            let server = MockServer::start().await;
            mount_session(&server, "Xy7crumb").await;
            Mock::given(method("GET"))
                .and(path("/v10/finance/quoteSummary/ZZZZ"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found"}}
                })))
                .mount(&server)
                .await;

            let err = client(&server).snapshot("ZZZZ").await.unwrap_err();
            assert!(matches!(err, StockError::DataUnavailable { ref reason, .. } if reason == "Quote not found"));
        }
    }
}
