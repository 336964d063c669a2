//! Binance USD-M futures REST client.
//!
//! Implements the execution boundary against the live venue. Rejections
//! are classified from Binance error codes before they reach the engine.

use super::traits::{Exchange, ExchangeError, ExchangeResult};
use super::types::*;
use crate::config::BinanceConfig;
use crate::utils::decimal::{round_down_to_lot, round_to_tick};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};

const FUTURES_BASE_URL: &str = "https://fapi.binance.com";
const FUTURES_TESTNET_URL: &str = "https://testnet.binancefuture.com";

/// Classify a Binance error payload into the boundary taxonomy.
fn classify_error(code: i64, msg: &str) -> ExchangeError {
    match code {
        // -1003 too many requests, -1015 too many orders
        -1003 | -1015 => ExchangeError::RateLimited,
        // -2018 balance insufficient, -2019 margin insufficient
        -2018 | -2019 => ExchangeError::InsufficientFunds(msg.to_string()),
        // filter failures, precision, bad params, reduce-only rejections,
        // notional below minimum
        -1013 | -1102 | -1106 | -1111 | -1121 | -2022 | -4003 | -4164 => {
            ExchangeError::InvalidOrder(msg.to_string())
        }
        _ => ExchangeError::other(format!("code {code}: {msg}")),
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    #[serde(with = "rust_decimal::serde::str")]
    total_wallet_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    available_balance: Decimal,
    positions: Vec<AccountPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountPosition {
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    position_amt: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    entry_price: Decimal,
    position_side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenOrderResponse {
    order_id: i64,
    symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    orig_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    executed_qty: Decimal,
    side: String,
    position_side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    order_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionRisk {
    #[serde(with = "rust_decimal::serde::str")]
    position_amt: Decimal,
    position_side: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DualSideResponse {
    dual_side_position: bool,
}

/// Live execution boundary for Binance USD-M perpetuals.
pub struct BinanceExchange {
    http: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
    tick_size: Decimal,
    lot_size: Decimal,
}

impl BinanceExchange {
    pub fn new(config: &BinanceConfig) -> ExchangeResult<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ExchangeError::other(format!("http client: {e}")))?;

        let base_url = if config.testnet {
            FUTURES_TESTNET_URL.to_string()
        } else {
            FUTURES_BASE_URL.to_string()
        };

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url,
            tick_size: Decimal::new(1, config.price_decimals),
            lot_size: Decimal::new(1, config.amount_decimals),
        })
    }

    fn sign(&self, query_string: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64
    }

    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
            return Err(ExchangeError::RateLimited);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::other(format!("read body: {e}")))?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<ApiError>(&body) {
                return Err(classify_error(err.code, &err.msg));
            }
            return Err(ExchangeError::other(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str(&body)
            .map_err(|e| ExchangeError::other(format!("parse response: {e} ({body})")))
    }

    /// Public (unsigned) GET.
    async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let url = format!("{}{}?{}", self.base_url, path, query);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ExchangeError::other(format!("request {path}: {e}")))?;
        Self::handle_response(response).await
    }

    /// Signed request with timestamp and HMAC signature appended.
    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let mut query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&format!("timestamp={}", Self::timestamp()));
        let signature = self.sign(&query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        let response = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(|e| ExchangeError::other(format!("request {path}: {e}")))?;
        Self::handle_response(response).await
    }

    fn parse_position_side(raw: &str) -> Option<PositionSide> {
        match raw {
            "LONG" => Some(PositionSide::Long),
            "SHORT" => Some(PositionSide::Short),
            _ => None,
        }
    }

    /// Live magnitude of one position leg, zero when flat or unreported.
    async fn live_position_amount(
        &self,
        symbol: &str,
        side: PositionSide,
    ) -> ExchangeResult<Decimal> {
        let risks: Vec<PositionRisk> = self
            .signed_request(
                Method::GET,
                "/fapi/v2/positionRisk",
                &[("symbol", symbol.to_string())],
            )
            .await?;
        Ok(risks
            .iter()
            .find(|r| r.position_side == side.as_str())
            .map(|r| r.position_amt.abs())
            .unwrap_or(Decimal::ZERO))
    }
}

#[async_trait]
impl Exchange for BinanceExchange {
    #[instrument(skip(self))]
    async fn fetch_account_state(&self) -> ExchangeResult<AccountState> {
        let account: AccountResponse = self
            .signed_request(Method::GET, "/fapi/v2/account", &[])
            .await?;
        let orders: Vec<OpenOrderResponse> = self
            .signed_request(Method::GET, "/fapi/v1/openOrders", &[])
            .await?;

        let positions = account
            .positions
            .into_iter()
            .filter(|p| p.position_amt != Decimal::ZERO)
            .filter_map(|p| {
                let side = Self::parse_position_side(&p.position_side)?;
                let amount = p.position_amt.abs();
                Some(PositionInfo {
                    notional: amount * p.entry_price,
                    symbol: p.symbol,
                    position_side: side,
                    amount,
                    entry_price: p.entry_price,
                })
            })
            .collect();

        let open_orders = orders
            .into_iter()
            .filter_map(|o| {
                let side = match o.side.as_str() {
                    "BUY" => OrderSide::Buy,
                    "SELL" => OrderSide::Sell,
                    _ => return None,
                };
                Some(OpenOrder {
                    id: o.order_id.to_string(),
                    symbol: o.symbol,
                    price: o.price,
                    amount: o.orig_qty - o.executed_qty,
                    side,
                    position_side: Self::parse_position_side(&o.position_side)?,
                })
            })
            .collect();

        Ok(AccountState {
            total_balance: account.total_wallet_balance,
            available_balance: account.available_balance,
            positions,
            open_orders,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_market(
        &self,
        symbol: &str,
        timeframe: &str,
        lookback: u32,
    ) -> ExchangeResult<Vec<Candle>> {
        // klines come back as heterogeneous arrays
        let rows: Vec<Vec<serde_json::Value>> = self
            .public_get(
                "/fapi/v1/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.to_string()),
                    ("limit", lookback.to_string()),
                ],
            )
            .await?;

        let parse_dec = |v: &serde_json::Value| -> Option<Decimal> {
            v.as_str().and_then(|s| s.parse().ok())
        };

        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            if row.len() < 6 {
                warn!(symbol, "short kline row, skipping");
                continue;
            }
            let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
                parse_dec(&row[1]),
                parse_dec(&row[2]),
                parse_dec(&row[3]),
                parse_dec(&row[4]),
                parse_dec(&row[5]),
            ) else {
                warn!(symbol, "unparseable kline row, skipping");
                continue;
            };
            candles.push(Candle {
                open_time: row[0].as_i64().unwrap_or_default(),
                open,
                high,
                low,
                close,
                volume,
            });
        }
        Ok(candles)
    }

    #[instrument(skip(self))]
    async fn min_order_amount(&self, symbol: &str) -> ExchangeResult<Decimal> {
        let info: serde_json::Value = self
            .public_get("/fapi/v1/exchangeInfo", &[("symbol", symbol.to_string())])
            .await?;

        let min_qty = info["symbols"]
            .as_array()
            .and_then(|symbols| {
                symbols
                    .iter()
                    .find(|s| s["symbol"].as_str() == Some(symbol))
            })
            .and_then(|s| s["filters"].as_array())
            .and_then(|filters| {
                filters
                    .iter()
                    .find(|f| f["filterType"].as_str() == Some("LOT_SIZE"))
            })
            .and_then(|f| f["minQty"].as_str())
            .and_then(|q| q.parse::<Decimal>().ok());

        min_qty.ok_or_else(|| {
            ExchangeError::other(format!("no LOT_SIZE filter for {symbol}"))
        })
    }

    #[instrument(skip(self, intent), fields(symbol = %intent.symbol, action = %intent.action))]
    async fn submit_order(&self, intent: &OrderIntent) -> ExchangeResult<OrderAck> {
        // read-before-write: flag reduce-only only when the live leg covers
        // the requested amount
        let reduce_only = if intent.action.is_reducing() {
            let live = self
                .live_position_amount(&intent.symbol, intent.position_side)
                .await?;
            live >= intent.amount
        } else {
            false
        };

        // snap to the venue grid; quantity rounds down so the order never
        // exceeds the sized notional
        let price = round_to_tick(intent.price, self.tick_size).normalize();
        let amount = round_down_to_lot(intent.amount, self.lot_size).normalize();

        let mut params = vec![
            ("symbol", intent.symbol.clone()),
            ("side", intent.side.to_string()),
            ("positionSide", intent.position_side.as_str().to_string()),
            ("type", "LIMIT".to_string()),
            ("timeInForce", "GTC".to_string()),
            ("quantity", amount.to_string()),
            ("price", price.to_string()),
        ];
        if reduce_only {
            params.push(("reduceOnly", "true".to_string()));
        }

        debug!(%price, %amount, reduce_only, "submitting limit order");

        let response: NewOrderResponse = self
            .signed_request(Method::POST, "/fapi/v1/order", &params)
            .await?;

        Ok(OrderAck {
            order_id: response.order_id.to_string(),
            reduce_only,
            accepted_at: Utc::now(),
        })
    }

    #[instrument(skip(self))]
    async fn cancel_order(&self, order_id: &str, symbol: &str) -> ExchangeResult<()> {
        let _: serde_json::Value = self
            .signed_request(
                Method::DELETE,
                "/fapi/v1/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("orderId", order_id.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        let _: serde_json::Value = self
            .signed_request(
                Method::POST,
                "/fapi/v1/leverage",
                &[
                    ("symbol", symbol.to_string()),
                    ("leverage", leverage.to_string()),
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn enable_hedge_mode(&self) -> ExchangeResult<()> {
        let current: DualSideResponse = self
            .signed_request(Method::GET, "/fapi/v1/positionSide/dual", &[])
            .await?;
        if current.dual_side_position {
            return Ok(());
        }

        let result: ExchangeResult<serde_json::Value> = self
            .signed_request(
                Method::POST,
                "/fapi/v1/positionSide/dual",
                &[("dualSidePosition", "true".to_string())],
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            // -4059: no need to change position side
            Err(ExchangeError::Other(msg)) if msg.contains("-4059") => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_values_snap_to_venue_grid() {
        let exchange = BinanceExchange::new(&BinanceConfig::default()).unwrap();
        assert_eq!(exchange.tick_size, dec!(0.01));
        assert_eq!(exchange.lot_size, dec!(0.001));
        assert_eq!(
            round_to_tick(dec!(3012.4567), exchange.tick_size),
            dec!(3012.46)
        );
        // quantity always rounds down, never up past the sized amount
        assert_eq!(
            round_down_to_lot(dec!(0.0337), exchange.lot_size),
            dec!(0.033)
        );
    }

    #[test]
    fn rate_limit_codes() {
        assert!(matches!(
            classify_error(-1003, "Too many requests"),
            ExchangeError::RateLimited
        ));
        assert!(matches!(
            classify_error(-1015, "Too many new orders"),
            ExchangeError::RateLimited
        ));
    }

    #[test]
    fn margin_codes_map_to_insufficient_funds() {
        assert!(matches!(
            classify_error(-2019, "Margin is insufficient."),
            ExchangeError::InsufficientFunds(_)
        ));
    }

    #[test]
    fn filter_and_precision_codes_map_to_invalid_order() {
        for code in [-1013, -1111, -2022, -4164] {
            assert!(matches!(
                classify_error(code, "rejected"),
                ExchangeError::InvalidOrder(_)
            ));
        }
    }

    #[test]
    fn unknown_codes_truncate_into_other() {
        let msg = "y".repeat(500);
        match classify_error(-9999, &msg) {
            ExchangeError::Other(m) => assert!(m.chars().count() <= 120),
            _ => unreachable!(),
        }
    }
}
