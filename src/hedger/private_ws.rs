//! BiFu private trade-execution feed: HMAC-signed connect handshake, a
//! bounded connect-retry loop, and ping/pong keepalive. Grounded in
//! `hedger/bifu_private_ws.py`.

use hex;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, warn};

use crate::models::{FilledOrder, Side};

type HmacSha256 = Hmac<Sha256>;

const WS_PATH: &str = "/api/v1/private/ws";
/// Ten connect attempts, 50ms apart, before giving up for this cycle --
/// matches `_ws_connect`'s `for _ in range(10): ... time.sleep(0.05)`.
const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);

fn sign(api_secret: &str) -> (String, String) {
    let ts = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
    let message = format!("{WS_PATH}|{ts}");
    let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(message.as_bytes());
    (ts.to_string(), hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    msg_type: String,
    #[serde(default)]
    msg: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SpotTradeFill {
    #[serde(rename = "orderId")]
    order_id: String,
    #[serde(rename = "symbolId")]
    symbol_id: String,
    #[serde(rename = "orderSide")]
    order_side: String,
    direction: String,
    #[serde(rename = "accountId")]
    account_id: String,
    #[serde(rename = "matchAccountId")]
    match_account_id: String,
    #[serde(rename = "fillSize")]
    fill_size: String,
    #[serde(rename = "fillValue")]
    fill_value: String,
    #[serde(rename = "tradeId")]
    trade_id: String,
    #[serde(rename = "matchTime")]
    match_time: String,
}

fn parse_fills(envelope_msg: &serde_json::Value) -> Vec<FilledOrder> {
    let Some(fills) = envelope_msg
        .get("data")
        .and_then(|d| d.get("orderFillTransaction"))
        .and_then(|v| v.as_array())
    else {
        return Vec::new();
    };

    fills
        .iter()
        .filter_map(|raw| serde_json::from_value::<SpotTradeFill>(raw.clone()).ok())
        .filter(|f| f.direction == "MAKER" && f.account_id != f.match_account_id)
        .filter_map(|f| {
            let side = match f.order_side.as_str() {
                "BUY" => Side::Buy,
                "SELL" => Side::Sell,
                _ => return None,
            };
            Some(FilledOrder {
                trade_id: f.trade_id,
                qty: f.fill_size.parse().ok()?,
                amount: f.fill_value.parse().ok()?,
                symbol: f.symbol_id,
                side,
                order_id: f.order_id,
                match_time: f.match_time.parse().ok()?,
            })
        })
        .collect()
}

/// Connect (with bounded retry) and stream fills into `tx` forever,
/// reconnecting on any error. Runs until the process exits.
pub async fn run(stream_url: String, api_key: String, api_secret: String, tx: mpsc::UnboundedSender<FilledOrder>) {
    loop {
        match connect_with_retry(&stream_url, &api_key, &api_secret).await {
            Some((mut write, mut read)) => {
                debug!("bifu private ws connected");
                loop {
                    match read.next().await {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(err) = handle_message(&text, &mut write, &tx).await {
                                warn!(error = %err, "failed to handle bifu message");
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(err)) => {
                            warn!(error = %err, "bifu ws read error");
                            break;
                        }
                        _ => {}
                    }
                }
            }
            None => {
                error!("exhausted connect attempts for bifu private ws");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }
}

async fn connect_with_retry(
    stream_url: &str,
    api_key: &str,
    api_secret: &str,
) -> Option<(
    futures_util::stream::SplitSink<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>, Message>,
    futures_util::stream::SplitStream<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>>,
)> {
    let url = format!("{stream_url}{WS_PATH}");
    for attempt in 0..CONNECT_ATTEMPTS {
        let (timestamp, signature) = sign(api_secret);
        let mut request = match url.clone().into_client_request() {
            Ok(req) => req,
            Err(err) => {
                warn!(error = %err, attempt, "failed to build bifu ws request");
                sleep(CONNECT_RETRY_DELAY).await;
                continue;
            }
        };
        let headers = request.headers_mut();
        if let Ok(v) = api_key.parse() {
            headers.insert("Decode-MM-Auth-Access-Key", v);
        }
        if let Ok(v) = timestamp.parse() {
            headers.insert("Decode-MM-Auth-Timestamp", v);
        }
        if let Ok(v) = signature.parse() {
            headers.insert("Decode-MM-Auth-Signature", v);
        }

        match connect_async(request).await {
            Ok((stream, _)) => return Some(stream.split()),
            Err(err) => {
                warn!(error = %err, attempt, "bifu ws connect attempt failed, retrying");
                sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
    None
}

async fn handle_message(
    text: &str,
    write: &mut futures_util::stream::SplitSink<tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>, Message>,
    tx: &mpsc::UnboundedSender<FilledOrder>,
) -> anyhow::Result<()> {
    let envelope: Envelope = serde_json::from_str(text)?;
    match envelope.msg_type.as_str() {
        "spot-trade-event" => {
            if let Some(msg) = envelope.msg {
                for fill in parse_fills(&msg) {
                    let _ = tx.send(fill);
                }
            }
        }
        "ping" => {
            let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
            let pong = serde_json::json!({"type": "pong", "time": now.to_string()}).to_string();
            write.send(Message::Text(pong)).await?;
        }
        _ => debug!(message = %text, "unhandled bifu message"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_maker_fill_from_own_counterparty() {
        let msg = serde_json::json!({
            "data": {
                "orderFillTransaction": [{
                    "orderId": "123456", "symbolId": "BTC-USDT", "orderSide": "BUY",
                    "direction": "MAKER", "accountId": "acc-1", "matchAccountId": "acc-2",
                    "fillSize": "0.01", "fillValue": "1000", "tradeId": "t-1", "matchTime": "1700000000000"
                }]
            }
        });
        let fills = parse_fills(&msg);
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].trade_id, "t-1");
    }

    #[test]
    fn ignores_fills_against_own_account() {
        let msg = serde_json::json!({
            "data": {
                "orderFillTransaction": [{
                    "orderId": "1", "symbolId": "BTC-USDT", "orderSide": "BUY",
                    "direction": "MAKER", "accountId": "acc-1", "matchAccountId": "acc-1",
                    "fillSize": "0.01", "fillValue": "1000", "tradeId": "t-1", "matchTime": "1700000000000"
                }]
            }
        });
        assert!(parse_fills(&msg).is_empty());
    }

    #[test]
    fn signature_changes_message_but_is_hex() {
        let (_, sig) = sign("secret");
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
