use std::str::FromStr;

use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::records::{AssetRecord, NetworkRecord, RawDataset};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCoin {
    coin: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    network_list: Vec<RawNetwork>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNetwork {
    network: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    withdraw_fee: Value,
    #[serde(default)]
    withdraw_min: Value,
    #[serde(default)]
    deposit_enable: Value,
    #[serde(default)]
    withdraw_enable: Value,
}

/// Decode the `capital/config/getall` body into normalized asset records.
///
/// Networks whose fee or minimum cannot be read as a decimal are dropped with a
/// warning rather than failing the whole dataset.
pub fn decode_dataset(body: &str) -> Result<RawDataset, UpstreamError> {
    let coins: Vec<RawCoin> =
        serde_json::from_str(body).map_err(|err| UpstreamError::Decode(err.to_string()))?;

    Ok(coins.into_iter().map(normalize_coin).collect())
}

fn normalize_coin(raw: RawCoin) -> AssetRecord {
    let networks = raw
        .network_list
        .into_iter()
        .filter_map(|network| normalize_network(&raw.coin, network))
        .collect();

    AssetRecord {
        coin: raw.coin,
        name: raw.name,
        networks,
    }
}

fn normalize_network(coin: &str, raw: RawNetwork) -> Option<NetworkRecord> {
    let Some(withdraw_fee) = value_to_decimal(&raw.withdraw_fee) else {
        warn!(
            "Dropping {coin}/{}: unreadable withdrawFee {}",
            raw.network, raw.withdraw_fee
        );
        return None;
    };
    let Some(withdraw_min) = value_to_decimal(&raw.withdraw_min) else {
        warn!(
            "Dropping {coin}/{}: unreadable withdrawMin {}",
            raw.network, raw.withdraw_min
        );
        return None;
    };

    Some(NetworkRecord {
        network: raw.network,
        name: raw.name.filter(|name| !name.trim().is_empty()),
        withdraw_fee,
        withdraw_min,
        deposit_enabled: value_to_bool(&raw.deposit_enable),
        withdraw_enabled: value_to_bool(&raw.withdraw_enable),
    })
}

/// Amounts arrive as strings on the live API but numbers are accepted as well.
pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Enable flags are booleans on the live API; some payloads carry `"true"`/`"false"`.
pub fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn decodes_exchange_payload() {
        let body = r#"[
            {
                "coin": "USDT",
                "name": "TetherUS",
                "free": "0",
                "networkList": [
                    {
                        "network": "TRX",
                        "name": "Tron (TRC20)",
                        "withdrawFee": "1",
                        "withdrawMin": "10",
                        "depositEnable": true,
                        "withdrawEnable": true
                    },
                    {
                        "network": "BSC",
                        "name": "BNB Smart Chain (BEP20)",
                        "withdrawFee": 0.29,
                        "withdrawMin": "10",
                        "depositEnable": "true",
                        "withdrawEnable": "false"
                    }
                ]
            }
        ]"#;

        let dataset = decode_dataset(body).unwrap();

        assert_eq!(dataset.len(), 1);
        let usdt = &dataset[0];
        assert_eq!(usdt.coin, "USDT");
        assert_eq!(usdt.name, "TetherUS");
        assert_eq!(usdt.networks.len(), 2);
        assert_eq!(usdt.networks[0].withdraw_fee, dec("1"));
        assert_eq!(usdt.networks[1].withdraw_fee, dec("0.29"));
        assert!(usdt.networks[1].deposit_enabled);
        assert!(!usdt.networks[1].withdraw_enabled);
    }

    #[test]
    fn drops_networks_with_unreadable_amounts() {
        let body = r#"[
            {"coin": "ETH", "name": "Ethereum", "networkList": [
                {"network": "ETH", "withdrawFee": "n/a", "withdrawMin": "0.01", "withdrawEnable": true},
                {"network": "ARBITRUM", "withdrawFee": "0.0001", "withdrawMin": "0.002", "withdrawEnable": true}
            ]}
        ]"#;

        let dataset = decode_dataset(body).unwrap();

        assert_eq!(dataset[0].networks.len(), 1);
        assert_eq!(dataset[0].networks[0].network, "ARBITRUM");
    }

    #[test]
    fn rejects_non_array_payload() {
        let err = decode_dataset(r#"{"code": -2015, "msg": "Invalid API-key"}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[test]
    fn normalizes_enable_flags() {
        assert!(value_to_bool(&Value::Bool(true)));
        assert!(value_to_bool(&Value::String("TRUE".into())));
        assert!(!value_to_bool(&Value::String("false".into())));
        assert!(!value_to_bool(&Value::Null));
    }

    #[test]
    fn parses_scientific_amounts() {
        assert_eq!(parse_decimal("1e-4"), Some(dec("0.0001")));
        assert_eq!(parse_decimal(" 2.5 "), Some(dec("2.5")));
        assert_eq!(parse_decimal("abc"), None);
    }
}
