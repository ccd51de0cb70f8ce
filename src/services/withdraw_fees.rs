use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::LookupError;
use crate::records::{AssetRecord, NetworkRecord};

/// Which networks callers may see and how they are labelled.
///
/// Network ids are compared case-insensitively. An empty allow-list lets every
/// network through.
#[derive(Debug, Clone, Default)]
pub struct NetworkPolicy {
    allowed: HashSet<String>,
    display_names: HashMap<String, String>,
}

impl NetworkPolicy {
    pub fn new<I, S>(allowed: I, display_names: HashMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: normalize_ids(allowed),
            display_names: display_names
                .into_iter()
                .map(|(network, label)| (network.trim().to_uppercase(), label))
                .collect(),
        }
    }

    pub fn allows(&self, network: &str) -> bool {
        allowed_by(&self.allowed, network)
    }

    /// Configured label, else the exchange's own network name, else the id.
    pub fn display_name(&self, record: &NetworkRecord) -> String {
        self.display_names
            .get(&record.network.to_uppercase())
            .or(record.name.as_ref())
            .cloned()
            .unwrap_or_else(|| record.network.clone())
    }

    pub fn allowed_networks(&self) -> Vec<String> {
        let mut networks: Vec<String> = self.allowed.iter().cloned().collect();
        networks.sort();
        networks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkView {
    pub network: String,
    pub display_name: String,
    pub withdraw_fee: Decimal,
    pub withdraw_min: Decimal,
    pub deposit_enabled: bool,
    pub withdraw_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetView {
    pub coin: String,
    pub name: String,
    pub networks: Vec<NetworkView>,
    /// Set when the asset exists but the allow-list removed every network.
    pub no_eligible_networks: bool,
}

/// Shape a single asset, matched case-insensitively, with networks ordered by fee.
pub fn select_one(
    raw: &[AssetRecord],
    symbol: &str,
    policy: &NetworkPolicy,
) -> Result<AssetView, LookupError> {
    find_asset(raw, symbol).map(|asset| shape_asset(asset, policy))
}

/// Shape every asset, keeping upstream order.
pub fn select_all(raw: &[AssetRecord], policy: &NetworkPolicy) -> Vec<AssetView> {
    raw.iter().map(|asset| shape_asset(asset, policy)).collect()
}

/// Cheapest withdrawal-enabled network able to move `amount` of `symbol`.
///
/// `networks` narrows the choice to a caller-supplied allow-list; the policy's
/// list applies when it is empty. `Ok(None)` means the asset exists but no
/// network qualifies.
pub fn select_best_network(
    raw: &[AssetRecord],
    symbol: &str,
    amount: Decimal,
    networks: &[String],
    policy: &NetworkPolicy,
) -> Result<Option<NetworkView>, LookupError> {
    let asset = find_asset(raw, symbol)?;
    let requested = normalize_ids(networks);

    let best = asset
        .networks
        .iter()
        .filter(|network| {
            if requested.is_empty() {
                policy.allows(&network.network)
            } else {
                allowed_by(&requested, &network.network)
            }
        })
        .filter(|network| network.withdraw_enabled && network.withdraw_min <= amount)
        .min_by_key(|network| network.withdraw_fee)
        .map(|network| to_view(network, policy));

    Ok(best)
}

fn find_asset<'a>(raw: &'a [AssetRecord], symbol: &str) -> Result<&'a AssetRecord, LookupError> {
    let symbol = symbol.trim();
    raw.iter()
        .find(|asset| asset.coin.eq_ignore_ascii_case(symbol))
        .ok_or_else(|| LookupError::AssetNotFound(symbol.to_uppercase()))
}

fn shape_asset(asset: &AssetRecord, policy: &NetworkPolicy) -> AssetView {
    let mut networks: Vec<NetworkView> = asset
        .networks
        .iter()
        .filter(|network| policy.allows(&network.network))
        .map(|network| to_view(network, policy))
        .collect();
    networks.sort_by_key(|network| network.withdraw_fee);

    AssetView {
        coin: asset.coin.clone(),
        name: asset.name.clone(),
        no_eligible_networks: networks.is_empty(),
        networks,
    }
}

fn to_view(network: &NetworkRecord, policy: &NetworkPolicy) -> NetworkView {
    NetworkView {
        network: network.network.clone(),
        display_name: policy.display_name(network),
        withdraw_fee: network.withdraw_fee,
        withdraw_min: network.withdraw_min,
        deposit_enabled: network.deposit_enabled,
        withdraw_enabled: network.withdraw_enabled,
    }
}

fn normalize_ids<I, S>(ids: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_uppercase())
        .filter(|id| !id.is_empty())
        .collect()
}

fn allowed_by(allowed: &HashSet<String>, network: &str) -> bool {
    allowed.is_empty() || allowed.contains(&network.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dec, network, sample_dataset};

    fn policy() -> NetworkPolicy {
        NetworkPolicy::new(
            ["BTC", "BSC", "TRX", "ETH", "SOL", "LIGHTNING"],
            HashMap::from([
                ("bsc".to_string(), "BEP20 (BSC)".to_string()),
                ("TRX".to_string(), "TRC20".to_string()),
            ]),
        )
    }

    fn fees(view: &AssetView) -> Vec<Decimal> {
        view.networks.iter().map(|n| n.withdraw_fee).collect()
    }

    #[test]
    fn orders_networks_by_numeric_fee() {
        let raw = vec![AssetRecord {
            coin: "USDT".to_string(),
            name: "TetherUS".to_string(),
            networks: vec![
                network("BSC", "0.5", "10", true),
                network("TRX", "0.1", "10", true),
                network("ETH", "2", "10", true),
            ],
        }];

        let view = select_one(&raw, "USDT", &policy()).unwrap();

        assert_eq!(fees(&view), vec![dec("0.1"), dec("0.5"), dec("2")]);
    }

    #[test]
    fn numeric_ordering_is_not_lexical() {
        let raw = vec![AssetRecord {
            coin: "ETH".to_string(),
            name: "Ethereum".to_string(),
            networks: vec![
                network("ETH", "10", "0.01", true),
                network("BSC", "9", "0.01", true),
            ],
        }];

        let view = select_one(&raw, "eth", &policy()).unwrap();

        assert_eq!(view.networks[0].network, "BSC");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let raw = sample_dataset();

        let lower = select_one(&raw, "usdt", &policy()).unwrap();
        let upper = select_one(&raw, "USDT", &policy()).unwrap();
        let padded = select_one(&raw, " Usdt ", &policy()).unwrap();

        assert_eq!(lower, upper);
        assert_eq!(lower, padded);
    }

    #[test]
    fn unknown_symbol_is_not_found() {
        let err = select_one(&sample_dataset(), "doge", &policy()).unwrap_err();
        assert_eq!(err, LookupError::AssetNotFound("DOGE".to_string()));
    }

    #[test]
    fn disallowed_networks_never_appear() {
        let raw = sample_dataset();

        let one = select_one(&raw, "USDT", &policy()).unwrap();
        assert!(one.networks.iter().all(|n| n.network != "OPBNB"));

        for asset in select_all(&raw, &policy()) {
            assert!(asset.networks.iter().all(|n| n.network != "OPBNB"));
        }
    }

    #[test]
    fn substitutes_display_names() {
        let view = select_one(&sample_dataset(), "USDT", &policy()).unwrap();
        let label = |id: &str| {
            view.networks
                .iter()
                .find(|n| n.network == id)
                .map(|n| n.display_name.clone())
                .unwrap()
        };

        assert_eq!(label("BSC"), "BEP20 (BSC)");
        assert_eq!(label("TRX"), "TRC20");
        assert_eq!(label("ETH"), "ETH");
    }

    #[test]
    fn falls_back_to_exchange_network_name() {
        let mut eth = network("ETH", "2", "20", true);
        eth.name = Some("Ethereum (ERC20)".to_string());
        let mut trx = network("TRX", "0.1", "100", true);
        trx.name = Some("Tron".to_string());
        let raw = vec![AssetRecord {
            coin: "USDT".to_string(),
            name: "TetherUS".to_string(),
            networks: vec![eth, trx, network("BSC", "0.5", "10", true)],
        }];

        let view = select_one(&raw, "USDT", &policy()).unwrap();
        let labels: Vec<&str> = view.networks.iter().map(|n| n.display_name.as_str()).collect();

        assert_eq!(labels, vec!["TRC20", "BEP20 (BSC)", "Ethereum (ERC20)"]);
    }

    #[test]
    fn fully_filtered_asset_is_marked_not_missing() {
        let view = select_one(&sample_dataset(), "XDOGE", &policy()).unwrap();

        assert!(view.networks.is_empty());
        assert!(view.no_eligible_networks);
    }

    #[test]
    fn select_all_preserves_upstream_order() {
        let coins: Vec<String> = select_all(&sample_dataset(), &policy())
            .into_iter()
            .map(|asset| asset.coin)
            .collect();

        assert_eq!(coins, vec!["BTC", "USDT", "XDOGE"]);
    }

    #[test]
    fn empty_policy_allows_everything() {
        let open = NetworkPolicy::default();
        let view = select_one(&sample_dataset(), "USDT", &open).unwrap();

        assert_eq!(view.networks.len(), 5);
        assert_eq!(view.networks[0].network, "OPBNB");
    }

    #[test]
    fn best_network_respects_minimum_amount() {
        let raw = sample_dataset();

        let best = select_best_network(&raw, "USDT", dec("50"), &[], &policy())
            .unwrap()
            .unwrap();

        // TRX is cheaper but needs 100; SOL is cheaper still but withdrawals are off.
        assert_eq!(best.network, "BSC");
        assert!(best.withdraw_min <= dec("50"));
    }

    #[test]
    fn best_network_uses_caller_allow_list() {
        let raw = sample_dataset();
        let requested = vec!["eth".to_string(), "trx".to_string()];

        let best = select_best_network(&raw, "usdt", dec("500"), &requested, &policy())
            .unwrap()
            .unwrap();

        assert_eq!(best.network, "TRX");
        assert_eq!(best.display_name, "TRC20");
    }

    #[test]
    fn best_network_is_empty_when_nothing_qualifies() {
        let raw = sample_dataset();

        let best = select_best_network(&raw, "USDT", dec("5"), &[], &policy()).unwrap();

        assert_eq!(best, None);
    }

    #[test]
    fn best_network_for_unknown_asset_is_not_found() {
        let err = select_best_network(&sample_dataset(), "NOPE", dec("1"), &[], &policy())
            .unwrap_err();

        assert!(matches!(err, LookupError::AssetNotFound(_)));
    }
}
