use std::{collections::HashMap, fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Context, Result};

pub const DEFAULT_NETWORKS_FILE: &str = "assets/configs/networks.json";

/// Static business tables: which networks are exposed and how they are labelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTables {
    #[serde(default)]
    pub allowed_networks: Vec<String>,
    #[serde(default)]
    pub display_names: HashMap<String, String>,
}

impl NetworkTables {
    pub fn builtin() -> Self {
        let allowed_networks = [
            "BTC", "ETH", "BSC", "TRX", "SOL", "MATIC", "ARBITRUM", "OPTIMISM", "BASE", "AVAXC",
            "TON", "LTC", "XRP", "DOGE",
        ]
        .iter()
        .map(|network| network.to_string())
        .collect();

        let display_names = HashMap::from([
            ("BTC".to_string(), "Bitcoin".to_string()),
            ("ETH".to_string(), "Ethereum (ERC20)".to_string()),
            ("BSC".to_string(), "BNB Smart Chain (BEP20)".to_string()),
            ("TRX".to_string(), "Tron (TRC20)".to_string()),
            ("SOL".to_string(), "Solana".to_string()),
            ("MATIC".to_string(), "Polygon POS".to_string()),
            ("ARBITRUM".to_string(), "Arbitrum One".to_string()),
            ("OPTIMISM".to_string(), "Optimism".to_string()),
            ("BASE".to_string(), "Base".to_string()),
            ("AVAXC".to_string(), "AVAX C-Chain".to_string()),
            ("TON".to_string(), "The Open Network".to_string()),
        ]);

        Self {
            allowed_networks,
            display_names,
        }
    }
}

/// Load the network tables from `path`, falling back to the builtin tables when
/// the file does not exist. A file that exists but cannot be parsed is an error.
pub fn load_network_tables(path: &Path) -> Result<NetworkTables> {
    if !path.exists() {
        info!(
            "Network table {} not found, using builtin tables",
            path.display()
        );
        return Ok(NetworkTables::builtin());
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read network tables at {}", path.display()))?;
    let tables: NetworkTables = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse network tables at {}", path.display()))?;

    info!(
        "Loaded {} allowed networks from {}",
        tables.allowed_networks.len(),
        path.display()
    );
    Ok(tables)
}
