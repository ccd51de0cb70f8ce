pub mod withdraw_fees;

pub use withdraw_fees::{
    select_all, select_best_network, select_one, AssetView, NetworkPolicy, NetworkView,
};
