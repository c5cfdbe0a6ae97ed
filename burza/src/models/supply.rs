use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Treasury state for one issuance year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyInfo {
    pub year: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_eur: Decimal,
    pub treasury_available: u32,
    pub total_minted: u32,
    pub total_sold: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_supply_decodes_numeric_price() {
        let supply: SupplyInfo = serde_json::from_value(serde_json::json!({
            "year": 2026,
            "priceEur": 12.5,
            "treasuryAvailable": 80,
            "totalMinted": 100,
            "totalSold": 20
        }))
        .unwrap();

        assert_eq!(supply.price_eur, Decimal::from_str("12.5").unwrap());
        assert_eq!(supply.treasury_available, 80);
    }

    #[test]
    fn test_supply_decodes_integer_price() {
        let supply: SupplyInfo = serde_json::from_value(serde_json::json!({
            "year": 2026,
            "priceEur": 450,
            "treasuryAvailable": 0,
            "totalMinted": 10,
            "totalSold": 10
        }))
        .unwrap();
        assert_eq!(supply.price_eur, Decimal::from(450));
    }
}
