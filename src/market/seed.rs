use crate::market::types::{MarketEntry, PricePoint};

struct SeedRow {
    id: &'static str,
    rank: u32,
    symbol: &'static str,
    name: &'static str,
    price: f64,
    change: f64,
    volume: &'static str,
    high: f64,
    low: f64,
    is_new: bool,
}

// Shipped listing shown until the first successful poll; also what the
// cached-data banner keeps on screen when every source is down.
const SEED_ROWS: &[SeedRow] = &[
    SeedRow { id: "bitcoin", rank: 1, symbol: "BTC", name: "Bitcoin", price: 92_437.6, change: 0.52, volume: "1.23B", high: 93_100.0, low: 91_200.0, is_new: false },
    SeedRow { id: "solana", rank: 2, symbol: "SOL", name: "Solana", price: 143.33, change: 2.42, volume: "244.90M", high: 145.20, low: 139.50, is_new: false },
    SeedRow { id: "ethereum", rank: 3, symbol: "ETH", name: "Ethereum", price: 3_041.71, change: -1.22, volume: "748.13M", high: 3_100.00, low: 3_020.50, is_new: false },
    SeedRow { id: "ripple", rank: 4, symbol: "XRP", name: "Ripple", price: 2.1326, change: -2.63, volume: "180.62M", high: 2.2000, low: 2.1000, is_new: false },
    SeedRow { id: "the-open-network", rank: 5, symbol: "TON", name: "Toncoin", price: 1.735, change: -2.47, volume: "9.10M", high: 1.800, low: 1.710, is_new: false },
    SeedRow { id: "spx6900", rank: 6, symbol: "SPX", name: "SPX6900", price: 0.5873, change: 10.42, volume: "10.72M", high: 0.6000, low: 0.5200, is_new: false },
    SeedRow { id: "near", rank: 7, symbol: "NEAR", name: "NEAR Protocol", price: 2.375, change: 4.81, volume: "15.06M", high: 2.450, low: 2.200, is_new: false },
    SeedRow { id: "gaib", rank: 8, symbol: "GAIB", name: "Gaib", price: 0.17493, change: 483.10, volume: "5.51M", high: 0.18000, low: 0.03000, is_new: true },
    SeedRow { id: "fetch-ai", rank: 9, symbol: "FET", name: "Fetch.ai", price: 0.3150, change: 8.88, volume: "9.67M", high: 0.3300, low: 0.2900, is_new: false },
];

const SEED_CHART: &[(&str, f64)] = &[
    ("10:00", 1.2),
    ("11:00", 1.5),
    ("12:00", 1.3),
    ("13:00", 1.8),
    ("14:00", 2.1),
    ("15:00", 1.9),
    ("16:00", 2.4),
];

pub fn seed_market_entries() -> Vec<MarketEntry> {
    SEED_ROWS
        .iter()
        .map(|row| MarketEntry {
            id: Some(row.id.to_string()),
            rank: row.rank,
            symbol: row.symbol.to_string(),
            name: row.name.to_string(),
            pair: crate::market::types::QUOTE_PAIR.to_string(),
            price: row.price,
            change: row.change,
            volume: row.volume.to_string(),
            high: row.high,
            low: row.low,
            is_new: row.is_new,
        })
        .collect()
}

pub fn seed_chart_points() -> Vec<PricePoint> {
    SEED_CHART
        .iter()
        .map(|(time, value)| PricePoint {
            time: (*time).to_string(),
            value: *value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_listing_covers_nine_assets_with_fetchable_ids() {
        let entries = seed_market_entries();
        assert_eq!(entries.len(), 9);
        assert!(entries.iter().all(|entry| entry.id.is_some()));
        assert_eq!(entries[0].symbol, "BTC");
        assert_eq!(entries[4].symbol, "TON");
        assert!(entries[7].is_new);
    }

    #[test]
    fn seed_chart_is_chronological() {
        let points = seed_chart_points();
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].time, "10:00");
        assert_eq!(points[6].value, 2.4);
    }
}
