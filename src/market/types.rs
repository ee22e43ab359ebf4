use crate::error::AppError;
use chrono::TimeZone;
use serde::Deserialize;

pub const VS_CURRENCY: &str = "usd";
pub const LISTING_ORDER: &str = "market_cap_desc";
pub const LISTING_PER_PAGE: u32 = 50;
pub const QUOTE_PAIR: &str = "USDT";
// List positions past this index are flagged as fresh listings.
pub const NEW_LISTING_INDEX_THRESHOLD: usize = 45;
pub const DEFAULT_TIMEFRAME: Timeframe = Timeframe::D1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    D1,
    D7,
    D30,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::D1 => "1D",
            Self::D7 => "7D",
            Self::D30 => "30D",
        }
    }

    pub fn as_days(self) -> u32 {
        match self {
            Self::D1 => 1,
            Self::D7 => 7,
            Self::D30 => 30,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::D1 => Self::D7,
            Self::D7 => Self::D30,
            Self::D30 => Self::D1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketFeedState {
    Idle,
    Refreshing,
    Live,
    Cached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketFeedSnapshot {
    pub state: MarketFeedState,
    pub source: Option<String>,
    pub last_success_unix_ms: Option<i64>,
    pub reason: Option<String>,
}

impl MarketFeedSnapshot {
    pub fn idle() -> Self {
        Self {
            state: MarketFeedState::Idle,
            source: None,
            last_success_unix_ms: None,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketEntry {
    pub id: Option<String>,
    pub rank: u32,
    pub symbol: String,
    pub name: String,
    pub pair: String,
    pub price: f64,
    pub change: f64,
    pub volume: String,
    pub high: f64,
    pub low: f64,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub time: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketListingWire {
    pub id: Option<String>,
    pub symbol: String,
    pub name: Option<String>,
    pub current_price: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub total_volume: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketChartWire {
    pub prices: Vec<ChartPairWire>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartPairWire(pub f64, pub f64);

impl MarketEntry {
    pub fn from_wire(wire: MarketListingWire, index: usize) -> Result<Self, AppError> {
        let price = wire.current_price.ok_or_else(|| {
            AppError::UnexpectedPayload(format!("listing '{}' has no price", wire.symbol))
        })?;
        let change = wire.price_change_percentage_24h.unwrap_or(0.0);
        let volume = wire.total_volume.unwrap_or(0.0);
        let high = wire.high_24h.unwrap_or(0.0);
        let low = wire.low_24h.unwrap_or(0.0);
        if !price.is_finite()
            || !change.is_finite()
            || !volume.is_finite()
            || !high.is_finite()
            || !low.is_finite()
        {
            return Err(AppError::UnexpectedPayload(format!(
                "listing '{}' carries non-finite numbers",
                wire.symbol
            )));
        }

        let rank = match wire.market_cap_rank {
            Some(rank) if rank > 0 => rank,
            _ => index as u32 + 1,
        };

        Ok(Self {
            id: wire.id,
            rank,
            symbol: wire.symbol.to_ascii_uppercase(),
            name: wire.name.unwrap_or_default(),
            pair: QUOTE_PAIR.to_string(),
            price,
            change: round_change(change),
            volume: format_volume(volume),
            high,
            low,
            is_new: index > NEW_LISTING_INDEX_THRESHOLD,
        })
    }
}

pub fn listing_to_entries(wires: Vec<MarketListingWire>) -> Vec<MarketEntry> {
    wires
        .into_iter()
        .enumerate()
        .filter_map(|(index, wire)| MarketEntry::from_wire(wire, index).ok())
        .collect()
}

pub fn parse_listing_payload(payload: &mut [u8]) -> Result<Vec<MarketListingWire>, AppError> {
    let wires: Vec<MarketListingWire> = simd_json::serde::from_slice(payload)?;
    Ok(wires)
}

pub fn parse_market_chart_payload(payload: &mut [u8]) -> Result<MarketChartWire, AppError> {
    let wire: MarketChartWire = simd_json::serde::from_slice(payload)?;
    Ok(wire)
}

pub fn chart_points<Tz>(pairs: &[ChartPairWire], timezone: &Tz) -> Vec<PricePoint>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut points = Vec::with_capacity(pairs.len());
    for pair in pairs {
        if !pair.0.is_finite() || !pair.1.is_finite() {
            continue;
        }
        let Some(timestamp) = timezone.timestamp_millis_opt(pair.0 as i64).single() else {
            continue;
        };
        points.push(PricePoint {
            time: timestamp.format("%H:%M").to_string(),
            value: pair.1,
        });
    }
    points
}

pub fn round_change(change: f64) -> f64 {
    (change * 100.0).round() / 100.0
}

pub fn format_volume(volume: f64) -> String {
    if volume >= 1e9 {
        format!("${:.2}B", volume / 1e9)
    } else if volume >= 1e6 {
        format!("${:.2}M", volume / 1e6)
    } else if volume >= 1e3 {
        format!("${:.2}K", volume / 1e3)
    } else {
        format!("${volume:.2}")
    }
}

pub fn format_price(price: f64) -> String {
    if price < 1.0 {
        format!("{price:.5}")
    } else {
        group_thousands(price)
    }
}

fn group_thousands(value: f64) -> String {
    let formatted = format!("{value:.2}");
    let (integer_part, decimal_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(integer_part.len() + integer_part.len() / 3 + 3);
    let digit_count = integer_part.len();
    for (offset, ch) in integer_part.chars().enumerate() {
        if offset > 0 && (digit_count - offset) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push('.');
    grouped.push_str(decimal_part);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_wire(symbol: &str, price: f64) -> MarketListingWire {
        MarketListingWire {
            id: Some(symbol.to_ascii_lowercase()),
            symbol: symbol.to_string(),
            name: Some(symbol.to_string()),
            current_price: Some(price),
            price_change_percentage_24h: Some(1.234),
            total_volume: Some(2_500_000.0),
            market_cap_rank: Some(7),
            high_24h: Some(price * 1.05),
            low_24h: Some(price * 0.95),
        }
    }

    #[test]
    fn formats_volume_by_magnitude() {
        assert_eq!(format_volume(1_234_567_890.0), "$1.23B");
        assert_eq!(format_volume(2_500_000.0), "$2.50M");
        assert_eq!(format_volume(15_000.0), "$15.00K");
        assert_eq!(format_volume(42.5), "$42.50");
    }

    #[test]
    fn formats_price_with_thousands_grouping() {
        assert_eq!(format_price(92_437.6), "92,437.60");
        assert_eq!(format_price(1_735.0), "1,735.00");
        assert_eq!(format_price(143.33), "143.33");
    }

    #[test]
    fn formats_sub_unit_price_with_five_decimals() {
        assert_eq!(format_price(0.5), "0.50000");
        assert_eq!(format_price(0.123456), "0.12346");
    }

    #[test]
    fn rounds_change_to_two_decimals() {
        let entry = MarketEntry::from_wire(sample_wire("btc", 92_437.6), 0)
            .expect("wire should map to an entry");
        assert_eq!(entry.change, 1.23);
    }

    #[test]
    fn uppercases_symbol_and_sets_quote_pair() {
        let entry = MarketEntry::from_wire(sample_wire("sol", 143.33), 2)
            .expect("wire should map to an entry");
        assert_eq!(entry.symbol, "SOL");
        assert_eq!(entry.pair, QUOTE_PAIR);
    }

    #[test]
    fn rank_falls_back_to_list_position() {
        let mut wire = sample_wire("gaib", 0.0451);
        wire.market_cap_rank = None;
        let entry = MarketEntry::from_wire(wire, 7).expect("wire should map to an entry");
        assert_eq!(entry.rank, 8);

        let mut wire = sample_wire("gaib", 0.0451);
        wire.market_cap_rank = Some(0);
        let entry = MarketEntry::from_wire(wire, 7).expect("wire should map to an entry");
        assert_eq!(entry.rank, 8);
    }

    #[test]
    fn flags_new_listings_past_index_threshold() {
        let early = MarketEntry::from_wire(sample_wire("btc", 92_437.6), 45)
            .expect("wire should map to an entry");
        let late = MarketEntry::from_wire(sample_wire("gaib", 0.0451), 46)
            .expect("wire should map to an entry");
        assert!(!early.is_new);
        assert!(late.is_new);
    }

    #[test]
    fn drops_rows_without_finite_prices() {
        let mut broken = sample_wire("bad", 1.0);
        broken.current_price = Some(f64::NAN);
        let mut missing = sample_wire("none", 1.0);
        missing.current_price = None;

        let entries = listing_to_entries(vec![
            sample_wire("btc", 92_437.6),
            broken,
            missing,
            sample_wire("sol", 143.33),
        ]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].symbol, "BTC");
        assert_eq!(entries[1].symbol, "SOL");
        // Position-derived fields use the original list index.
        assert!(!entries[1].is_new);
    }

    #[test]
    fn drops_rows_with_non_finite_range_bounds() {
        let mut spiked = sample_wire("bad", 1.0);
        spiked.high_24h = Some(f64::NAN);
        let mut sunk = sample_wire("worse", 1.0);
        sunk.low_24h = Some(f64::INFINITY);

        let entries = listing_to_entries(vec![sample_wire("btc", 92_437.6), spiked, sunk]);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].symbol, "BTC");
    }

    #[test]
    fn parses_listing_payload() {
        let mut payload = br#"[
            {"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":92437.6,
             "price_change_percentage_24h":0.52,"total_volume":1234567890.0,
             "market_cap_rank":1,"high_24h":93100.0,"low_24h":91200.0},
            {"id":"solana","symbol":"sol","name":"Solana","current_price":143.33,
             "price_change_percentage_24h":-1.2,"total_volume":2500000.0,
             "market_cap_rank":null,"high_24h":150.1,"low_24h":141.0}
        ]"#
        .to_vec();

        let wires = parse_listing_payload(&mut payload).expect("listing payload should parse");
        let entries = listing_to_entries(wires);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].volume, "$1.23B");
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].change, -1.2);
    }

    #[test]
    fn rejects_non_array_listing_payload() {
        let mut payload = br#"{"error":"rate limited"}"#.to_vec();
        assert!(parse_listing_payload(&mut payload).is_err());
    }

    #[test]
    fn parses_market_chart_payload() {
        let mut payload =
            br#"{"prices":[[1735000000000,1.2],[1735003600000,1.5]],"market_caps":[]}"#.to_vec();
        let wire = parse_market_chart_payload(&mut payload).expect("chart payload should parse");
        assert_eq!(wire.prices.len(), 2);
    }

    #[test]
    fn rejects_chart_payload_without_prices() {
        let mut payload = br#"{"market_caps":[[1735000000000,1.2]]}"#.to_vec();
        assert!(parse_market_chart_payload(&mut payload).is_err());
    }

    #[test]
    fn maps_chart_pairs_to_labelled_points() {
        // 2025-01-01T10:00:00Z and 11:00:00Z.
        let pairs = vec![
            ChartPairWire(1_735_725_600_000.0, 1.2),
            ChartPairWire(1_735_729_200_000.0, 1.5),
        ];
        let points = chart_points(&pairs, &Utc);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time, "10:00");
        assert_eq!(points[0].value, 1.2);
        assert_eq!(points[1].time, "11:00");
    }

    #[test]
    fn skips_non_finite_chart_pairs() {
        let pairs = vec![
            ChartPairWire(1_735_725_600_000.0, f64::NAN),
            ChartPairWire(f64::INFINITY, 1.5),
            ChartPairWire(1_735_729_200_000.0, 2.4),
        ];
        let points = chart_points(&pairs, &Utc);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, 2.4);
    }

    #[test]
    fn timeframe_maps_to_days() {
        assert_eq!(Timeframe::D1.as_days(), 1);
        assert_eq!(Timeframe::D7.as_days(), 7);
        assert_eq!(Timeframe::D30.as_days(), 30);
        assert_eq!(Timeframe::D1.next(), Timeframe::D7);
        assert_eq!(Timeframe::D30.next(), Timeframe::D1);
    }
}
