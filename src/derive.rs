//! Prices for coins that are not listed upstream, computed from a base coin

use crate::constants::UNKNOWN_PRICE;
use crate::types::CoinPriceSnapshot;

/// Computes a derived coin's snapshot as `multiplier` times the base coin
///
/// `price_btc` always carries the multiplier verbatim. If the base prices or
/// the multiplier are not decimal numbers, or the product is infinite or NaN,
/// the USD and CNY prices are reported as `"unknown"`; this never fails.
pub fn derive_price(name: &str, base: &CoinPriceSnapshot, multiplier: &str) -> CoinPriceSnapshot {
    let mut derived = CoinPriceSnapshot::new(name, UNKNOWN_PRICE, multiplier, UNKNOWN_PRICE);

    let parsed = (
        base.price_usd.parse::<f64>(),
        base.price_cny.parse::<f64>(),
        multiplier.parse::<f64>(),
    );
    if let (Ok(usd), Ok(cny), Ok(ratio)) = parsed {
        let (usd, cny) = (usd * ratio, cny * ratio);
        if usd.is_finite() && cny.is_finite() {
            derived.price_usd = format!("{:.4}", usd);
            derived.price_cny = format!("{:.4}", cny);
        }
    }

    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitcoin(usd: &str, cny: &str) -> CoinPriceSnapshot {
        CoinPriceSnapshot::new("Bitcoin", usd, "1.0", cny)
    }

    #[test]
    fn test_multiplies_and_rounds_to_four_places() {
        let derived = derive_price("samos", &bitcoin("8000", "51000"), "0.0000315");

        assert_eq!(derived.name, "samos");
        assert_eq!(derived.price_usd, "0.2520");
        assert_eq!(derived.price_cny, "1.6065");
        assert_eq!(derived.price_btc, "0.0000315");
    }

    #[test]
    fn test_rounding_matches_fixed_point_format() {
        let derived = derive_price("yongbang", &bitcoin("6543.21", "41234.5"), "0.5");

        assert_eq!(derived.price_usd, format!("{:.4}", 6543.21_f64 * 0.5));
        assert_eq!(derived.price_cny, "20617.2500");
    }

    #[test]
    fn test_non_numeric_base_degrades_to_unknown() {
        let derived = derive_price("samos", &bitcoin("n/a", "51000"), "0.0000315");

        assert_eq!(derived.price_usd, "unknown");
        assert_eq!(derived.price_cny, "unknown");
        assert_eq!(derived.price_btc, "0.0000315");
    }

    #[test]
    fn test_empty_base_degrades_to_unknown() {
        let derived = derive_price("samos", &CoinPriceSnapshot::default(), "0.0000315");

        assert_eq!(derived.price_usd, "unknown");
        assert_eq!(derived.price_cny, "unknown");
    }

    #[test]
    fn test_bad_multiplier_is_kept_as_label() {
        let derived = derive_price("samos", &bitcoin("8000", "51000"), "a lot");

        assert_eq!(derived.price_btc, "a lot");
        assert_eq!(derived.price_usd, "unknown");
        assert_eq!(derived.price_cny, "unknown");
    }

    #[test]
    fn test_non_finite_values_degrade_to_unknown() {
        for (usd, multiplier) in [("inf", "0.0000315"), ("NaN", "0.0000315"), ("8000", "infinity")] {
            let derived = derive_price("samos", &bitcoin(usd, "51000"), multiplier);

            assert_eq!(derived.price_usd, "unknown", "{usd} x {multiplier}");
            assert_eq!(derived.price_cny, "unknown", "{usd} x {multiplier}");
        }

        let derived = derive_price("samos", &bitcoin("1e308", "51000"), "10");
        assert_eq!(derived.price_usd, "unknown");
    }

    #[test]
    fn test_same_base_gives_same_prices() {
        let base = bitcoin("8000", "51000");
        let samos = derive_price("samos", &base, "0.0000315");
        let yongbang = derive_price("yongbang", &base, "0.0000315");

        assert_eq!(samos.price_usd, yongbang.price_usd);
        assert_eq!(samos.price_cny, yongbang.price_cny);
        assert_ne!(samos.name, yongbang.name);
    }
}
