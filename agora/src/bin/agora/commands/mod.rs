pub mod catalog;
pub mod friends;
pub mod profile;
pub mod seed;

/// `$12.50`-style price label.
pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

pub fn format_price_range(range: Option<(f64, f64)>) -> String {
    match range {
        None => "-".to_string(),
        Some((low, high)) if low == high => format_price(low),
        Some((low, high)) => format!("{} - {}", format_price(low), format_price(high)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_ranges_collapse_when_equal() {
        assert_eq!(format_price_range(Some((15.0, 15.0))), "$15.00");
        assert_eq!(format_price_range(Some((15.0, 40.5))), "$15.00 - $40.50");
        assert_eq!(format_price_range(None), "-");
    }
}
