use rust_decimal::{Decimal, RoundingStrategy};

/// `12.5` → `12,50 €`.
pub fn eur(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2} €", rounded).replace('.', ",")
}

/// `90` → `1 h 30 min`.
pub fn minutes(total: u32) -> String {
    match (total / 60, total % 60) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}
