use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

/// Authoritative quote produced by the pricing tool. All amounts carry cent
/// precision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub currency: String,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub quantity_discount: Decimal,
    pub setup_fee: Decimal,
    pub rush_surcharge: Decimal,
    pub total: Decimal,
    pub steps: Vec<PriceStep>,
}

impl Price {
    /// Every figure a response may legitimately quote back to the customer.
    pub fn quotable_amounts(&self) -> Vec<Decimal> {
        let mut amounts = vec![self.total, self.subtotal, self.unit_price, self.setup_fee];
        amounts.extend(
            [self.quantity_discount, self.rush_surcharge]
                .into_iter()
                .filter(|amount| !amount.is_zero()),
        );
        amounts
    }
}

/// Rounds a monetary amount to cents, half away from zero.
pub fn to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{to_cents, Price};

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(to_cents(Decimal::new(12_345, 3)), Decimal::new(1_235, 2));
        assert_eq!(to_cents(Decimal::new(-12_345, 3)), Decimal::new(-1_235, 2));
    }

    #[test]
    fn quotable_amounts_skip_zero_adjustments() {
        let price = Price {
            currency: "USD".to_string(),
            unit_price: Decimal::new(40, 2),
            subtotal: Decimal::new(10_000, 2),
            quantity_discount: Decimal::ZERO,
            setup_fee: Decimal::new(1_500, 2),
            rush_surcharge: Decimal::ZERO,
            total: Decimal::new(11_500, 2),
            steps: Vec::new(),
        };

        assert_eq!(price.quotable_amounts().len(), 4);
        assert!(!price.quotable_amounts().contains(&Decimal::ZERO));
    }
}
