/// Input current left over for the remaining consumers in one arbitration
/// pass. Never negative: every deduction saturates at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerBudget {
    available_ma: u16,
}

impl PowerBudget {
    pub const fn new(available_ma: u16) -> Self {
        PowerBudget { available_ma }
    }

    pub const fn available_ma(&self) -> u16 {
        self.available_ma
    }

    pub fn deduct(&mut self, amount_ma: u16) {
        self.available_ma = self.available_ma.saturating_sub(amount_ma);
    }

    /// Deducts `amount_ma` only when at least `required_ma` is available.
    pub fn try_reserve(&mut self, required_ma: u16, amount_ma: u16) -> bool {
        if self.available_ma >= required_ma {
            self.deduct(amount_ma);
            true
        } else {
            false
        }
    }
}
