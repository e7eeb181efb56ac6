use crate::roles::{Role, RoleContext};
use crate::types::Money;
#[cfg(feature = "instrument")]
use crate::types::KeyToU64;

/// Fixed income paid into the owner's wallet every tick.
///
/// Add it before a `Consumer` on the same person so the income is spendable
/// in the tick it arrives.
#[derive(Debug, Clone, Copy)]
pub struct Stipend {
    pub amount: Money,
}

impl Stipend {
    pub fn new(amount: Money) -> Self {
        assert!(amount >= 0.0, "stipend must be non-negative, got {amount}");
        Self { amount }
    }
}

impl Role for Stipend {
    fn name(&self) -> &'static str {
        "stipend"
    }

    fn perform_role(&mut self, ctx: &mut RoleContext<'_>) {
        ctx.wallet.money_changed(self.amount);

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "deposit",
            tick = ctx.tick,
            person_id = ctx.person.to_u64(),
            source = "stipend",
            amount = self.amount,
            wallet_after = ctx.wallet.balance(),
        );
    }
}
