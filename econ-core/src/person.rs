use crate::market::Market;
use crate::roles::{Role, RoleContext};
use crate::types::{MONEY_EPSILON, Money, PersonId};

// === WALLET ===

/// A non-negative money balance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wallet {
    balance: Money,
}

impl Wallet {
    pub fn new(balance: Money) -> Self {
        let mut wallet = Self::default();
        wallet.money_changed(balance);
        wallet
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn can_afford(&self, amount: Money) -> bool {
        self.balance >= amount
    }

    /// Apply a deposit (positive) or debit (negative).
    ///
    /// Panics if the balance would go negative: callers check affordability
    /// first, so reaching that state is a bug.
    pub fn money_changed(&mut self, delta: Money) {
        let balance = self.balance + delta;
        assert!(
            balance >= -MONEY_EPSILON,
            "wallet went negative: {:.6} + {:.6} = {:.6}",
            self.balance,
            delta,
            balance
        );
        self.balance = balance.max(0.0);
    }
}

// === PERSON ===

/// An agent with a wallet and an ordered list of roles.
///
/// Roles never run on their own; a driver calls `perform_roles` once per tick.
#[derive(Debug)]
pub struct Person {
    pub id: PersonId,
    wallet: Wallet,
    roles: Vec<Box<dyn Role>>,
}

impl Person {
    pub fn new(id: PersonId, initial_money: Money) -> Self {
        Self {
            id,
            wallet: Wallet::new(initial_money),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Role + 'static) -> Self {
        self.add_role(role);
        self
    }

    pub fn add_role(&mut self, role: impl Role + 'static) {
        self.roles.push(Box::new(role));
    }

    pub fn money_changed(&mut self, delta: Money) {
        self.wallet.money_changed(delta);
    }

    pub fn money_in_wallet(&self) -> Money {
        self.wallet.balance()
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn roles(&self) -> impl Iterator<Item = &dyn Role> {
        self.roles.iter().map(|r| r.as_ref())
    }

    /// Run every role once, in the order they were added.
    pub fn perform_roles(&mut self, tick: u64, market: &mut Market) {
        let mut ctx = RoleContext {
            tick,
            person: self.id,
            wallet: &mut self.wallet,
            market,
        };
        for role in &mut self.roles {
            role.perform_role(&mut ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_changed_adds_delta() {
        let mut person = Person::new(PersonId::default(), 0.0);
        person.money_changed(12.5);
        person.money_changed(-2.25);
        assert!((person.money_in_wallet() - 10.25).abs() < 1e-12);
    }

    #[test]
    fn can_afford_is_inclusive() {
        let wallet = Wallet::new(10.0);
        assert!(wallet.can_afford(10.0));
        assert!(!wallet.can_afford(10.000_001));
    }

    #[test]
    #[should_panic(expected = "wallet went negative")]
    fn overdraft_is_a_bug() {
        let mut wallet = Wallet::new(1.0);
        wallet.money_changed(-2.0);
    }
}
