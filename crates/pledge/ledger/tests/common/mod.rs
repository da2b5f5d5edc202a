#![allow(dead_code)]

use std::sync::Arc;

use pledge_ledger::{
    Address, Amount, FungibleToken, HandleId, InMemoryLedgerStore, InMemoryToken, LedgerSettings,
    ManualClock, PledgeLedger, Timestamp, ONE_UNIT,
};

/// Fixed starting time for every harness.
pub const START: u64 = 1_750_000_000;
pub const HOUR: u64 = 3_600;
pub const DAY: u64 = 86_400;

pub struct Harness {
    pub ledger: Arc<PledgeLedger>,
    pub token: Arc<InMemoryToken>,
    pub clock: Arc<ManualClock>,
    pub settings: LedgerSettings,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(LedgerSettings::default())
    }

    pub fn with_settings(settings: LedgerSettings) -> Self {
        let token = Arc::new(InMemoryToken::new(settings.token));
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(START)));
        let ledger = PledgeLedger::new(
            settings.clone(),
            InMemoryLedgerStore::new(),
            token.clone(),
            clock.clone(),
        )
        .expect("ledger");
        Self {
            ledger: Arc::new(ledger),
            token,
            clock,
            settings,
        }
    }

    pub fn admin(&self) -> Address {
        self.settings.admin
    }

    pub fn now(&self) -> Timestamp {
        self.ledger.now()
    }

    pub fn advance(&self, secs: u64) -> Timestamp {
        self.clock.advance(secs)
    }

    /// Mint `amount` to `who` and approve custody for all of it.
    pub fn fund(&self, who: &Address, amount: Amount) {
        self.token.mint(who, amount).expect("mint");
        let allowance = self
            .token
            .allowance(who, &self.settings.custody)
            .expect("allowance");
        self.token
            .approve(who, &self.settings.custody, allowance + amount)
            .expect("approve");
    }

    /// Funded (100 units) and registered a year ago.
    pub fn user(&self, label: &str) -> Address {
        let who = Address::derive(label);
        self.fund(&who, 100 * ONE_UNIT);
        self.ledger
            .register_identity(&who, self.now().minus_secs(365 * DAY))
            .expect("register");
        who
    }

    pub fn balance(&self, who: &Address) -> Amount {
        self.token.balance_of(who).expect("balance")
    }

    pub fn custody_balance(&self) -> Amount {
        self.balance(&self.settings.custody)
    }

    pub fn treasury_balance(&self) -> Amount {
        self.balance(&self.settings.treasury)
    }

    /// Restricted period `[now - 1h, now + 24h]`.
    pub fn open_restricted_period(&self) {
        let now = self.now();
        self.ledger
            .define_period(&self.admin(), now.minus_secs(HOUR), now.plus_secs(DAY), true)
            .expect("define period");
    }

    pub fn commit(&self, who: &Address, amount: Amount) -> pledge_ledger::LedgerResult<pledge_ledger::Commitment> {
        self.ledger
            .create_commitment(who, "text", HandleId::from_handle("handle"), amount)
    }
}
