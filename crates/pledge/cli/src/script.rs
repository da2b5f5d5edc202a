//! Operation scripts replayed against an in-memory ledger.
//!
//! A script is a JSON array of steps, each tagged with `op`. Accounts are
//! referenced by role, configured name or `0x` address (see
//! [`CliConfig::resolve`]). Admin steps run as the configured administrator
//! unless `caller` names someone else. Period bounds are offsets in seconds
//! from the ledger clock at the time the step runs.

use std::sync::Arc;

use pledge_ledger::{
    Address, Amount, AuditRecord, Commitment, CommitmentStatus, Controls, ErrorCategory,
    FungibleToken, GlobalConfig, HandleId, InMemoryLedgerStore, InMemoryToken, LedgerError,
    LedgerResult, ManualClock, Period, PeriodIndex, PledgeLedger, QueryWindow, Solvency,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// One scripted ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Register {
        account: String,
        /// How long ago the identity was created
        #[serde(default)]
        age_secs: u64,
    },
    Advance {
        secs: u64,
    },
    DefinePeriod {
        start_offset: i64,
        end_offset: i64,
        #[serde(default)]
        restricted: bool,
        #[serde(default)]
        caller: Option<String>,
    },
    AdjustPeriod {
        start_offset: i64,
        end_offset: i64,
        #[serde(default)]
        caller: Option<String>,
    },
    Create {
        account: String,
        amount: Amount,
        text: String,
        /// Social handle; `0x` hex is taken as a raw identifier
        #[serde(default)]
        handle: Option<String>,
    },
    Revoke {
        account: String,
    },
    Pause {
        #[serde(default)]
        reason: String,
        #[serde(default)]
        caller: Option<String>,
    },
    Unpause {
        #[serde(default)]
        reason: String,
        #[serde(default)]
        caller: Option<String>,
    },
    SetControls {
        restricted_mode: bool,
        #[serde(default)]
        require_handle: bool,
        min_amount: Amount,
        max_amount: Amount,
        #[serde(default)]
        caller: Option<String>,
    },
    RotateTreasury {
        treasury: String,
        #[serde(default)]
        caller: Option<String>,
    },
    SetBaseFee {
        fee: Amount,
        #[serde(default)]
        caller: Option<String>,
    },
    TransferAdmin {
        new_admin: String,
        #[serde(default)]
        caller: Option<String>,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Register { .. } => "register",
            Step::Advance { .. } => "advance",
            Step::DefinePeriod { .. } => "define_period",
            Step::AdjustPeriod { .. } => "adjust_period",
            Step::Create { .. } => "create",
            Step::Revoke { .. } => "revoke",
            Step::Pause { .. } => "pause",
            Step::Unpause { .. } => "unpause",
            Step::SetControls { .. } => "set_controls",
            Step::RotateTreasury { .. } => "rotate_treasury",
            Step::SetBaseFee { .. } => "set_base_fee",
            Step::TransferAdmin { .. } => "transfer_admin",
        }
    }
}

pub fn parse_script(contents: &str) -> CliResult<Vec<Step>> {
    Ok(serde_json::from_str(contents)?)
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub result: StepResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Ok { detail: Value },
    Failed { category: ErrorCategory, error: String },
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, StepResult::Ok { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub name: String,
    pub address: Address,
    pub balance: Amount,
    pub registered: bool,
    pub status: CommitmentStatus,
    pub commitments: Vec<Commitment>,
}

/// Ledger state after a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub now: Timestamp,
    pub steps: Vec<StepOutcome>,
    pub config: GlobalConfig,
    pub solvency: Solvency,
    pub treasury_balance: Amount,
    pub current_period: Option<PeriodIndex>,
    pub periods: Vec<Period>,
    pub accounts: Vec<AccountReport>,
    /// Newest first
    pub audit: Vec<AuditRecord>,
    pub audit_chain_length: usize,
}

/// In-memory ledger, token and clock built from a [`CliConfig`].
pub struct ScriptRunner {
    config: CliConfig,
    ledger: PledgeLedger,
    token: Arc<InMemoryToken>,
    clock: Arc<ManualClock>,
}

impl ScriptRunner {
    pub fn new(config: CliConfig) -> CliResult<Self> {
        let token = Arc::new(InMemoryToken::new(config.ledger.token));
        for account in &config.accounts {
            let address = account.address();
            token
                .mint(&address, account.balance)
                .map_err(LedgerError::from)?;
            token
                .approve(&address, &config.ledger.custody, account.allowance())
                .map_err(LedgerError::from)?;
            debug!(name = %account.name, address = %address, balance = account.balance, "Funded account");
        }

        let clock = Arc::new(ManualClock::new(config.start_timestamp()));
        let ledger = PledgeLedger::new(
            config.ledger.clone(),
            InMemoryLedgerStore::new(),
            token.clone(),
            clock.clone(),
        )?;
        info!(accounts = config.accounts.len(), start = %ledger.now(), "Script ledger ready");

        Ok(Self {
            config,
            ledger,
            token,
            clock,
        })
    }

    pub fn ledger(&self) -> &PledgeLedger {
        &self.ledger
    }

    /// Run `steps` in order. Ledger rejections are recorded and, unless
    /// `stop_on_error` is set, the run continues; unresolvable input aborts.
    pub fn run(&self, steps: &[Step], stop_on_error: bool) -> CliResult<Vec<StepOutcome>> {
        let mut outcomes = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let result = match self.apply(step)? {
                Ok(detail) => {
                    info!(index, op = step.name(), "Step applied");
                    StepResult::Ok { detail }
                }
                Err(err) => {
                    warn!(index, op = step.name(), error = %err, "Step rejected");
                    StepResult::Failed {
                        category: err.category(),
                        error: err.to_string(),
                    }
                }
            };
            let failed = !result.is_ok();
            outcomes.push(StepOutcome {
                index,
                op: step.name(),
                result,
            });
            if failed && stop_on_error {
                break;
            }
        }
        Ok(outcomes)
    }

    fn apply(&self, step: &Step) -> CliResult<LedgerResult<Value>> {
        let ledger = &self.ledger;
        match step {
            Step::Register { account, age_secs } => {
                let who = self.config.resolve(account)?;
                detail(ledger.register_identity(&who, ledger.now().minus_secs(*age_secs)))
            }
            Step::Advance { secs } => detail(Ok(self.clock.advance(*secs))),
            Step::DefinePeriod {
                start_offset,
                end_offset,
                restricted,
                caller,
            } => {
                let caller = self.caller(caller)?;
                let now = ledger.now();
                detail(ledger.define_period(
                    &caller,
                    offset(now, *start_offset),
                    offset(now, *end_offset),
                    *restricted,
                ))
            }
            Step::AdjustPeriod {
                start_offset,
                end_offset,
                caller,
            } => {
                let caller = self.caller(caller)?;
                let now = ledger.now();
                detail(ledger.adjust_current_period(
                    &caller,
                    offset(now, *start_offset),
                    offset(now, *end_offset),
                ))
            }
            Step::Create {
                account,
                amount,
                text,
                handle,
            } => {
                let who = self.config.resolve(account)?;
                let handle = parse_handle(handle.as_deref())?;
                detail(ledger.create_commitment(&who, text, handle, *amount))
            }
            Step::Revoke { account } => {
                let who = self.config.resolve(account)?;
                detail(ledger.revoke_commitment(&who))
            }
            Step::Pause { reason, caller } => detail(ledger.pause(&self.caller(caller)?, reason)),
            Step::Unpause { reason, caller } => {
                detail(ledger.unpause(&self.caller(caller)?, reason))
            }
            Step::SetControls {
                restricted_mode,
                require_handle,
                min_amount,
                max_amount,
                caller,
            } => detail(ledger.set_controls(
                &self.caller(caller)?,
                Controls {
                    restricted_mode: *restricted_mode,
                    require_handle: *require_handle,
                    min_amount: *min_amount,
                    max_amount: *max_amount,
                },
            )),
            Step::RotateTreasury { treasury, caller } => {
                let treasury = self.config.resolve(treasury)?;
                detail(ledger.rotate_treasury(&self.caller(caller)?, treasury))
            }
            Step::SetBaseFee { fee, caller } => {
                detail(ledger.set_base_fee(&self.caller(caller)?, *fee))
            }
            Step::TransferAdmin { new_admin, caller } => {
                let new_admin = self.config.resolve(new_admin)?;
                detail(ledger.transfer_administration(&self.caller(caller)?, new_admin))
            }
        }
    }

    fn caller(&self, caller: &Option<String>) -> CliResult<Address> {
        match caller {
            Some(name) => self.config.resolve(name),
            None => Ok(self.config.ledger.admin),
        }
    }

    pub fn report(&self, steps: Vec<StepOutcome>) -> CliResult<RunReport> {
        let ledger = &self.ledger;
        let config = ledger.config()?;

        let mut accounts = Vec::with_capacity(self.config.accounts.len());
        for account in &self.config.accounts {
            let address = account.address();
            accounts.push(AccountReport {
                name: account.name.clone(),
                address,
                balance: self.token.balance_of(&address).map_err(LedgerError::from)?,
                registered: ledger.is_registered(&address)?,
                status: ledger.commitment_status(&address)?,
                commitments: ledger.commitment_history(&address)?,
            });
        }

        Ok(RunReport {
            now: ledger.now(),
            steps,
            treasury_balance: self
                .token
                .balance_of(&config.treasury)
                .map_err(LedgerError::from)?,
            config,
            solvency: ledger.solvency()?,
            current_period: ledger.current_period_index()?,
            periods: ledger.periods()?,
            accounts,
            audit: ledger.audit_log(QueryWindow::default())?,
            audit_chain_length: ledger.verify_audit_chain()?,
        })
    }
}

fn detail<T: Serialize>(result: LedgerResult<T>) -> CliResult<LedgerResult<Value>> {
    match result {
        Ok(value) => Ok(Ok(serde_json::to_value(value)?)),
        Err(err) => Ok(Err(err)),
    }
}

fn offset(now: Timestamp, secs: i64) -> Timestamp {
    if secs >= 0 {
        now.plus_secs(secs.unsigned_abs())
    } else {
        now.minus_secs(secs.unsigned_abs())
    }
}

fn parse_handle(handle: Option<&str>) -> CliResult<HandleId> {
    match handle {
        None => Ok(HandleId::ZERO),
        Some(raw) if raw.starts_with("0x") => raw
            .parse()
            .map_err(|e| CliError::InvalidInput(format!("handle {raw}: {e}"))),
        Some(name) => Ok(HandleId::from_handle(name)),
    }
}
