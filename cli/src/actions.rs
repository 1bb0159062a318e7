//! Proposal actions written as `name:args`
//!
//! `set-buy-tax:1000`, `set-shares:5000,2000,3000`, `set-trading:true`,
//! `pay:alice:10` and so on. Token amounts are whole tokens; tax, share and
//! quorum values are basis points.

use anyhow::{anyhow, bail, Context, Result};
use dao_core::{Action, Amount, Call, TokenLedger};
use dao_runtime::World;
use std::str::FromStr;

use crate::accounts::resolve;
use crate::units::parse_amount;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSpec {
    SetBuyTax(u16),
    SetSellTax(u16),
    SetShares { staking: u16, burn: u16, dev: u16 },
    SetMinLock(u64),
    SetTrading(bool),
    SetMaxTx(Amount),
    SetMaxWallet(Amount),
    SetQuorum(u16),
    SetVotingPeriod(u64),
    /// Native-coin payout from the timelock treasury
    Pay { to: String, amount: Amount },
}

impl FromStr for ActionSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, args) = s
            .split_once(':')
            .ok_or_else(|| anyhow!("action {s:?} must look like name:value"))?;
        let int = |v: &str| -> Result<u64> {
            v.trim()
                .parse()
                .with_context(|| format!("{name}: invalid number {v:?}"))
        };
        let bps = |v: &str| -> Result<u16> {
            v.trim()
                .parse()
                .with_context(|| format!("{name}: invalid basis points {v:?}"))
        };

        let spec = match name {
            "set-buy-tax" => ActionSpec::SetBuyTax(bps(args)?),
            "set-sell-tax" => ActionSpec::SetSellTax(bps(args)?),
            "set-shares" => {
                let parts: Vec<&str> = args.split(',').collect();
                let [staking, burn, dev] = *parts.as_slice() else {
                    bail!("set-shares expects staking,burn,dev");
                };
                ActionSpec::SetShares {
                    staking: bps(staking)?,
                    burn: bps(burn)?,
                    dev: bps(dev)?,
                }
            }
            "set-min-lock" => ActionSpec::SetMinLock(int(args)?),
            "set-trading" => ActionSpec::SetTrading(
                args.trim()
                    .parse()
                    .with_context(|| format!("set-trading expects true or false, got {args:?}"))?,
            ),
            "set-max-tx" => ActionSpec::SetMaxTx(parse_amount(args)?),
            "set-max-wallet" => ActionSpec::SetMaxWallet(parse_amount(args)?),
            "set-quorum" => ActionSpec::SetQuorum(bps(args)?),
            "set-voting-period" => ActionSpec::SetVotingPeriod(int(args)?),
            "pay" => {
                let (to, amount) = args
                    .split_once(':')
                    .ok_or_else(|| anyhow!("pay expects account:amount"))?;
                ActionSpec::Pay {
                    to: to.to_string(),
                    amount: parse_amount(amount)?,
                }
            }
            other => bail!("unknown action {other:?}"),
        };
        Ok(spec)
    }
}

impl ActionSpec {
    /// The call the timelock will make for this action
    pub fn to_call(&self, world: &World) -> Result<Call> {
        let tax = world.tax_token.address();
        let (target, action) = match self {
            ActionSpec::SetBuyTax(bps) => (tax, Action::SetBuyTax { bps: *bps }),
            ActionSpec::SetSellTax(bps) => (tax, Action::SetSellTax { bps: *bps }),
            ActionSpec::SetShares { staking, burn, dev } => (
                world.splitter.address(),
                Action::SetShares {
                    staking_bps: *staking,
                    burn_bps: *burn,
                    dev_bps: *dev,
                },
            ),
            ActionSpec::SetMinLock(period) => (
                world.vault.address(),
                Action::SetMinLockPeriod { period: *period },
            ),
            ActionSpec::SetTrading(enabled) => {
                (tax, Action::SetTradingEnabled { enabled: *enabled })
            }
            ActionSpec::SetMaxTx(amount) => {
                (tax, Action::SetMaxTransactionAmount { amount: *amount })
            }
            ActionSpec::SetMaxWallet(amount) => {
                (tax, Action::SetMaxWalletAmount { amount: *amount })
            }
            ActionSpec::SetQuorum(bps) => {
                (world.governor.address(), Action::SetQuorumBps { bps: *bps })
            }
            ActionSpec::SetVotingPeriod(blocks) => (
                world.governor.address(),
                Action::SetVotingPeriod { blocks: *blocks },
            ),
            ActionSpec::Pay { to, amount } => {
                return Ok(Call::transfer_value(resolve(world, to)?, *amount));
            }
        };
        Ok(Call::action(target, &action)?)
    }
}
