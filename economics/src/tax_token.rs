//! Fixed-supply trading token with per-transfer tax and anti-whale limits
//!
//! Every transfer is classified as a buy (sender is a registered AMM pair), a
//! sell (receiver is a pair) or a wallet transfer. Buys and sells pay the
//! configured tax to the tax recipient in the same balance update that moves
//! the net amount.

use dao_core::{
    apply_bps, Address, Amount, Balances, DaoError, Event, ExecContext, Ownable, Result,
    TokenLedger,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::constants::{
    DEFAULT_BUY_TAX_BPS, DEFAULT_MAX_TX_DIVISOR, DEFAULT_MAX_WALLET_DIVISOR, DEFAULT_SELL_TAX_BPS,
    MAX_TAX_BPS,
};

/// Owner-controlled transfer policy. `version` increments on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxConfig {
    pub buy_tax_bps: u16,
    pub sell_tax_bps: u16,
    pub max_tx_amount: Amount,
    pub max_wallet_amount: Amount,
    pub trading_enabled: bool,
    pub tax_recipient: Address,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Buy,
    Sell,
    Wallet,
}

/// Outcome of a transfer before it is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferQuote {
    pub kind: TransferKind,
    pub received: Amount,
    pub tax: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxToken {
    address: Address,
    name: String,
    symbol: String,
    book: Balances,
    ownable: Ownable,
    config: TaxConfig,
    tax_exempt: BTreeSet<Address>,
    limit_exempt: BTreeSet<Address>,
    amm_pairs: BTreeSet<Address>,
}

impl TaxToken {
    /// Deploys the token, minting the whole supply to `owner`, who starts out
    /// tax- and limit-exempt. Trading starts disabled and no tax recipient is
    /// set, so no tax is collected until one is configured.
    pub fn new(
        ctx: &mut ExecContext,
        address: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        owner: Address,
        supply: Amount,
    ) -> Result<Self> {
        let ownable = Ownable::new(ctx, address, owner);
        let mut token = Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            book: Balances::new(),
            ownable,
            config: TaxConfig {
                buy_tax_bps: DEFAULT_BUY_TAX_BPS,
                sell_tax_bps: DEFAULT_SELL_TAX_BPS,
                max_tx_amount: supply / DEFAULT_MAX_TX_DIVISOR,
                max_wallet_amount: supply / DEFAULT_MAX_WALLET_DIVISOR,
                trading_enabled: false,
                tax_recipient: Address::ZERO,
                version: 0,
            },
            tax_exempt: BTreeSet::from([owner]),
            limit_exempt: BTreeSet::from([owner]),
            amm_pairs: BTreeSet::new(),
        };
        token.book.mint(owner, supply)?;
        ctx.emit(
            address,
            Event::Transfer {
                from: Address::ZERO,
                to: owner,
                amount: supply,
            },
        );
        info!(token = %address, symbol = %token.symbol, %owner, supply, "tax token deployed");
        Ok(token)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        18
    }

    pub fn owner(&self) -> Address {
        self.ownable.owner()
    }

    pub fn config(&self) -> &TaxConfig {
        &self.config
    }

    pub fn balances(&self) -> &Balances {
        &self.book
    }

    pub fn buy_tax(&self) -> u16 {
        self.config.buy_tax_bps
    }

    pub fn sell_tax(&self) -> u16 {
        self.config.sell_tax_bps
    }

    pub fn max_transaction_amount(&self) -> Amount {
        self.config.max_tx_amount
    }

    pub fn max_wallet_amount(&self) -> Amount {
        self.config.max_wallet_amount
    }

    pub fn trading_enabled(&self) -> bool {
        self.config.trading_enabled
    }

    pub fn tax_recipient(&self) -> Address {
        self.config.tax_recipient
    }

    pub fn is_tax_exempt(&self, account: Address) -> bool {
        self.tax_exempt.contains(&account)
    }

    pub fn is_limit_exempt(&self, account: Address) -> bool {
        self.limit_exempt.contains(&account)
    }

    pub fn is_amm_pair(&self, account: Address) -> bool {
        self.amm_pairs.contains(&account)
    }

    pub fn classify(&self, from: Address, to: Address) -> TransferKind {
        if self.is_amm_pair(from) {
            TransferKind::Buy
        } else if self.is_amm_pair(to) {
            TransferKind::Sell
        } else {
            TransferKind::Wallet
        }
    }

    /// Net amount and tax for a transfer under the current policy. Does not
    /// check balances, limits or the trading switch.
    pub fn quote(&self, from: Address, to: Address, amount: Amount) -> Result<TransferQuote> {
        let kind = self.classify(from, to);
        let skip = self.is_tax_exempt(from)
            || self.is_tax_exempt(to)
            || self.config.tax_recipient.is_zero();
        let rate = match kind {
            _ if skip => 0,
            TransferKind::Buy => self.config.buy_tax_bps,
            TransferKind::Sell => self.config.sell_tax_bps,
            TransferKind::Wallet => 0,
        };
        let tax = apply_bps(amount, rate)?;
        Ok(TransferQuote {
            kind,
            received: amount - tax,
            tax,
        })
    }

    pub fn set_buy_tax(&mut self, ctx: &mut ExecContext, caller: Address, bps: u16) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        ensure_tax_bound(bps)?;
        self.config.buy_tax_bps = bps;
        self.bump_version(ctx, Event::BuyTaxUpdated { bps });
        Ok(())
    }

    pub fn set_sell_tax(&mut self, ctx: &mut ExecContext, caller: Address, bps: u16) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        ensure_tax_bound(bps)?;
        self.config.sell_tax_bps = bps;
        self.bump_version(ctx, Event::SellTaxUpdated { bps });
        Ok(())
    }

    pub fn set_max_transaction_amount(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        self.config.max_tx_amount = amount;
        self.bump_version(ctx, Event::MaxTransactionAmountUpdated { amount });
        Ok(())
    }

    pub fn set_max_wallet_amount(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        amount: Amount,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        self.config.max_wallet_amount = amount;
        self.bump_version(ctx, Event::MaxWalletAmountUpdated { amount });
        Ok(())
    }

    /// Setting the zero address disables tax collection
    pub fn set_tax_recipient(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        recipient: Address,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        self.config.tax_recipient = recipient;
        self.bump_version(ctx, Event::TaxRecipientUpdated { recipient });
        Ok(())
    }

    pub fn set_trading_enabled(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        enabled: bool,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        self.config.trading_enabled = enabled;
        self.bump_version(ctx, Event::TradingEnabled { enabled });
        Ok(())
    }

    pub fn set_amm_pair(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        pair: Address,
        is_pair: bool,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        toggle(&mut self.amm_pairs, pair, is_pair);
        self.bump_version(ctx, Event::AmmPairUpdated { pair, is_pair });
        Ok(())
    }

    pub fn set_tax_exempt(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        account: Address,
        exempt: bool,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        toggle(&mut self.tax_exempt, account, exempt);
        self.bump_version(ctx, Event::TaxExemptUpdated { account, exempt });
        Ok(())
    }

    pub fn set_limit_exempt(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        account: Address,
        exempt: bool,
    ) -> Result<()> {
        self.ownable.ensure_owner(caller)?;
        toggle(&mut self.limit_exempt, account, exempt);
        self.bump_version(ctx, Event::LimitExemptUpdated { account, exempt });
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        ctx: &mut ExecContext,
        caller: Address,
        new_owner: Address,
    ) -> Result<()> {
        self.ownable
            .transfer_ownership(ctx, self.address, caller, new_owner)
    }

    pub fn renounce_ownership(&mut self, ctx: &mut ExecContext, caller: Address) -> Result<()> {
        self.ownable.renounce_ownership(ctx, self.address, caller)
    }

    fn bump_version(&mut self, ctx: &mut ExecContext, event: Event) {
        self.config.version += 1;
        info!(token = %self.address, version = self.config.version, change = event.name(), "tax config updated");
        ctx.emit(self.address, event);
    }

    fn update(
        &mut self,
        ctx: &mut ExecContext,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        if from.is_zero() || to.is_zero() {
            return Err(DaoError::InvalidParameter(
                "transfer involving the zero address".to_string(),
            ));
        }
        self.book.ensure_balance(from, amount)?;

        let tax_exempt = self.is_tax_exempt(from) || self.is_tax_exempt(to);
        if !self.config.trading_enabled && !tax_exempt {
            return Err(DaoError::TradingDisabled);
        }

        if !self.is_limit_exempt(from) && !self.is_limit_exempt(to) {
            if amount > self.config.max_tx_amount {
                return Err(DaoError::ExceedsLimit {
                    limit_kind: "maxTransactionAmount",
                    amount,
                    limit: self.config.max_tx_amount,
                });
            }
            if !self.is_amm_pair(to) {
                let resulting = self.book.balance_of(to).saturating_add(amount);
                if resulting > self.config.max_wallet_amount {
                    return Err(DaoError::ExceedsLimit {
                        limit_kind: "maxWalletAmount",
                        amount: resulting,
                        limit: self.config.max_wallet_amount,
                    });
                }
            }
        }

        let quote = self.quote(from, to, amount)?;
        let recipient = self.config.tax_recipient;

        // single three-way adjustment
        self.book.debit(from, amount)?;
        self.book.credit(to, quote.received)?;
        self.book.credit(recipient, quote.tax)?;

        ctx.emit(
            self.address,
            Event::Transfer {
                from,
                to,
                amount: quote.received,
            },
        );
        if quote.tax > 0 {
            ctx.emit(
                self.address,
                Event::Transfer {
                    from,
                    to: recipient,
                    amount: quote.tax,
                },
            );
        }
        debug!(
            token = %self.address,
            %from,
            %to,
            amount,
            received = quote.received,
            tax = quote.tax,
            kind = ?quote.kind,
            "taxed transfer"
        );
        Ok(())
    }
}

fn ensure_tax_bound(bps: u16) -> Result<()> {
    if bps > MAX_TAX_BPS {
        return Err(DaoError::InvalidParameter(format!(
            "tax {bps} bps exceeds MAX_TAX ({MAX_TAX_BPS})"
        )));
    }
    Ok(())
}

fn toggle(set: &mut BTreeSet<Address>, account: Address, on: bool) {
    if on {
        set.insert(account);
    } else {
        set.remove(&account);
    }
}

impl TokenLedger for TaxToken {
    fn address(&self) -> Address {
        self.address
    }

    fn total_supply(&self) -> Amount {
        self.book.total_supply()
    }

    fn balance_of(&self, account: Address) -> Amount {
        self.book.balance_of(account)
    }

    fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.book.allowance(owner, spender)
    }

    fn transfer(
        &mut self,
        ctx: &mut ExecContext,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.update(ctx, from, to, amount)
    }

    fn approve(
        &mut self,
        ctx: &mut ExecContext,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        self.book.approve(ctx, self.address, owner, spender, amount)
    }

    fn transfer_from(
        &mut self,
        ctx: &mut ExecContext,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.book.ensure_balance(from, amount)?;
        self.book.spend_allowance(from, spender, amount)?;
        self.update(ctx, from, to, amount)
    }
}
