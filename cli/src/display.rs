//! Terminal output for `daoctl`

use dao_core::{Event, EventRecord, Timestamp, TokenLedger, H256};
use dao_governance::ProposalState;
use dao_runtime::Runtime;
use owo_colors::OwoColorize;

use crate::accounts::label;
use crate::commands::{AccountSummary, ProposalSummary};
use crate::units::format_amount;

const RULE: &str = "═══════════════════════════════════════════════════";

pub fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn heading(title: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", RULE.bright_black());
}

fn field(name: &str, value: impl std::fmt::Display) {
    println!("{:<18} {}", format!("{name}:").yellow().bold(), value);
}

pub fn status(runtime: &Runtime) {
    let world = runtime.world();
    heading("DAO Deployment");
    field("Block", runtime.block());
    field("Time", format_timestamp(runtime.timestamp()));
    field("Chain id", runtime.env().chain_id);
    field(
        "Governed",
        if runtime.is_governed() {
            "yes".green().to_string()
        } else {
            "no (deployer in control)".red().to_string()
        },
    );

    heading("Contracts");
    for (name, address) in world.contracts() {
        println!("  {:<14} {}", name, address.bright_blue());
    }

    heading("Tokens");
    let dao = &world.voting_token;
    field(
        dao.symbol(),
        format!("{} supply", format_amount(dao.total_supply())),
    );
    let tax = &world.tax_token;
    field(
        tax.symbol(),
        format!(
            "{} supply, buy {} bps, sell {} bps, trading {}",
            format_amount(tax.total_supply()),
            tax.buy_tax(),
            tax.sell_tax(),
            if tax.trading_enabled() { "on" } else { "off" }
        ),
    );
    field(
        "Limits",
        format!(
            "max tx {}, max wallet {}",
            format_amount(tax.max_transaction_amount()),
            format_amount(tax.max_wallet_amount())
        ),
    );

    heading("Economics");
    let shares = world.splitter.shares();
    field(
        "Revenue split",
        format!(
            "{} staking / {} burn / {} dev (bps)",
            shares.staking_bps, shares.burn_bps, shares.dev_bps
        ),
    );
    field(
        "Pending revenue",
        format_amount(world.splitter.get_accumulated_balance(tax)),
    );
    field("Total staked", format_amount(world.vault.total_staked()));
    field("Min lock", format!("{}s", world.vault.min_lock_period()));

    heading("Governance");
    let governor = &world.governor;
    field("Voting delay", format!("{} blocks", governor.voting_delay()));
    field("Voting period", format!("{} blocks", governor.voting_period()));
    field("Quorum", format!("{} bps", governor.quorum_bps()));
    field("Threshold", format_amount(governor.proposal_threshold()));
    field("Timelock delay", format!("{}s", world.timelock.min_delay()));
    field("Proposals", governor.proposal_count());
    println!();
}

pub fn account(runtime: &Runtime, summary: &AccountSummary) {
    let world = runtime.world();
    heading("Account");
    field("Address", summary.address.bright_blue());
    field("DAO", format_amount(summary.dao_balance));
    field("Votes", format_amount(summary.votes));
    field(
        "Delegate",
        if summary.delegate.is_zero() {
            "none".to_string()
        } else {
            label(world, summary.delegate)
        },
    );
    field("TAX", format_amount(summary.tax_balance));
    field("Staked", format_amount(summary.staked));
    field("Earned", format_amount(summary.earned).green());
    if summary.staked > 0 {
        field("Unlocks", format_timestamp(summary.unlocks_at));
    }
    field("Native", format_amount(summary.native));
    println!();
}

fn state_label(state: ProposalState) -> String {
    let text = state.to_string();
    match state {
        ProposalState::Active | ProposalState::Succeeded | ProposalState::Queued => {
            text.green().to_string()
        }
        ProposalState::Executed => text.bright_blue().to_string(),
        ProposalState::Pending => text.yellow().to_string(),
        _ => text.red().to_string(),
    }
}

pub fn proposals(runtime: &Runtime, list: &[ProposalSummary]) {
    heading("Proposals");
    if list.is_empty() {
        println!("  (none)");
    }
    for p in list {
        println!(
            "  #{} {} {}",
            p.position,
            state_label(p.state),
            p.description.bold()
        );
        println!("     id       {}", p.id.bright_black());
        println!("     proposer {}", label(runtime.world(), p.proposer));
        println!(
            "     votes    for {} / against {} / abstain {}",
            format_amount(p.votes.for_votes).green(),
            format_amount(p.votes.against).red(),
            format_amount(p.votes.abstain)
        );
        println!("     window   blocks {}..={}", p.snapshot + 1, p.deadline);
        if let Some(eta) = p.eta {
            println!("     eta      {}", format_timestamp(eta));
        }
    }
    println!();
}

pub fn proposal_created(id: H256) {
    println!("{} proposal {}", "✓".green(), id.bright_blue());
}

fn record(runtime: &Runtime, r: &EventRecord) {
    println!(
        "  [{}] {} {} {:?}",
        r.block,
        label(runtime.world(), r.emitter).bright_black(),
        r.event.name().cyan(),
        r.event
    );
}

pub fn events(runtime: &Runtime, records: &[EventRecord]) {
    if records.is_empty() {
        println!("  (no matching events)");
    }
    for r in records {
        record(runtime, r);
    }
}

/// One-line confirmation plus the transaction's events, approvals omitted
pub fn receipt(runtime: &Runtime, what: &str, records: &[EventRecord]) {
    println!("{} {}", "✓".green(), what.bold());
    records
        .iter()
        .filter(|r| !matches!(r.event, Event::Approval { .. }))
        .for_each(|r| record(runtime, r));
}
