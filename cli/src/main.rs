use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use dao_cli::units::parse_amount;
use dao_cli::{accounts, commands, display, ActionSpec, StateFile, Support, TokenKind};
use dao_core::{Amount, BlockNumber};
use dao_runtime::Runtime;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    " ",
    env!("GIT_BRANCH"),
    ")"
);

#[derive(Parser)]
#[command(name = "daoctl")]
#[command(about = "Local DAO governance and token economy", version, long_version = LONG_VERSION)]
struct Cli {
    /// Deployment state file
    #[arg(short, long, global = true, default_value = "dao-state.json")]
    state: PathBuf,

    /// Log filter (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a fresh DAO into the state file
    Init {
        /// TOML deployment config
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,

        /// Hand control to governance right after genesis
        #[arg(long)]
        handover: bool,
    },

    /// Show contracts, parameters and the clock
    Status,

    /// Show balances, votes and staking position of an account
    Account { name: String },

    /// Mine blocks
    Mine {
        #[arg(default_value = "1")]
        blocks: u64,
    },

    /// Move the clock forward by SECONDS and mine one block
    AdvanceTime { seconds: u64 },

    /// Transfer tokens
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long, value_enum, default_value = "dao")]
        token: TokenKind,
        to: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },

    /// Set an allowance
    Approve {
        #[arg(long)]
        from: String,
        #[arg(long, value_enum, default_value = "dao")]
        token: TokenKind,
        spender: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },

    /// Delegate voting power (to self when no delegatee is given)
    Delegate {
        #[arg(long)]
        from: String,
        to: Option<String>,
    },

    /// Create a proposal from one or more actions, e.g. set-buy-tax:1000
    Propose {
        #[arg(long)]
        from: String,
        #[arg(short, long)]
        description: String,
        #[arg(required = true)]
        actions: Vec<ActionSpec>,
    },

    /// Vote on a proposal (by #position or id)
    Vote {
        #[arg(long)]
        from: String,
        proposal: String,
        #[arg(value_enum)]
        support: Support,
        #[arg(long)]
        reason: Option<String>,
    },

    /// Queue a succeeded proposal in the timelock
    Queue {
        proposal: String,
        #[arg(long, default_value = accounts::DEPLOYER)]
        from: String,
    },

    /// Execute a queued proposal once its delay has passed
    Execute {
        proposal: String,
        #[arg(long, default_value = accounts::DEPLOYER)]
        from: String,
    },

    /// Cancel a proposal (proposer before voting ends, or the guardian)
    Cancel {
        proposal: String,
        #[arg(long)]
        from: String,
    },

    /// List proposals with their current state
    Proposals,

    /// Stake DAO tokens in the vault
    Stake {
        #[arg(long)]
        from: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },

    /// Withdraw staked tokens after the lock period
    Withdraw {
        #[arg(long)]
        from: String,
        #[arg(value_parser = parse_amount)]
        amount: Amount,
    },

    /// Claim staking rewards
    Claim {
        #[arg(long)]
        from: String,
    },

    /// Split accumulated tax revenue
    Distribute {
        #[arg(long, default_value = accounts::DEPLOYER)]
        from: String,
    },

    /// Query the event log
    Events {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        emitter: Option<String>,
        #[arg(long, default_value = "0")]
        from_block: BlockNumber,
        #[arg(long)]
        to_block: Option<BlockNumber>,
    },

    /// Give the timelock control of every contract and drop deployer admin
    Handover,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one subcommand; returns whether the state changed
fn run(runtime: &mut Runtime, command: Commands) -> Result<bool> {
    match command {
        Commands::Init { .. } => bail!("init runs without an existing state"),
        Commands::Status => display::status(runtime),
        Commands::Account { name } => {
            let summary = commands::account(runtime, &name)?;
            display::account(runtime, &summary);
        }
        Commands::Proposals => display::proposals(runtime, &commands::proposals(runtime)?),
        Commands::Events {
            name,
            emitter,
            from_block,
            to_block,
        } => {
            let records = commands::events(
                runtime,
                name.as_deref(),
                emitter.as_deref(),
                from_block,
                to_block,
            )?;
            display::events(runtime, &records);
        }
        Commands::Mine { blocks } => {
            runtime.mine(blocks)?;
            println!("{} block {}", "⛏".yellow(), runtime.block());
            return Ok(true);
        }
        Commands::AdvanceTime { seconds } => {
            runtime.increase_time(seconds)?;
            println!(
                "{} {} (block {})",
                "⏱".yellow(),
                display::format_timestamp(runtime.timestamp()),
                runtime.block()
            );
            return Ok(true);
        }
        Commands::Propose {
            from,
            description,
            actions,
        } => {
            let id = commands::propose(runtime, &from, &description, &actions)?;
            display::proposal_created(id);
            return Ok(true);
        }
        Commands::Handover => {
            let records = runtime.hand_over_to_governance()?;
            display::receipt(runtime, "governance in control", &records);
            return Ok(true);
        }
        tx => {
            let (what, records) = match tx {
                Commands::Transfer {
                    from,
                    token,
                    to,
                    amount,
                } => ("transfer", commands::transfer(runtime, &from, token, &to, amount)?),
                Commands::Approve {
                    from,
                    token,
                    spender,
                    amount,
                } => ("approve", commands::approve(runtime, &from, token, &spender, amount)?),
                Commands::Delegate { from, to } => {
                    ("delegate", commands::delegate(runtime, &from, to.as_deref())?)
                }
                Commands::Vote {
                    from,
                    proposal,
                    support,
                    reason,
                } => ("vote", commands::vote(runtime, &from, &proposal, support, reason)?),
                Commands::Queue { proposal, from } => {
                    ("queue", commands::queue(runtime, &from, &proposal)?)
                }
                Commands::Execute { proposal, from } => {
                    ("execute", commands::execute(runtime, &from, &proposal)?)
                }
                Commands::Cancel { proposal, from } => {
                    ("cancel", commands::cancel(runtime, &from, &proposal)?)
                }
                Commands::Stake { from, amount } => {
                    ("stake", commands::stake(runtime, &from, amount)?)
                }
                Commands::Withdraw { from, amount } => {
                    ("withdraw", commands::withdraw(runtime, &from, amount)?)
                }
                Commands::Claim { from } => ("claim", commands::claim(runtime, &from)?),
                Commands::Distribute { from } => {
                    ("distribute", commands::distribute(runtime, &from)?)
                }
                _ => bail!("unsupported command"),
            };
            display::receipt(runtime, what, &records);
            return Ok(true);
        }
    }
    Ok(false)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let state = StateFile::new(&cli.state);

    if let Commands::Init {
        config,
        force,
        handover,
    } = cli.command
    {
        if state.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                state.path().display()
            );
        }
        let mut runtime = commands::init(config.as_deref())?;
        if handover {
            runtime.hand_over_to_governance()?;
        }
        state.save(&runtime)?;
        display::status(&runtime);
        println!("{} state written to {}", "✓".green(), state.path().display());
        return Ok(());
    }

    let mut runtime = state.load()?;
    if run(&mut runtime, cli.command)? {
        state.save(&runtime)?;
    }
    Ok(())
}
