use dao_cli::accounts::{self, resolve};
use dao_cli::{commands, ActionSpec, StateFile, Support, TokenKind};
use dao_core::{TokenLedger, UNIT};
use dao_governance::ProposalState;
use std::fs;
use tempfile::TempDir;

const FAST_CONFIG: &str = r#"
[governor]
voting_period = 10

[timelock]
min_delay = 60
"#;

fn fast_runtime(dir: &TempDir) -> dao_runtime::Runtime {
    let config = dir.path().join("dao.toml");
    fs::write(&config, FAST_CONFIG).unwrap();
    commands::init(Some(&config)).unwrap()
}

#[test]
fn test_state_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let state = StateFile::new(dir.path().join("state.json"));
    assert!(!state.exists());
    assert!(state.load().is_err());

    let mut runtime = commands::init(None).unwrap();
    runtime.mine(5).unwrap();
    state.save(&runtime).unwrap();
    assert!(state.exists());
    assert_eq!(state.load().unwrap(), runtime);
}

#[test]
fn test_corrupt_state_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    fs::write(&path, "{ not json").unwrap();
    let err = StateFile::new(&path).load().unwrap_err();
    assert!(format!("{err:#}").contains("corrupt state file"));
}

#[test]
fn test_init_reads_config() {
    let dir = TempDir::new().unwrap();
    let runtime = fast_runtime(&dir);
    assert_eq!(runtime.world().governor.voting_period(), 10);
    assert_eq!(runtime.world().timelock.min_delay(), 60);
    assert_eq!(runtime.deployer(), accounts::deployer());

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[tax_token]\nbuy_tax_bps = 9000\n").unwrap();
    assert!(commands::init(Some(&bad)).is_err());
}

#[test]
fn test_account_names() {
    let runtime = commands::init(None).unwrap();
    let world = runtime.world();
    assert_eq!(resolve(world, "vault").unwrap(), world.vault.address());
    assert_eq!(
        resolve(world, "tax-token").unwrap(),
        world.tax_token.address()
    );
    assert_eq!(resolve(world, "deployer").unwrap(), accounts::deployer());
    let alice = resolve(world, "alice").unwrap();
    assert_eq!(resolve(world, &alice.to_string()).unwrap(), alice);
    assert!(resolve(world, "0x1234").is_err());
}

#[test]
fn test_governance_through_commands() {
    let dir = TempDir::new().unwrap();
    let state = StateFile::new(dir.path().join("state.json"));
    let mut runtime = fast_runtime(&dir);

    commands::delegate(&mut runtime, "deployer", None).unwrap();
    runtime.hand_over_to_governance().unwrap();
    runtime.mine(1).unwrap();
    state.save(&runtime).unwrap();

    // each step reloads from disk like separate invocations would
    let mut runtime = state.load().unwrap();
    let actions: Vec<ActionSpec> = ["set-buy-tax:1000", "set-shares:6000,1000,3000"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    let id = commands::propose(&mut runtime, "deployer", "retune economics", &actions).unwrap();
    assert_eq!(commands::find_proposal(&runtime, "1").unwrap(), id);
    assert_eq!(commands::find_proposal(&runtime, &id.to_string()).unwrap(), id);
    runtime.mine(2).unwrap();
    commands::vote(&mut runtime, "deployer", "1", Support::For, Some("lgtm".into())).unwrap();
    state.save(&runtime).unwrap();

    let mut runtime = state.load().unwrap();
    runtime.mine(10).unwrap();
    commands::queue(&mut runtime, "anyone", "1").unwrap();
    assert!(commands::execute(&mut runtime, "anyone", "1").is_err());
    runtime.increase_time(60).unwrap();
    commands::execute(&mut runtime, "anyone", "1").unwrap();

    let world = runtime.world();
    assert_eq!(world.tax_token.buy_tax(), 1_000);
    assert_eq!(world.splitter.shares().staking_bps, 6_000);
    let listed = commands::proposals(&runtime).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].state, ProposalState::Executed);
    assert_eq!(listed[0].votes.for_votes, 1_000_000 * UNIT);

    let created = commands::events(&runtime, Some("ProposalCreated"), Some("governor"), 0, None)
        .unwrap();
    assert_eq!(created.len(), 1);
}

#[test]
fn test_unknown_proposal_references() {
    let runtime = commands::init(None).unwrap();
    assert!(commands::find_proposal(&runtime, "0").is_err());
    assert!(commands::find_proposal(&runtime, "1").is_err());
    assert!(commands::find_proposal(&runtime, &format!("0x{}", "ab".repeat(32))).is_err());
}

#[test]
fn test_staking_rewards_through_commands() {
    let mut runtime = commands::init(None).unwrap();
    commands::transfer(&mut runtime, "deployer", TokenKind::Dao, "alice", 100 * UNIT).unwrap();
    commands::stake(&mut runtime, "alice", 100 * UNIT).unwrap();
    commands::transfer(&mut runtime, "deployer", TokenKind::Tax, "splitter", 1_000 * UNIT)
        .unwrap();
    commands::distribute(&mut runtime, "bob").unwrap();

    let alice = commands::account(&runtime, "alice").unwrap();
    assert_eq!(alice.staked, 100 * UNIT);
    assert_eq!(alice.dao_balance, 0);
    assert_eq!(alice.earned, 500 * UNIT);

    commands::claim(&mut runtime, "alice").unwrap();
    assert_eq!(commands::account(&runtime, "alice").unwrap().tax_balance, 500 * UNIT);
    // still locked
    assert!(commands::withdraw(&mut runtime, "alice", UNIT).is_err());
}

#[test]
fn test_failed_command_leaves_state_untouched() {
    let mut runtime = commands::init(None).unwrap();
    let before = runtime.clone();
    let err = commands::transfer(&mut runtime, "nobody", TokenKind::Dao, "alice", UNIT)
        .unwrap_err();
    assert!(format!("{err:#}").contains("transfer from nobody reverted"));
    assert_eq!(runtime, before);

    // trading is off and alice is not exempt
    commands::transfer(&mut runtime, "deployer", TokenKind::Tax, "alice", UNIT).unwrap();
    assert!(commands::transfer(&mut runtime, "alice", TokenKind::Tax, "bob", UNIT).is_err());
}

#[test]
fn test_sample_config_matches_defaults() {
    let sample = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/dao.toml");
    let config = dao_runtime::DaoConfig::from_file(&sample).unwrap();
    assert_eq!(config, dao_runtime::DaoConfig::default());
    assert!(commands::init(Some(&sample)).is_ok());
}
