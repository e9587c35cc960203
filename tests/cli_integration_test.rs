//! CLI integration tests for the simulate command orchestration.
//!
//! Tests cover:
//! - Config parsing (build_simulation_config, resolve_output)
//! - Full `simulate` run against INI, JSON and CSV files on disk
//! - Dry-run mode leaves no output behind

mod common;

use betbench::adapters::file_config_adapter::FileConfigAdapter;
use betbench::cli::{self, Cli};
use betbench::domain::error::BetbenchError;
use betbench::domain::leaderboard::Leaderboard;
use betbench::domain::strategy::StrategyKind;
use clap::Parser;
use common::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[simulation]
initial_cash = 2.0
allowance_per_step = 0.1
fee_pct = 0.5
start_date = 2025-01-01
end_date = 2025-03-31
baselines = random, volume
random_seed = 7
invest_fraction = 0.5
max_markets = 2

[data]
decisions_path = decisions.json
prices_dir = prices

[report]
output_path = out/leaderboard.json
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_simulation_config_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = cli::build_simulation_config(&adapter).unwrap();

        assert!((config.initial_cash - 2.0).abs() < f64::EPSILON);
        assert!((config.execution.allowance_per_step - 0.1).abs() < f64::EPSILON);
        assert!((config.execution.fee_pct - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.start_date, Some(date(2025, 1, 1)));
        assert_eq!(config.end_date, Some(date(2025, 3, 31)));
        assert_eq!(
            config.baselines,
            vec![StrategyKind::Random, StrategyKind::VolumeWeighted]
        );
        assert_eq!(config.random_seed, 7);
        assert!((config.invest_fraction - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.max_markets, 2);
    }

    #[test]
    fn build_simulation_config_uses_defaults() {
        let adapter = FileConfigAdapter::from_string("[simulation]\n").unwrap();
        let config = cli::build_simulation_config(&adapter).unwrap();

        assert!((config.initial_cash - 1.0).abs() < f64::EPSILON);
        assert!(config.start_date.is_none());
        assert!(config.end_date.is_none());
        assert!(config.baselines.is_empty());
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.max_markets, 5);
    }

    #[test]
    fn build_simulation_config_rejects_invalid_values() {
        let adapter = FileConfigAdapter::from_string("[simulation]\nfee_pct = -1\n").unwrap();
        let err = cli::build_simulation_config(&adapter).unwrap_err();
        assert!(matches!(err, BetbenchError::ConfigInvalid { key, .. } if key == "fee_pct"));
    }

    #[test]
    fn output_flag_wins_over_config() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert_eq!(
            cli::resolve_output(Some(Path::new("cli.json")), &adapter),
            PathBuf::from("cli.json")
        );
        assert_eq!(
            cli::resolve_output(None, &adapter),
            PathBuf::from("out/leaderboard.json")
        );
        let bare = FileConfigAdapter::from_string("[simulation]\n").unwrap();
        assert_eq!(
            cli::resolve_output(None, &bare),
            PathBuf::from("leaderboard.json")
        );
    }

    #[test]
    fn load_config_from_disk() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).unwrap();
        assert!(cli::build_simulation_config(&adapter).is_ok());
    }
}

mod simulate_command {
    use super::*;

    /// Lays out decisions, prices and a config in a temp dir.
    fn workspace(extra_simulation: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let records = vec![
            decision("alpha", date(2025, 1, 1), vec![event("E", vec![bet("rain", 0.8, 1.0)])]),
            decision("alpha", date(2025, 1, 2), vec![]),
            decision("beta", date(2025, 1, 1), vec![event("E", vec![bet("rain", 0.3, -0.5)])]),
            decision("beta", date(2025, 1, 2), vec![]),
        ];
        fs::write(
            root.join("decisions.json"),
            serde_json::to_string_pretty(&records).unwrap(),
        )
        .unwrap();

        fs::create_dir(root.join("prices")).unwrap();
        fs::write(
            root.join("prices").join("rain.csv"),
            "date,price,volume\n2025-01-01,0.5,100\n2025-01-02,0.6,120\n",
        )
        .unwrap();

        let ini = format!(
            "[simulation]\n{extra_simulation}\n[data]\ndecisions_path = {}\nprices_dir = {}\n",
            root.join("decisions.json").display(),
            root.join("prices").display(),
        );
        let config_path = root.join("betbench.ini");
        fs::write(&config_path, ini).unwrap();

        (dir, config_path)
    }

    fn simulate(config: &Path, output: &Path, dry_run: bool) {
        let mut args = vec![
            "betbench".to_string(),
            "simulate".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--output".to_string(),
            output.display().to_string(),
        ];
        if dry_run {
            args.push("--dry-run".to_string());
        }
        cli::run(Cli::parse_from(args));
    }

    #[test]
    fn writes_ranked_leaderboard() {
        let (dir, config) = workspace("baselines = volume");
        let output = dir.path().join("board.json");
        simulate(&config, &output, false);

        let board: Leaderboard =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let ids: Vec<&str> = board.entries.iter().map(|e| e.model_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[0], "alpha");
        assert!(ids.contains(&"beta"));
        assert!(ids.contains(&"baseline-volume"));
        assert!(board.excluded.is_empty());
        // all-in YES from 0.5 to 0.6
        assert!((board.entries[0].final_cumulative_pnl - 0.2).abs() < 1e-9);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (dir, config) = workspace("");
        let output = dir.path().join("board.json");
        simulate(&config, &output, true);
        assert!(!output.exists());
    }

    #[test]
    fn invalid_config_writes_nothing() {
        let (dir, config) = workspace("invest_fraction = 2");
        let output = dir.path().join("board.json");
        simulate(&config, &output, false);
        assert!(!output.exists());
    }
}

#[test]
fn cli_parses_every_subcommand() {
    assert!(Cli::try_parse_from(["betbench", "simulate", "--config", "x.ini", "--dry-run"]).is_ok());
    assert!(Cli::try_parse_from(["betbench", "validate", "--decisions", "d.json"]).is_ok());
    assert!(Cli::try_parse_from(["betbench", "markets", "--prices-dir", "prices"]).is_ok());
    assert!(Cli::try_parse_from(["betbench", "simulate"]).is_err());
}
