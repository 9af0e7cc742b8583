//! chariot-engine CLI
//!
//! Run trade-loop matching and market simulations from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Run one matching round over a market file
//! chariot-engine match --input market.json
//!
//! # Same, as JSON
//! chariot-engine match --input market.json --format json
//!
//! # Multi-round simulation over a generated market
//! chariot-engine simulate --users 50 --rounds 10 --growth 0.1 --seed 42
//!
//! # Generate a random market file for testing
//! chariot-engine generate --users 30 --output market.json
//! ```

use chariot_engine::core::config::SimulationConfig;
use chariot_engine::core::item::{Catalog, ItemId};
use chariot_engine::core::user::{User, UserId, UserPool};
use chariot_engine::simulation::market::{GrowthMarket, MarketConfig, PopulationSource};
use chariot_engine::simulation::round::RoundController;
use chariot_engine::simulation::runner::Simulation;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"chariot-engine — trade-loop discovery and selection for barter markets

USAGE:
    chariot-engine <COMMAND> [OPTIONS]

COMMANDS:
    match       Run one matching round over a market file
    simulate    Run a multi-round simulation over a generated market
    generate    Generate a random market file (for testing)
    help        Show this message

OPTIONS (match):
    --input <FILE>      Path to JSON market file
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (simulate):
    --users <N>         Initial entrants (default: 20)
    --rounds <N>        Maximum rounds (default: 12)
    --growth <RATE>     Entrant growth rate per round (default: 0.1)
    --seed <N>          RNG seed for a reproducible market
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (generate):
    --users <N>         Number of users (default: 20)
    --models <N>        Number of watch models (default: 12)
    --seed <N>          RNG seed
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    chariot-engine match --input market.json
    chariot-engine simulate --users 100 --rounds 8 --seed 7
    chariot-engine generate --users 50 --models 20 --output market.json"#
    );
}

/// JSON schema for market files.
#[derive(serde::Serialize, serde::Deserialize)]
struct MarketFile {
    /// Model id → value, amounts as strings.
    catalog: BTreeMap<String, String>,
    users: Vec<UserEntry>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct UserEntry {
    id: String,
    held_item: String,
    #[serde(default)]
    wishlist: Vec<String>,
    #[serde(default)]
    cash_balance: String,
}

fn load_market(path: &str) -> (Catalog, UserPool) {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let file: MarketFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "catalog": {{ "WATCH-001": "12000", "WATCH-002": "9500" }},
  "users": [
    {{ "id": "U-00001", "held_item": "WATCH-001",
       "wishlist": ["WATCH-002"], "cash_balance": "3600" }}
  ]
}}"#
        );
        process::exit(1);
    });

    let mut catalog = Catalog::new();
    for (model, value) in &file.catalog {
        let value: Decimal = value.parse().unwrap_or_else(|e| {
            eprintln!("Invalid value '{}' for {}: {}", value, model, e);
            process::exit(1);
        });
        catalog.insert(ItemId::new(model), value).unwrap_or_else(|e| {
            eprintln!("Bad catalog entry: {}", e);
            process::exit(1);
        });
    }

    let mut pool = UserPool::new();
    for entry in file.users {
        let cash: Decimal = if entry.cash_balance.is_empty() {
            Decimal::ZERO
        } else {
            entry.cash_balance.parse().unwrap_or_else(|e| {
                eprintln!("Invalid cash balance for {}: {}", entry.id, e);
                process::exit(1);
            })
        };
        pool.admit(
            User::new(UserId::new(&entry.id), ItemId::new(&entry.held_item), cash).with_wishlist(
                entry.wishlist.iter().map(ItemId::new).collect(),
            ),
        );
    }

    (catalog, pool)
}

struct OptionParser<'a> {
    args: &'a [String],
    index: usize,
}

impl<'a> OptionParser<'a> {
    fn new(args: &'a [String]) -> Self {
        Self { args, index: 0 }
    }

    fn next(&mut self) -> Option<&'a str> {
        let arg = self.args.get(self.index)?;
        self.index += 1;
        Some(arg)
    }

    fn value(&mut self, flag: &str) -> String {
        self.next().map(str::to_string).unwrap_or_else(|| {
            eprintln!("{} requires a value", flag);
            process::exit(1);
        })
    }

    fn parsed<T: std::str::FromStr>(&mut self, flag: &str) -> T {
        self.value(flag).parse().unwrap_or_else(|_| {
            eprintln!("{} requires a valid number", flag);
            process::exit(1);
        })
    }
}

fn cmd_match(args: &[String]) {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut parser = OptionParser::new(args);
    while let Some(arg) = parser.next() {
        match arg {
            "--input" => input_path = Some(parser.value("--input")),
            "--format" => format = parser.value("--format"),
            _ => {
                eprintln!("Unknown option: {}", arg);
                process::exit(1);
            }
        }
    }

    let path = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    let (catalog, mut pool) = load_market(&path);
    let config = SimulationConfig::default();

    let record = RoundController::new(&config, &catalog)
        .run(&mut pool, 1)
        .unwrap_or_else(|e| {
            eprintln!("Matching failed: {}", e);
            process::exit(1);
        });

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&record).unwrap());
    } else {
        println!("{}", record);
        for loop_ in &record.loops {
            let participants: Vec<String> =
                loop_.participants.iter().map(|p| p.to_string()).collect();
            println!(
                "  [{:?}] {} loop: {} (efficiency {})",
                loop_.outcome,
                loop_.kind,
                participants.join(" → "),
                loop_.metrics.value_efficiency
            );
            for leg in &loop_.legs {
                println!(
                    "      {} gives {} for {} (cash {})",
                    leg.user, leg.gives_item, leg.receives_item, leg.cash_delta
                );
            }
        }
    }
}

fn cmd_simulate(args: &[String]) {
    let mut market_config = MarketConfig::default();
    let mut sim_config = SimulationConfig::default();
    let mut format = "text".to_string();
    let mut parser = OptionParser::new(args);
    while let Some(arg) = parser.next() {
        match arg {
            "--users" => market_config.initial_users = parser.parsed("--users"),
            "--rounds" => sim_config.max_rounds = parser.parsed("--rounds"),
            "--growth" => market_config.growth_rate = parser.parsed("--growth"),
            "--seed" => market_config.seed = Some(parser.parsed("--seed")),
            "--format" => format = parser.value("--format"),
            _ => {
                eprintln!("Unknown option: {}", arg);
                process::exit(1);
            }
        }
    }

    let market = GrowthMarket::new(market_config);
    let catalog = market.catalog().clone();

    let report = Simulation::new(sim_config, catalog, market)
        .and_then(Simulation::run)
        .unwrap_or_else(|e| {
            eprintln!("Simulation failed: {}", e);
            process::exit(1);
        });

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report).unwrap());
    } else {
        for round in &report.rounds {
            println!("{}", round);
        }
        println!("{}", report);
    }
}

fn cmd_generate(args: &[String]) {
    let mut market_config = MarketConfig::default();
    let mut users = 20usize;
    let mut output_path: Option<String> = None;
    let mut parser = OptionParser::new(args);
    while let Some(arg) = parser.next() {
        match arg {
            "--users" => users = parser.parsed("--users"),
            "--models" => market_config.model_count = parser.parsed("--models"),
            "--seed" => market_config.seed = Some(parser.parsed("--seed")),
            "--output" => output_path = Some(parser.value("--output")),
            _ => {
                eprintln!("Unknown option: {}", arg);
                process::exit(1);
            }
        }
    }

    market_config.initial_users = users;
    let mut market = GrowthMarket::new(market_config);
    let entrants = market.users_for_round(1, &UserPool::new());

    let file = MarketFile {
        catalog: market
            .catalog()
            .entries()
            .map(|(model, value)| (model.to_string(), value.to_string()))
            .collect(),
        users: entrants
            .iter()
            .map(|u| UserEntry {
                id: u.id().to_string(),
                held_item: u
                    .held_item()
                    .map(|i| i.to_string())
                    .unwrap_or_default(),
                wishlist: u.wishlist().iter().map(|w| w.to_string()).collect(),
                cash_balance: u.cash_balance().to_string(),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&file).unwrap();

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!("Generated {} users → {}", entrants.len(), path);
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "match" => cmd_match(rest),
        "simulate" => cmd_simulate(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
