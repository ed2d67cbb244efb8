use mineops_wizard::config::AppConfig;
use mineops_wizard::entities::EntityKind;
use std::path::PathBuf;

fn flag_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    args.iter().enumerate().find_map(|(i, a)| {
        if let Some(v) = a.strip_prefix(&prefix) {
            Some(v.to_string())
        } else if a == name {
            args.get(i + 1).cloned()
        } else {
            None
        }
    })
}

fn parse_entity(raw: Option<&str>) -> EntityKind {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => EntityKind::Driver,
        Some(v) => v.parse().unwrap_or_else(|e: String| {
            eprintln!("{}", e);
            std::process::exit(2);
        }),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let config_path = flag_value(&args, "--config").map(PathBuf::from);
    let cfg = match AppConfig::load(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if args.iter().any(|a| a == "--print-config") {
        match cfg.to_toml() {
            Ok(text) => print!("{}", text),
            Err(e) => {
                eprintln!("{:#}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Drives every entity wizard to confirmation with sample data; exits 0/1.
    if args.iter().any(|a| a == "--wizard-contract-smoke") {
        if let Err(e) = mineops_wizard::run_wizard_contract_smoke(&cfg) {
            eprintln!("Contract smoke failed: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Renders a single frame for an entity and exits.
    // Usage: --tui-smoke or --tui-smoke=driver|miner|incident|mill|user
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        let entity = parse_entity(arg.split_once('=').map(|(_, v)| v));
        if let Err(e) = mineops_wizard::run_tui_smoke(entity, &cfg) {
            eprintln!("TUI smoke failed: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    let entity = parse_entity(flag_value(&args, "--entity").as_deref());
    let offline = args.iter().any(|a| a == "--offline");
    if let Err(e) = mineops_wizard::run_tui(entity, &cfg, offline) {
        eprintln!("Wizard error: {:#}", e);
        std::process::exit(1);
    }
}
