pub mod models {
    pub mod fenix;
}

pub mod client;
pub mod config;
pub mod registry;
pub mod services {
    pub mod commands;
    pub mod poll;
    pub mod readings;
    pub mod setup;
}

use crate::client::FenixClient;
use crate::config::Config;
use crate::models::fenix::DeviceId;
use crate::registry::ClientRegistry;
use crate::services::{commands, poll, setup};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug)]
enum CliCommand {
    /// One-shot: set a device's mode, then exit.
    SetMode { device: DeviceId, label: String },
    /// One-shot: boost a device for N minutes, then exit.
    Boost { device: DeviceId, minutes: u32 },
}

#[derive(Debug, Default)]
struct CliOptions {
    env_file: Option<PathBuf>,
    command: Option<CliCommand>,
}

fn run(command: Option<CliCommand>) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (smarthome_id={}, poll_interval={}s, lang={})",
        cfg.smarthome_id,
        cfg.poll_interval.as_secs(),
        cfg.lang
    );

    // 2) Build the client and register it under its account id
    let client = Arc::new(FenixClient::new(
        cfg.email.clone(),
        cfg.password.clone(),
        cfg.smarthome_id.clone(),
        cfg.lang.clone(),
    ));
    let registry = ClientRegistry::new();
    registry.insert(cfg.smarthome_id.clone(), Arc::clone(&client));

    // 3) Validate credentials and smarthome id before doing anything else
    let account = setup::validate_account(&client).map_err(|e| format!("account validation failed: {}", e))?;
    info!("Validated {} ({} zone(s))", account.title, account.zones_count);

    // 4) One-shot command, or the polling loop
    match command {
        Some(CliCommand::SetMode { device, label }) => {
            let accepted = commands::set_zone_mode(&registry, &cfg.smarthome_id, &device, &label)
                .map_err(|e| format!("set-mode failed: {}", e))?;
            if !accepted {
                return Err(format!("backend rejected mode change for device {}", device.0));
            }
            info!("Device {} set to {}", device.0, label);
            Ok(())
        }
        Some(CliCommand::Boost { device, minutes }) => {
            let accepted = commands::set_zone_boost(&registry, &cfg.smarthome_id, &device, minutes)
                .map_err(|e| format!("boost failed: {}", e))?;
            if !accepted {
                return Err(format!("backend rejected boost for device {}", device.0));
            }
            info!("Boost enabled on device {} for {} minutes", device.0, minutes);
            Ok(())
        }
        None => {
            info!("Starting poll loop (interval={}s)", cfg.poll_interval.as_secs());
            poll::run_loop(&client, cfg.poll_interval);
            Ok(())
        }
    }
}

fn parse_cli() -> Result<CliOptions, String> {
    let mut args = std::env::args_os();
    args.next(); // skip program name

    let mut opts = CliOptions::default();

    while let Some(arg) = args.next() {
        let arg = arg
            .to_str()
            .ok_or_else(|| "argument contains invalid UTF-8".to_string())?
            .to_string();
        match arg.as_str() {
            "--env-file" => {
                if opts.env_file.is_some() {
                    return Err("`--env-file` provided more than once".to_string());
                }
                let value = args
                    .next()
                    .ok_or_else(|| "`--env-file` requires a path argument".to_string())?;
                opts.env_file = Some(PathBuf::from(value));
            }
            "--set-mode" => {
                if opts.command.is_some() {
                    return Err("only one command may be given".to_string());
                }
                let value = args
                    .next()
                    .and_then(|v| v.to_str().map(str::to_string))
                    .ok_or_else(|| "`--set-mode` requires DEVICE=MODE".to_string())?;
                let (device, label) = value
                    .split_once('=')
                    .ok_or_else(|| "`--set-mode` requires DEVICE=MODE".to_string())?;
                opts.command = Some(CliCommand::SetMode {
                    device: DeviceId(device.to_string()),
                    label: label.to_string(),
                });
            }
            "--boost" => {
                if opts.command.is_some() {
                    return Err("only one command may be given".to_string());
                }
                let value = args
                    .next()
                    .and_then(|v| v.to_str().map(str::to_string))
                    .ok_or_else(|| "`--boost` requires DEVICE or DEVICE=MINUTES".to_string())?;
                let (device, minutes) = match value.split_once('=') {
                    Some((device, minutes)) => {
                        let minutes = minutes
                            .parse::<u32>()
                            .map_err(|_| format!("invalid boost duration: {}", minutes))?;
                        (device.to_string(), minutes)
                    }
                    None => (value, commands::DEFAULT_BOOST_MINUTES),
                };
                opts.command = Some(CliCommand::Boost {
                    device: DeviceId(device),
                    minutes,
                });
            }
            "--" => break,
            other => return Err(format!("unrecognised argument: {}", other)),
        }
    }

    Ok(opts)
}

/// Load KEY=VALUE pairs from a .env file. Process-level environment wins over
/// file values; quoted values are unwrapped, `#` starts a comment.
fn load_env_file(path: &Path) -> Result<(), String> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open(path).map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
    let reader = BufReader::new(file);

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("failed to read {} at line {}: {}", path.display(), index + 1, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("{}:{}: missing '=' in assignment", path.display(), index + 1))?;
        let key = key.trim();
        if key.is_empty() || key.chars().any(|c| c.is_whitespace()) {
            return Err(format!("{}:{}: invalid variable name", path.display(), index + 1));
        }
        let value = unquote_env_value(value.trim());
        if std::env::var_os(key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }

    Ok(())
}

fn unquote_env_value(raw: &str) -> String {
    let stripped = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    match stripped {
        Some(inner) => inner.to_string(),
        // Unquoted values end at an inline comment.
        None => raw.split('#').next().unwrap_or_default().trim_end().to_string(),
    }
}

fn configure_env(opts: &CliOptions) -> Result<Option<PathBuf>, String> {
    if let Some(path) = opts.env_file.as_ref() {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        load_env_file(path)?;
        return Ok(Some(path.clone()));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        load_env_file(&default_path)?;
        Ok(Some(default_path))
    } else {
        Ok(None)
    }
}

fn main() {
    let opts = match parse_cli() {
        Ok(opts) => opts,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };
    let loaded_env = match configure_env(&opts) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(path) = loaded_env.as_ref() {
        info!("Environment loaded from .env file: {}", path.display());
    }

    info!(
        "fenix-bridge {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(opts.command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
