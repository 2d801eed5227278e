//! First-run configuration for the daemon.
//!
//! `configure` merges an existing `MM2.json`, `MM2_*` environment
//! variables and built-in defaults, fills in a generated rpc password and
//! seed phrase when neither source has one, and writes `MM2.json`, the
//! `rpc` file and the `MM2_USERPASS` line of `.env`.

pub mod secrets;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use secrets::{generate_passphrase, generate_rpc_password, write_secret_file, MIN_PASSWORD_LEN};

pub const CONFIG_FILE: &str = "MM2.json";
pub const RPC_FILE: &str = "rpc";
pub const ENV_FILE: &str = ".env";

pub const DEFAULT_RPC_PORT: u16 = 7783;
pub const DEFAULT_RPC_IP: &str = "127.0.0.1";
pub const DEFAULT_GUI: &str = "dragonhound-lightning-tui";
pub const DEFAULT_SEEDNODES: [&str; 3] = ["80.82.76.214", "89.248.168.39", "89.248.173.231"];
pub const DEFAULT_NETID: u32 = 7777;
pub const DEFAULT_METRICS: u32 = 300;

const PASSWORD_KEY: &str = "rpc_password";
const PASSPHRASE_KEY: &str = "passphrase";

#[derive(Debug, Clone, Copy)]
enum Kind {
    Text,
    Integer,
    Flag,
    List,
}

/// `MM2.json` key, the variable overriding it, and how the value parses.
const FIELDS: [(&str, &str, Kind); 10] = [
    ("gui", "MM2_GUI", Kind::Text),
    ("netid", "MM2_NETID", Kind::Integer),
    ("i_am_seed", "MM2_I_AM_SEED", Kind::Flag),
    ("rpc_local_only", "MM2_RPC_LOCAL_ONLY", Kind::Flag),
    ("rpcport", "MM2_RPC_PORT", Kind::Integer),
    ("rpcip", "MM2_RPC_IP", Kind::Text),
    (PASSWORD_KEY, "MM2_USERPASS", Kind::Text),
    (PASSPHRASE_KEY, "MM2_SEED", Kind::Text),
    ("seednodes", "MM2_SEEDNODES", Kind::List),
    ("metrics", "MM2_METRICS", Kind::Integer),
];

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(
        "passphrase in {CONFIG_FILE} and MM2_SEED differ; change one of them (nothing was written)"
    )]
    SeedConflict,
    #[error("{var}={value:?} is not a valid value")]
    InvalidEnv { var: &'static str, value: String },
    #[error("{path:?} is not usable: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What `configure` produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub config: Map<String, Value>,
    pub written: Vec<PathBuf>,
    pub generated_password: bool,
    pub generated_passphrase: bool,
}

/// Defaults for every key; the secrets have none.
pub fn defaults() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("gui".into(), json!(DEFAULT_GUI));
    map.insert("netid".into(), json!(DEFAULT_NETID));
    map.insert("i_am_seed".into(), json!(false));
    map.insert("rpc_local_only".into(), json!(true));
    map.insert("rpcport".into(), json!(DEFAULT_RPC_PORT));
    map.insert("rpcip".into(), json!(DEFAULT_RPC_IP));
    map.insert(PASSWORD_KEY.into(), Value::Null);
    map.insert(PASSPHRASE_KEY.into(), Value::Null);
    map.insert("seednodes".into(), json!(DEFAULT_SEEDNODES));
    map.insert("metrics".into(), json!(DEFAULT_METRICS));
    map
}

/// Defaults with any non-blank `MM2_*` variable applied on top.
pub fn from_env<F>(lookup: F) -> Result<Map<String, Value>, BootstrapError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut map = defaults();
    for (key, var, kind) in FIELDS {
        let Some(raw) = lookup(var) else { continue };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let invalid = || BootstrapError::InvalidEnv {
            var,
            value: raw.to_owned(),
        };
        let value = match kind {
            Kind::Text => json!(raw),
            Kind::Integer => json!(raw.parse::<u64>().map_err(|_| invalid())?),
            Kind::Flag => json!(parse_flag(raw).ok_or_else(invalid)?),
            Kind::List => json!(raw.split_whitespace().collect::<Vec<_>>()),
        };
        map.insert(key.to_owned(), value);
    }
    Ok(map)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Per key: the persisted non-null value, else the environment's, else a
/// generated secret. Keys only present in `persisted` are kept.
pub fn merge(
    persisted: &Map<String, Value>,
    env: &Map<String, Value>,
) -> Result<Outcome, BootstrapError> {
    let stored_seed = persisted.get(PASSPHRASE_KEY).filter(|v| !v.is_null());
    let env_seed = env.get(PASSPHRASE_KEY).filter(|v| !v.is_null());
    if let (Some(stored), Some(from_env)) = (stored_seed, env_seed) {
        if stored != from_env {
            return Err(BootstrapError::SeedConflict);
        }
    }

    let mut config = persisted.clone();
    let mut generated_password = false;
    let mut generated_passphrase = false;
    for (key, _, _) in FIELDS {
        if config.get(key).is_some_and(|v| !v.is_null()) {
            continue;
        }
        let value = match env.get(key).filter(|v| !v.is_null()) {
            Some(value) => value.clone(),
            None if key == PASSWORD_KEY => {
                generated_password = true;
                json!(generate_rpc_password(MIN_PASSWORD_LEN))
            }
            None if key == PASSPHRASE_KEY => {
                generated_passphrase = true;
                json!(generate_passphrase())
            }
            None => continue,
        };
        config.insert(key.to_owned(), value);
    }

    Ok(Outcome {
        config,
        written: Vec::new(),
        generated_password,
        generated_passphrase,
    })
}

/// Run the whole bootstrap inside `dir`. A seed conflict returns before
/// any file is touched.
pub fn configure<F>(dir: &Path, lookup: F) -> Result<Outcome, BootstrapError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_path = dir.join(CONFIG_FILE);
    let persisted = read_config(&config_path)?;
    let env = from_env(lookup)?;
    let mut outcome = merge(&persisted, &env)?;

    let userpass = outcome
        .config
        .get(PASSWORD_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| BootstrapError::InvalidConfig {
            path: config_path.clone(),
            reason: format!("{PASSWORD_KEY} must be a string"),
        })?
        .to_owned();
    let rpc = rpc_file_contents(&outcome.config, &userpass);

    let pretty = serde_json::to_string_pretty(&outcome.config).map_err(|err| {
        BootstrapError::InvalidConfig {
            path: config_path.clone(),
            reason: err.to_string(),
        }
    })?;
    write(&config_path, &format!("{pretty}\n"))?;
    info!(path = %config_path.display(), "daemon config written");

    let rpc_path = dir.join(RPC_FILE);
    write(&rpc_path, &rpc)?;
    info!(path = %rpc_path.display(), "rpc file written");

    let env_path = dir.join(ENV_FILE);
    let existing = match fs::read_to_string(&env_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(BootstrapError::Io {
                path: env_path,
                source,
            });
        }
    };
    write(&env_path, &with_userpass(&existing, &userpass))?;
    info!(path = %env_path.display(), "MM2_USERPASS stored in env file");

    warn!(
        dir = %dir.display(),
        "rpc password and seed phrase are stored in plaintext; keep these files private"
    );
    if outcome.generated_passphrase {
        warn!("a new seed phrase was generated; back it up from {CONFIG_FILE}");
    }

    outcome.written = vec![config_path, rpc_path, env_path];
    Ok(outcome)
}

fn read_config(path: &Path) -> Result<Map<String, Value>, BootstrapError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(BootstrapError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    match serde_json::from_str(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(BootstrapError::InvalidConfig {
            path: path.to_path_buf(),
            reason: "expected a JSON object".into(),
        }),
        Err(err) => Err(BootstrapError::InvalidConfig {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }),
    }
}

fn write(path: &Path, contents: &str) -> Result<(), BootstrapError> {
    write_secret_file(path, contents).map_err(|source| BootstrapError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn rpc_file_contents(config: &Map<String, Value>, userpass: &str) -> String {
    let rpcip = config
        .get("rpcip")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_RPC_IP);
    let rpcport = config
        .get("rpcport")
        .and_then(Value::as_u64)
        .unwrap_or(u64::from(DEFAULT_RPC_PORT));
    format!("userpass=\"{userpass}\"\nrpcip=\"{rpcip}\"\nrpcport={rpcport}\n")
}

/// `existing` with every `MM2_USERPASS` assignment replaced by one line.
fn with_userpass(existing: &str, userpass: &str) -> String {
    let mut out = String::new();
    for line in existing.lines() {
        let assignment = line.trim_start();
        let assignment = assignment.strip_prefix("export ").unwrap_or(assignment);
        if assignment.trim_start().starts_with("MM2_USERPASS=") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&format!("MM2_USERPASS=\"{userpass}\"\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn fresh_directory_gets_generated_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = configure(dir.path(), env(&[])).unwrap();
        assert!(outcome.generated_password);
        assert!(outcome.generated_passphrase);
        assert_eq!(outcome.written.len(), 3);

        let written: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap())
                .unwrap();
        assert_eq!(written["rpcport"], 7783);
        assert_eq!(written["netid"], 7777);
        assert_eq!(written["rpc_local_only"], true);
        assert_eq!(written["seednodes"].as_array().unwrap().len(), 3);
        let password = written["rpc_password"].as_str().unwrap();
        assert!(password.len() >= MIN_PASSWORD_LEN);

        let rpc = fs::read_to_string(dir.path().join(RPC_FILE)).unwrap();
        assert_eq!(
            rpc,
            format!("userpass=\"{password}\"\nrpcip=\"127.0.0.1\"\nrpcport=7783\n")
        );
        let dotenv = fs::read_to_string(dir.path().join(ENV_FILE)).unwrap();
        assert_eq!(dotenv, format!("MM2_USERPASS=\"{password}\"\n"));
    }

    #[test]
    fn seed_conflict_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let original = r#"{"passphrase":"alpha words","rpc_password":"Abc123@@Abc123@@"}"#;
        fs::write(dir.path().join(CONFIG_FILE), original).unwrap();

        let err = configure(dir.path(), env(&[("MM2_SEED", "beta words")])).unwrap_err();
        assert!(matches!(err, BootstrapError::SeedConflict));
        assert_eq!(
            fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap(),
            original
        );
        assert!(!dir.path().join(RPC_FILE).exists());
        assert!(!dir.path().join(ENV_FILE).exists());
    }

    #[test]
    fn persisted_values_win_over_environment() {
        let persisted = json!({ "rpcport": 8000, "passphrase": null, "custom": "kept" });
        let env_map = from_env(env(&[
            ("MM2_RPC_PORT", "9000"),
            ("MM2_SEED", "from env"),
            ("MM2_USERPASS", "EnvPass-1234567890"),
        ]))
        .unwrap();
        let outcome = merge(persisted.as_object().unwrap(), &env_map).unwrap();
        assert_eq!(outcome.config["rpcport"], 8000);
        assert_eq!(outcome.config["passphrase"], "from env");
        assert_eq!(outcome.config["rpc_password"], "EnvPass-1234567890");
        assert_eq!(outcome.config["custom"], "kept");
        assert!(!outcome.generated_password);
        assert!(!outcome.generated_passphrase);
    }

    #[test]
    fn environment_parsing() {
        let map = from_env(env(&[
            ("MM2_SEEDNODES", "1.1.1.1  2.2.2.2"),
            ("MM2_I_AM_SEED", "True"),
            ("MM2_GUI", "  "),
        ]))
        .unwrap();
        assert_eq!(map["seednodes"], json!(["1.1.1.1", "2.2.2.2"]));
        assert_eq!(map["i_am_seed"], true);
        assert_eq!(map["gui"], DEFAULT_GUI);

        let err = from_env(env(&[("MM2_RPC_PORT", "seventy")])).unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::InvalidEnv { var: "MM2_RPC_PORT", .. }
        ));
    }

    #[test]
    fn env_file_userpass_is_replaced() {
        let existing = "DEX_URL=http://127.0.0.1:7783\nMM2_USERPASS=\"old\"\nexport MM2_USERPASS=older\n";
        assert_eq!(
            with_userpass(existing, "new"),
            "DEX_URL=http://127.0.0.1:7783\nMM2_USERPASS=\"new\"\n"
        );
    }

    #[test]
    fn rerun_keeps_existing_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let first = configure(dir.path(), env(&[])).unwrap();
        let second = configure(dir.path(), env(&[])).unwrap();
        assert_eq!(first.config["passphrase"], second.config["passphrase"]);
        assert_eq!(first.config["rpc_password"], second.config["rpc_password"]);
        assert!(!second.generated_password);
        let dotenv = fs::read_to_string(dir.path().join(ENV_FILE)).unwrap();
        assert_eq!(dotenv.matches("MM2_USERPASS=").count(), 1);
    }
}
