use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use apex_mind::capability::CapabilityManifest;
use apex_mind::config::DEFAULT_CONFIG_PATH;
use apex_mind::mission::{MissionOutcome, MissionResult};
use apex_mind::{AgentRuntime, Config, ExecuteOptions};

fn print_help() {
    println!(
        "\
apex v{}

Runs free-text missions under per-skill capability manifests.

USAGE:
    apex [--config PATH] <COMMAND>

COMMANDS:
    execute [--dry-run] [--analyze] [--data TEXT] [--manifest FILE] <MISSION>
                                   Run a mission and print the JSON outcome
    validate <MISSION>             Tell whether a mission would be allowed
    manifest generate              Print a manifest template
    manifest show <SKILL>          Print a skill's manifest (created deny-all if missing)
    manifest validate <FILE>       Check a manifest file for required sections
    manifest set <SKILL> <FLAG>=<true|false>...
                                   Set network/gpu/sensors/camera flags

OPTIONS:
    --config PATH    TOML configuration file [default: {DEFAULT_CONFIG_PATH}]
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG         Log level filter for tracing
                     (e.g. debug, apex_mind=debug,warn)
    YOU_API_KEY      API key for the You.com index API
    BING_API_KEY     API key for Bing Web Search

EXAMPLES:
    apex execute \"find rust programming language\"
    apex execute --data \"hello\" \"write C:\\tmp\\note.txt\"
    apex validate \"read /data/report.txt\"
    RUST_LOG=debug apex execute \"read file: notes.txt\"",
        env!("CARGO_PKG_VERSION"),
    );
}

#[derive(Debug)]
enum Command {
    Execute {
        mission: String,
        options: ExecuteOptions,
        analyze: bool,
    },
    Validate(String),
    ManifestGenerate,
    ManifestShow(String),
    ManifestValidate(PathBuf),
    ManifestSet {
        skill: String,
        flags: HashMap<String, bool>,
    },
    Help,
    Version,
}

#[derive(Debug)]
struct Cli {
    config_path: String,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Cli> {
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();
    let mut rest = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                return Ok(Cli {
                    config_path,
                    command: Command::Help,
                })
            }
            "--version" | "-V" => {
                return Ok(Cli {
                    config_path,
                    command: Command::Version,
                })
            }
            "--config" => {
                config_path = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a path"))?
                    .clone();
            }
            _ => rest.push(arg.clone()),
        }
    }

    let Some((name, tail)) = rest.split_first() else {
        bail!("missing command (try --help)");
    };

    let command = match name.as_str() {
        "execute" => parse_execute(tail)?,
        "validate" => Command::Validate(join_mission(tail)?),
        "manifest" => parse_manifest(tail)?,
        other => bail!("unknown command: {other} (try --help)"),
    };
    Ok(Cli {
        config_path,
        command,
    })
}

fn parse_execute(args: &[String]) -> Result<Command> {
    let mut options = ExecuteOptions::default();
    let mut analyze = false;
    let mut words = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dry-run" => options.dry_run = true,
            "--analyze" => analyze = true,
            "--data" => {
                options.data = Some(
                    iter.next()
                        .ok_or_else(|| anyhow!("--data requires a value"))?
                        .clone(),
                )
            }
            "--manifest" => {
                options.manifest_override = Some(PathBuf::from(
                    iter.next()
                        .ok_or_else(|| anyhow!("--manifest requires a file"))?,
                ))
            }
            _ => words.push(arg.clone()),
        }
    }

    Ok(Command::Execute {
        mission: join_mission(&words)?,
        options,
        analyze,
    })
}

fn parse_manifest(args: &[String]) -> Result<Command> {
    match args {
        [cmd] if cmd == "generate" => Ok(Command::ManifestGenerate),
        [cmd, skill] if cmd == "show" => Ok(Command::ManifestShow(skill.clone())),
        [cmd, file] if cmd == "validate" => Ok(Command::ManifestValidate(PathBuf::from(file))),
        [cmd, skill, assignments @ ..] if cmd == "set" && !assignments.is_empty() => {
            let mut flags = HashMap::new();
            for assignment in assignments {
                let (key, value) = assignment
                    .split_once('=')
                    .ok_or_else(|| anyhow!("expected FLAG=true|false, got '{assignment}'"))?;
                let value: bool = value
                    .parse()
                    .map_err(|_| anyhow!("'{value}' is not true or false"))?;
                flags.insert(key.to_string(), value);
            }
            Ok(Command::ManifestSet {
                skill: skill.clone(),
                flags,
            })
        }
        _ => bail!("usage: apex manifest generate | show <SKILL> | validate <FILE> | set <SKILL> <FLAG>=<BOOL>..."),
    }
}

fn join_mission(words: &[String]) -> Result<String> {
    let mission = words.join(" ");
    if mission.trim().is_empty() {
        bail!("missing mission text");
    }
    Ok(mission)
}

fn print_outcome(outcome: &MissionOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    match cli.command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("apex v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging (RUST_LOG=debug for debug mode). Logs go to
    // stderr so stdout carries only command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apex=info,apex_mind=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Loading configuration from {}", cli.config_path);
    let config = Config::load_or_default(&cli.config_path)?;

    match cli.command {
        Command::ManifestGenerate => {
            println!("{}", CapabilityManifest::template().to_json_pretty()?);
        }
        Command::ManifestValidate(path) => {
            let content = std::fs::read_to_string(&path)?;
            match CapabilityManifest::check_sections(&content) {
                Ok(()) => println!("Manifest is valid: {}", path.display()),
                Err(e) => {
                    println!("Manifest is invalid: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::ManifestShow(skill) => {
            let runtime = AgentRuntime::from_config(&config)?;
            let manifest = runtime.manifests().load(&skill)?;
            println!("{}", manifest.to_json_pretty()?);
        }
        Command::ManifestSet { skill, flags } => {
            let runtime = AgentRuntime::from_config(&config)?;
            let manifest = runtime.manifests().update_flags(&skill, &flags)?;
            println!("{}", manifest.to_json_pretty()?);
        }
        Command::Validate(mission) => {
            let runtime = AgentRuntime::from_config(&config)?;
            println!("{}", runtime.validate_mission(&mission));
        }
        Command::Execute {
            mission,
            options,
            analyze,
        } => {
            let runtime = AgentRuntime::from_config(&config)?;
            let outcome = runtime.execute(&mission, &options).await;
            print_outcome(&outcome)?;

            if analyze {
                if let MissionOutcome::Result(ref result) = outcome {
                    if !matches!(result, MissionResult::DryRun { .. }) {
                        print_outcome(&runtime.analyze(&result.text()).await)?;
                    }
                }
            }
            if outcome.is_error() {
                std::process::exit(1);
            }
        }
        Command::Help | Command::Version => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_execute_with_flags() {
        let cli = parse_args(&args(&[
            "--config",
            "/etc/apex.toml",
            "execute",
            "--dry-run",
            "--data",
            "hello",
            "write",
            "/tmp/a.txt",
        ]))
        .unwrap();
        assert_eq!(cli.config_path, "/etc/apex.toml");
        match cli.command {
            Command::Execute {
                mission,
                options,
                analyze,
            } => {
                assert_eq!(mission, "write /tmp/a.txt");
                assert!(options.dry_run);
                assert_eq!(options.data.as_deref(), Some("hello"));
                assert!(!analyze);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_default_config_path() {
        let cli = parse_args(&args(&["validate", "find cats"])).unwrap();
        assert_eq!(cli.config_path, DEFAULT_CONFIG_PATH);
        assert!(matches!(cli.command, Command::Validate(ref m) if m == "find cats"));
    }

    #[test]
    fn test_manifest_commands() {
        assert!(matches!(
            parse_args(&args(&["manifest", "generate"])).unwrap().command,
            Command::ManifestGenerate
        ));
        assert!(matches!(
            parse_args(&args(&["manifest", "show", "WebSearch"])).unwrap().command,
            Command::ManifestShow(ref s) if s == "WebSearch"
        ));
        match parse_args(&args(&["manifest", "set", "WebSearch", "network=true", "gpu=false"]))
            .unwrap()
            .command
        {
            Command::ManifestSet { skill, flags } => {
                assert_eq!(skill, "WebSearch");
                assert_eq!(flags.get("network"), Some(&true));
                assert_eq!(flags.get("gpu"), Some(&false));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(parse_args(&args(&["manifest", "set", "WebSearch", "network=maybe"])).is_err());
    }

    #[test]
    fn test_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["execute"])).is_err());
        assert!(parse_args(&args(&["launch", "x"])).is_err());
        assert!(parse_args(&args(&["--config"])).is_err());
    }

    #[test]
    fn test_help_and_version_win() {
        assert!(matches!(
            parse_args(&args(&["execute", "--help"])).unwrap().command,
            Command::Help
        ));
        assert!(matches!(
            parse_args(&args(&["-V"])).unwrap().command,
            Command::Version
        ));
    }
}
