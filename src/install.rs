use clap::ValueEnum;
use color_eyre::eyre::{eyre, Result, WrapErr};
use color_eyre::Help;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::env;

/// Key this server is registered under in each client's `mcpServers` map.
pub const SERVER_ENTRY_NAME: &str = "BVtkNodes Importer";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InstallClient {
    Claude,
    Cursor,
    LmStudio,
    All,
}

impl InstallClient {
    fn label(self) -> &'static str {
        match self {
            InstallClient::Claude => "Claude",
            InstallClient::Cursor => "Cursor",
            InstallClient::LmStudio => "LM Studio",
            InstallClient::All => "all supported clients",
        }
    }

    fn config_path(self) -> Result<PathBuf> {
        match self {
            InstallClient::Claude => get_claude_config(),
            InstallClient::Cursor => get_cursor_config(),
            InstallClient::LmStudio => get_lm_studio_config(),
            InstallClient::All => Err(eyre!("`all` has no single config file")),
        }
    }
}

const SINGLE_CLIENTS: [InstallClient; 3] = [
    InstallClient::Claude,
    InstallClient::Cursor,
    InstallClient::LmStudio,
];

fn home_dir() -> Result<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or_else(|| eyre!("Could not determine HOME directory"))
}

// returns OS dependant claude_desktop_config.json path
fn get_claude_config() -> Result<PathBuf> {
    if cfg!(target_os = "macos") {
        Ok(home_dir()?.join("Library/Application Support/Claude/claude_desktop_config.json"))
    } else if cfg!(target_os = "windows") {
        let app_data =
            env::var_os("APPDATA").ok_or_else(|| eyre!("Could not find APPDATA directory"))?;
        Ok(Path::new(&app_data)
            .join("Claude")
            .join("claude_desktop_config.json"))
    } else {
        Ok(home_dir()?
            .join(".config")
            .join("Claude")
            .join("claude_desktop_config.json"))
    }
}

fn get_cursor_config() -> Result<PathBuf> {
    Ok(home_dir()?.join(".cursor").join("mcp.json"))
}

fn get_lm_studio_config() -> Result<PathBuf> {
    if cfg!(target_os = "macos") {
        Ok(home_dir()?
            .join("Library")
            .join("Application Support")
            .join("LM Studio")
            .join("mcpServers.json"))
    } else if cfg!(target_os = "windows") {
        let app_data =
            env::var_os("APPDATA").ok_or_else(|| eyre!("Could not find APPDATA directory"))?;
        Ok(Path::new(&app_data)
            .join("LM Studio")
            .join("mcpServers.json"))
    } else {
        Ok(home_dir()?
            .join(".config")
            .join("LM Studio")
            .join("mcpServers.json"))
    }
}

/// Adds (or replaces) this server's entry in an MCP client config file,
/// leaving every other entry untouched.
pub fn install_to_config(config_path: &Path, exe_path: &Path, name: &str) -> Result<()> {
    let mut config: serde_json::Map<String, Value> = if config_path.exists() {
        let config_file = File::open(config_path)
            .wrap_err_with(|| format!("Could not read {name} config file {}", config_path.display()))?;
        serde_json::from_reader(BufReader::new(config_file))
            .wrap_err_with(|| format!("{name} config file {} is not a JSON object", config_path.display()))?
    } else {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Could not create {name} config directory {}", parent.display())
            })?;
        }
        serde_json::Map::new()
    };

    if !matches!(config.get("mcpServers"), Some(Value::Object(_))) {
        config.insert("mcpServers".to_string(), json!({}));
    }

    config["mcpServers"][SERVER_ENTRY_NAME] = json!({
      "command": exe_path,
      "args": [
        "server"
      ]
    });

    let mut file = File::create(config_path)
        .wrap_err_with(|| format!("Could not write {name} config file {}", config_path.display()))?;
    file.write_all(serde_json::to_string_pretty(&config)?.as_bytes())?;

    println!("Registered BVtkNodes MCP server in {name} config {}", config_path.display());
    Ok(())
}

fn install_client(client: InstallClient, exe_path: &Path) -> Result<()> {
    install_to_config(&client.config_path()?, exe_path, client.label())
}

fn install_all(exe_path: &Path) -> Result<()> {
    let mut errors = vec![];
    let successes: Vec<_> = SINGLE_CLIENTS
        .into_iter()
        .filter_map(|client| {
            install_client(client, exe_path)
                .map(|()| client.label())
                .map_err(|e| errors.push(e))
                .ok()
        })
        .collect();

    if successes.is_empty() {
        let error = errors.into_iter().fold(
            eyre!("Failed to install to any supported MCP clients"),
            |report, e| report.note(e),
        );
        return Err(error);
    }

    println!(
        "\nBVtkNodes MCP server is ready. Restart your MCP clients to pick it up.\n\nMCP clients set up:\n{}",
        successes.join("\n")
    );
    Ok(())
}

fn prompt_for_client() -> Result<Option<InstallClient>> {
    use dialoguer::{theme::ColorfulTheme, Select};

    const OPTIONS: [(InstallClient, &str); 4] = [
        (InstallClient::All, "All supported MCP clients"),
        (InstallClient::Claude, "Claude"),
        (InstallClient::Cursor, "Cursor"),
        (InstallClient::LmStudio, "LM Studio"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Register the BVtkNodes MCP server with")
        .items(&OPTIONS.map(|(_, label)| label))
        .default(0)
        .interact_opt()?;
    Ok(selection.map(|index| OPTIONS[index].0))
}

pub fn install(client: Option<InstallClient>) -> Result<()> {
    let client = match client {
        Some(client) => client,
        None => match prompt_for_client()? {
            Some(client) => client,
            None => {
                println!("Exiting installer.");
                return Ok(());
            }
        },
    };

    let exe_path = env::current_exe().wrap_err("Could not locate this executable")?;
    match client {
        InstallClient::All => install_all(&exe_path),
        single => install_client(single, &exe_path),
    }
}
