//! CLI command implementations

use anyhow::Result;
use dialoguer::Input;
use serde_json::json;
use std::fs;

use crate::auth::{LoginRequest, LoginType, SessionController};
use crate::cli::{
    error, format_modules, format_phase, format_remaining, info, print_user_table, success, warn,
    OutputFormat,
};
use crate::config::{self, loader::CONFIG_FILENAME, Config};
use crate::devserver;

/// Initialize a new mcn-auth.toml configuration file
pub async fn init() -> Result<()> {
    let config_path = std::path::Path::new(CONFIG_FILENAME);

    if config_path.exists() {
        warn(&format!("{} already exists", CONFIG_FILENAME));
        return Ok(());
    }

    fs::write(config_path, config::loader::default_config_content())?;

    success(&format!("Created {}", CONFIG_FILENAME));
    info("Run 'mcn-auth serve' for a local auth server, then 'mcn-auth login'");

    Ok(())
}

/// Sign in with a phone number and SMS code
pub async fn login(
    phone: Option<String>,
    code: Option<String>,
    login_type: LoginType,
    no_remember: bool,
) -> Result<()> {
    let config = load_config()?;
    let controller = SessionController::from_config(&config)?;

    let phone = match phone {
        Some(phone) => phone,
        None => Input::<String>::new().with_prompt("Phone").interact_text()?,
    };
    let sms_code = match code {
        Some(code) => code,
        None => Input::<String>::new()
            .with_prompt("SMS code")
            .interact_text()?,
    };

    let request = LoginRequest {
        phone,
        sms_code,
        login_type,
        remember_me: !no_remember,
    };

    match controller.login(&request).await {
        Ok(user) => {
            success(&format!("Signed in as {} ({})", user.name, login_type));
            print_user_table(&user);
            if no_remember {
                warn("Session kept in memory only; it ends when this command exits");
            }
            controller.guard().stop_token_auto_refresh();
            Ok(())
        }
        Err(e) => {
            error(&format!("Login failed: {}", e));
            Err(e.into())
        }
    }
}

/// Sign out and clear the stored session
pub async fn logout() -> Result<()> {
    let config = load_config()?;
    let controller = SessionController::from_config(&config)?;

    if controller.access_token().is_none() {
        info("Not signed in");
        return Ok(());
    }

    controller.logout().await;
    success("Signed out");
    Ok(())
}

/// Show the current session state
pub async fn status(format: OutputFormat) -> Result<()> {
    let controller = restore_session().await?;
    let state = controller.state();
    let store = controller.token_store();

    match format {
        OutputFormat::Table => {
            println!("Session: {}", format_phase(state.phase()));
            if let Some(user) = &state.user {
                println!("User:    {} ({})", user.name, user.id);
                println!("Storage: {}", store.get_storage_preference());
            }
            if let Some(expires_at) = store.get_expires_at() {
                println!("Token:   expires in {}", format_remaining(expires_at));
            }
        }
        OutputFormat::Json => {
            let value = json!({
                "authenticated": state.is_authenticated(),
                "user_id": state.user.as_ref().map(|u| u.id.clone()),
                "storage": store.get_storage_preference().to_string(),
                "expires_at": store.get_expires_at(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    controller.guard().stop_token_auto_refresh();
    Ok(())
}

/// Show the signed-in user and their roles
pub async fn whoami(format: OutputFormat) -> Result<()> {
    let controller = restore_session().await?;

    let Some(user) = controller.current_user() else {
        warn("Not signed in. Run 'mcn-auth login' first.");
        return Ok(());
    };

    match format {
        OutputFormat::Table => print_user_table(&user),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&user)?),
    }

    controller.guard().stop_token_auto_refresh();
    Ok(())
}

/// Reload the signed-in user's module permissions
pub async fn refresh_profile() -> Result<()> {
    let controller = restore_session().await?;

    if !controller.is_authenticated() {
        warn("Not signed in. Run 'mcn-auth login' first.");
        return Ok(());
    }

    match controller.refresh_user_profile().await {
        Some(user) => success(&format!(
            "Permissions updated: {}",
            format_modules(&user.modules)
        )),
        None => warn("Permissions could not be refreshed; keeping the cached profile"),
    }

    controller.guard().stop_token_auto_refresh();
    Ok(())
}

/// Run the development auth server
pub async fn serve(host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config()?.devserver;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    info(&format!(
        "Dev auth server on http://{}:{} (code {})",
        config.host, config.port, config.sms_code
    ));
    devserver::run_server(config).await?;
    Ok(())
}

// Helper functions

fn load_config() -> Result<Config> {
    config::load_config_or_default().map_err(|e| anyhow::anyhow!("{}", e))
}

/// Rehydrate the stored session and wait for server verification
async fn restore_session() -> Result<SessionController> {
    let config = load_config()?;
    let controller = SessionController::from_config(&config)?;
    controller.rehydrate().finished().await;
    Ok(controller)
}
