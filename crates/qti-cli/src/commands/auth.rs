//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use qti_clients::ClientError;
use std::io::{self, Write};
use tracing::info;

/// Login with email and password.
pub async fn login(ctx: &Context, email: Option<String>, format: OutputFormat) -> Result<()> {
    let account = ctx.account()?;

    if account.is_logged_in() {
        if let Some(user) = account.logged_in_user().await {
            let who = user.email.unwrap_or(user.local_id);
            output::print_success(&format!("Already logged in as {}", who), format);
            return Ok(());
        }
    }

    let email = match email {
        Some(email) => email,
        None => {
            print!("Email: ");
            io::stdout().flush()?;
            let mut email = String::new();
            io::stdin().read_line(&mut email)?;
            email
        }
    };
    let email = email.trim().to_string();
    if email.is_empty() {
        output::print_error("Email is required", format);
        return Ok(());
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        output::print_error("Password is required", format);
        return Ok(());
    }

    match account.authenticate(&email, &password).await {
        Ok(_) => {
            info!(role = ctx.role_name(), "Logged in");
            output::print_success(&format!("Logged in as {}", email), format);
        }
        Err(ClientError::AccessDenied) => {
            output::print_error("This account has no access to the application", format);
        }
        Err(e) => output::print_error(&format!("Login failed: {}", e), format),
    }
    Ok(())
}

/// Logout and clear stored credentials.
pub async fn logout(ctx: &Context, format: OutputFormat) -> Result<()> {
    ctx.account()?.logout();
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Check authentication status.
pub async fn status(ctx: &Context, format: OutputFormat) -> Result<()> {
    let account = ctx.account()?;
    let user = if account.is_logged_in() {
        account.logged_in_user().await
    } else {
        None
    };
    // A rejected lookup ends the session.
    let logged_in = account.is_logged_in();

    match format {
        OutputFormat::Text => {
            output::print_row("API", account.client().base_url().as_str());
            output::print_row("Role", ctx.role_name());
            if logged_in {
                output::print_row("Auth", "logged in");
                if let Some(user) = &user {
                    output::print_row("User ID", &user.local_id);
                    output::print_row("Email", user.email.as_deref().unwrap_or("unknown"));
                }
            } else {
                output::print_row("Auth", "not logged in");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "api_url": account.client().base_url().as_str(),
                "role": ctx.role_name(),
                "logged_in": logged_in,
                "user_id": user.as_ref().map(|u| u.local_id.clone()),
                "email": user.and_then(|u| u.email),
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
