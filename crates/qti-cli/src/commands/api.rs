//! Commands that call the API with the stored credentials.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use qti_http::ApiRequest;
use std::path::Path;
use tracing::debug;

/// GET an arbitrary API path and print the unwrapped response.
pub async fn get(ctx: &Context, path: &str, format: OutputFormat) -> Result<()> {
    let account = ctx.account()?;
    ctx.require_login(&account)?;

    debug!(path, "GET");
    let response = account.client().execute(ApiRequest::get(path)).await?;
    output::print_value(&response.into_value(), format);
    Ok(())
}

pub async fn assessments(ctx: &Context, format: OutputFormat) -> Result<()> {
    let teacher = ctx.teacher()?;
    ctx.require_login(&teacher)?;

    let assessments = teacher.get_assessments().await?;
    match format {
        OutputFormat::Text => {
            output::print_heading(&format!("Assessments ({})", assessments.len()));
            for assessment in &assessments {
                output::print_row(&assessment.id, &assessment.name);
            }
        }
        OutputFormat::Json => output::print_value(&serde_json::to_value(&assessments)?, format),
    }
    Ok(())
}

pub async fn deliveries(ctx: &Context, assessment_id: &str, format: OutputFormat) -> Result<()> {
    let teacher = ctx.teacher()?;
    ctx.require_login(&teacher)?;

    let deliveries = teacher.get_assessment_deliveries(assessment_id).await?;
    match format {
        OutputFormat::Text => {
            output::print_heading(&format!("Deliveries of {}", assessment_id));
            for delivery in &deliveries {
                let state = serde_json::to_value(&delivery.state)?;
                let label = match &delivery.name {
                    Some(name) => format!("{} ({})", state.as_str().unwrap_or("?"), name),
                    None => state.as_str().unwrap_or("?").to_string(),
                };
                output::print_row(&delivery.id, &label);
            }
        }
        OutputFormat::Json => output::print_value(&serde_json::to_value(&deliveries)?, format),
    }
    Ok(())
}

pub async fn packages(ctx: &Context, format: OutputFormat) -> Result<()> {
    let tools = ctx.tools()?;
    ctx.require_login(&tools)?;

    let packages = tools.get_packages().await?;
    match format {
        OutputFormat::Text => {
            output::print_heading(&format!("Packages ({})", packages.len()));
            for package in &packages {
                output::print_row(
                    &package.id,
                    &format!("{} ({} items)", package.name, package.item_count),
                );
            }
        }
        OutputFormat::Json => output::print_value(&serde_json::to_value(&packages)?, format),
    }
    Ok(())
}

/// Upload a QTI package (zip) through the tools API.
pub async fn upload(ctx: &Context, file: &Path, format: OutputFormat) -> Result<()> {
    let tools = ctx.tools()?;
    ctx.require_login(&tools)?;

    let data = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("package.zip");

    let package = tools.upload_package(file_name, data).await?;
    match format {
        OutputFormat::Text => {
            output::print_success(&format!("Uploaded package {}", package.id), format);
            if let Some(message) = &package.error_message {
                output::print_row("Warning", message);
            }
        }
        OutputFormat::Json => output::print_value(&serde_json::to_value(&package)?, format),
    }
    Ok(())
}

/// Download delivery results as CSV, to a file or stdout.
pub async fn results(
    ctx: &Context,
    delivery_code: &str,
    out: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let teacher = ctx.teacher()?;
    ctx.require_login(&teacher)?;

    let csv = teacher.download_results_by_delivery_code(delivery_code).await?;
    match out {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output::print_success(
                &format!("Wrote {} bytes to {}", csv.len(), path.display()),
                format,
            );
        }
        None => print!("{}", String::from_utf8_lossy(&csv)),
    }
    Ok(())
}
