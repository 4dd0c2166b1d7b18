//! Provider management commands
//!
//! Register, inspect and remove upstream search providers. Edits land in the
//! database and are picked up by a running server on its next request.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use searchgate_core::models::NumberInput;
use searchgate_core::{ProviderInput, ProviderRegistry, ProviderSummary, QuotaLimits, SearchProvider};

use super::Context;
use crate::output::{print_output, print_single, print_success, print_warning, OutputFormat};

#[derive(Subcommand)]
pub enum ProviderAction {
    /// List registered providers in priority order
    List {
        /// Only show providers eligible for selection
        #[arg(long)]
        active: bool,
    },

    /// Show one provider
    Show {
        /// Provider id
        id: String,
    },

    /// Register a provider, or replace the one with the same id
    Add(AddProviderArgs),

    /// Remove a provider
    Remove {
        /// Provider id
        id: String,
    },
}

#[derive(Args)]
pub struct AddProviderArgs {
    /// Unique provider id
    #[arg(long)]
    pub id: String,

    /// Base URL; requests go to <base-url>/search
    #[arg(long)]
    pub base_url: String,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Bearer credential sent to the provider
    #[arg(long)]
    pub api_key: Option<String>,

    /// Lower is tried first
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub priority: i64,

    /// Register the provider as inactive
    #[arg(long)]
    pub inactive: bool,

    /// Requests allowed per rolling minute
    #[arg(long)]
    pub per_minute: Option<String>,

    /// Requests allowed per rolling hour
    #[arg(long)]
    pub per_hour: Option<String>,

    /// Requests allowed per rolling day
    #[arg(long)]
    pub per_day: Option<String>,

    /// Requests allowed per rolling 30 days
    #[arg(long)]
    pub per_month: Option<String>,
}

impl From<AddProviderArgs> for ProviderInput {
    fn from(args: AddProviderArgs) -> Self {
        let threshold = |value: Option<String>| value.map(NumberInput::Text);
        ProviderInput {
            id: Some(args.id),
            display_name: args.name,
            base_url: Some(args.base_url),
            api_key: args.api_key,
            priority: Some(args.priority.into()),
            active: Some((!args.inactive).into()),
            per_minute: threshold(args.per_minute),
            per_hour: threshold(args.per_hour),
            per_day: threshold(args.per_day),
            per_month: threshold(args.per_month),
        }
    }
}

/// Provider row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ProviderRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Base URL")]
    pub base_url: String,
    #[tabled(rename = "Priority")]
    pub priority: i64,
    #[tabled(rename = "Active")]
    pub active: String,
    #[tabled(rename = "API Key")]
    pub api_key: String,
    #[tabled(rename = "Limits")]
    pub limits: String,
}

impl From<&SearchProvider> for ProviderRow {
    fn from(provider: &SearchProvider) -> Self {
        let summary = ProviderSummary::from(provider);
        Self {
            id: summary.id,
            name: provider.label().to_string(),
            base_url: summary.base_url,
            priority: summary.priority,
            active: if summary.active { "yes" } else { "no" }.to_string(),
            api_key: summary.api_key_fingerprint.unwrap_or_else(|| "-".to_string()),
            limits: format_limits(&summary.limits),
        }
    }
}

/// "60/minute, 1000/day", or "unlimited"
pub fn format_limits(limits: &QuotaLimits) -> String {
    if limits.is_unlimited() {
        return "unlimited".to_string();
    }
    limits
        .configured()
        .map(|(window, limit)| format!("{}/{}", limit, window))
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn execute(ctx: &Context, action: ProviderAction) -> Result<()> {
    let registry = ProviderRegistry::new(&ctx.db);
    match action {
        ProviderAction::List { active } => list_providers(ctx, &registry, active).await,
        ProviderAction::Show { id } => show_provider(ctx, &registry, &id).await,
        ProviderAction::Add(args) => add_provider(ctx, &registry, args).await,
        ProviderAction::Remove { id } => remove_provider(ctx, &registry, &id).await,
    }
}

async fn list_providers(ctx: &Context, registry: &ProviderRegistry, active_only: bool) -> Result<()> {
    let providers = if active_only {
        registry.list_active().await?
    } else {
        registry.list().await?
    };

    match ctx.format {
        OutputFormat::Json => {
            let summaries: Vec<ProviderSummary> = providers.iter().map(ProviderSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Table => {
            let rows: Vec<ProviderRow> = providers.iter().map(ProviderRow::from).collect();
            print_output(&rows, ctx.format)?;
        }
    }
    Ok(())
}

async fn show_provider(ctx: &Context, registry: &ProviderRegistry, id: &str) -> Result<()> {
    let provider = registry.get(id).await?;
    match ctx.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ProviderSummary::from(&provider))?);
        }
        OutputFormat::Table => print_single(&ProviderRow::from(&provider), ctx.format)?,
    }
    Ok(())
}

async fn add_provider(ctx: &Context, registry: &ProviderRegistry, args: AddProviderArgs) -> Result<()> {
    let provider = registry.upsert(args.into()).await?;

    print_success(&format!("Saved provider {}", provider.id), ctx.quiet);
    if !provider.active {
        print_warning(
            &format!("Provider {} is inactive and will not be selected", provider.id),
            ctx.quiet,
        );
    }
    Ok(())
}

async fn remove_provider(ctx: &Context, registry: &ProviderRegistry, id: &str) -> Result<()> {
    let deleted = registry.delete(id).await?;
    if deleted == 0 {
        anyhow::bail!("Provider not found: {}", id);
    }

    print_success(&format!("Removed provider {}", id), ctx.quiet);
    print_warning(
        "A running server keeps this provider's usage history until it restarts",
        ctx.quiet,
    );
    Ok(())
}
