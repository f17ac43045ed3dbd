//! Resolve command implementation
//!
//! Resolves the root manifest into the workspace:
//! 1. Discovery of dependencies and reconciliation of their inventory
//! 2. Hook unification
//! 3. Garbage collection of unreferenced hook directories
//! 4. Transfers of hooks, clusters, and tools
//! 5. Writing `resolved.yaml`
//!
//! Ctrl-C cancels the transfer in flight. The run stops with an "interrupted"
//! error and can simply be started again.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use log::debug;

use tenant_resolver::cancel::CancellationToken;
use tenant_resolver::defaults;
use tenant_resolver::phases::orchestrator::{self, Resolution, ResolverConfig};
use tenant_resolver::suggestions;
use tenant_resolver::transport::DefaultTransport;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Path to the root manifest
    #[arg(short, long, value_name = "PATH", env = "TENANT_RESOLVER_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Workspace directory (defaults to .PROJECT beside the manifest)
    #[arg(short, long, value_name = "PATH", env = "TENANT_RESOLVER_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Root tenant (defaults to the first label of the manifest's directory name)
    #[arg(short, long, value_name = "NAME", env = "TENANT_RESOLVER_TENANT")]
    pub tenant: Option<String>,

    /// Token embedded in version-control URLs
    #[arg(long, value_name = "TOKEN", env = "TENANT_RESOLVER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Try object-storage artifacts before each package's own source
    #[arg(long, env = "TENANT_RESOLVER_ARTIFACT_MODE")]
    pub artifact_mode: bool,

    /// Skip archive entries matching this glob (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Select tool sources for this OS instead of the host's
    #[arg(long, value_name = "OS")]
    pub os: Option<String>,

    /// Do not render progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print the resolved workspace as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl ResolveArgs {
    /// Build the library configuration for `manifest`.
    fn resolver_config(&self, manifest: &std::path::Path) -> ResolverConfig {
        let tenant = self
            .tenant
            .clone()
            .unwrap_or_else(|| defaults::default_tenant(manifest));
        let workspace = self
            .workspace
            .clone()
            .unwrap_or_else(|| defaults::default_workspace_root(manifest));

        let mut config = ResolverConfig::new(tenant, workspace);
        config.token = self.token.clone().filter(|t| !t.is_empty());
        config.artifact_mode = self.artifact_mode;
        config.exclude = self.exclude.clone();
        config.progress = !self.no_progress && !self.quiet && !self.json;
        if let Some(os) = &self.os {
            config.os = os.clone();
        }
        config
    }
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs) -> Result<()> {
    let start_time = Instant::now();

    let manifest = args
        .manifest
        .clone()
        .unwrap_or_else(defaults::default_manifest_path);
    if !manifest.exists() {
        return Err(suggestions::manifest_not_found(&manifest));
    }

    let config = args.resolver_config(&manifest);
    let loud = !args.quiet && !args.json;
    if loud {
        println!("🔍 Resolving {} for tenant {}", manifest.display(), config.tenant);
        println!("   Workspace: {}", config.layout.root.display());
        println!();
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_watchdog(cancel.clone())?;

    let transport = Arc::new(DefaultTransport::new());
    let result = orchestrator::resolve_file(&manifest, &config, transport, cancel);

    match result {
        Ok(resolution) => {
            if args.json {
                let json = serde_json::to_string_pretty(&resolution.workspace)
                    .context("Failed to serialize resolved workspace")?;
                println!("{}", json);
            } else if loud {
                print_summary(&resolution, start_time.elapsed().as_secs_f64());
            }
            Ok(())
        }
        Err(e) => {
            if loud {
                if e.is_interrupted() {
                    println!("⚠️  Resolve interrupted");
                } else {
                    println!("❌ Resolve failed");
                }
                println!();
            }
            Err(suggestions::explain(e))
        }
    }
}

/// Cancel `token` on Ctrl-C.
///
/// The watchdog runs `tokio::signal::ctrl_c` on a current-thread runtime in
/// its own thread, so the library never installs a signal handler itself.
fn spawn_interrupt_watchdog(token: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the interrupt watchdog")?;

    thread::Builder::new()
        .name("interrupt-watchdog".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    debug!("Interrupt received, cancelling transfers");
                    token.cancel();
                }
            })
        })
        .context("Failed to start the interrupt watchdog")?;
    Ok(())
}

fn print_summary(resolution: &Resolution, seconds: f64) {
    let workspace = &resolution.workspace;
    println!("✅ Resolved in {:.2}s", seconds);
    println!("   {} dependencies", workspace.dependencies.len());
    println!(
        "   {} clusters, {} helm plugins, {} tools",
        workspace.clusters.len(),
        workspace.helm_plugins.len(),
        workspace.tools.len()
    );
    if let Some(package) = workspace.hooks.iter().find_map(|b| b.package.as_ref()) {
        println!("   hooks: {}", package);
    }
    if resolution.fetched.is_empty() {
        println!("   Everything was already in place");
    } else {
        println!("   {} packages fetched", resolution.fetched.len());
    }
    for removed in &resolution.removed {
        println!("   Removed {}", removed.display());
    }
}
