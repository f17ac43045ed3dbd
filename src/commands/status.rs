//! Status command: print what the last successful resolution recorded.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tenant_resolver::defaults;
use tenant_resolver::phases::orchestrator::{self, ResolvedWorkspace, WorkspaceLayout};
use tenant_resolver::suggestions;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the root manifest
    #[arg(short, long, value_name = "PATH", env = "TENANT_RESOLVER_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Workspace directory (defaults to .PROJECT beside the manifest)
    #[arg(short, long, value_name = "PATH", env = "TENANT_RESOLVER_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Print the state as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the status command
pub fn execute(args: StatusArgs) -> Result<()> {
    let workspace = match args.workspace {
        Some(workspace) => workspace,
        None => {
            let manifest = args
                .manifest
                .unwrap_or_else(defaults::default_manifest_path);
            defaults::default_workspace_root(&manifest)
        }
    };
    let layout = WorkspaceLayout::under(workspace);

    let Some(state) = orchestrator::load_state(&layout).map_err(suggestions::explain)? else {
        anyhow::bail!(
            "No resolved state in {}\n\nhint: Run 'tenant-resolver resolve' first",
            layout.root.display()
        );
    };

    if args.json {
        let json = serde_json::to_string_pretty(&state).context("Failed to serialize state")?;
        println!("{}", json);
    } else {
        print!("{}", render(&state));
    }
    Ok(())
}

fn render(state: &ResolvedWorkspace) -> String {
    let mut out = format!("Tenant: {}\n", state.tenant);
    out.push_str("Dependencies:\n");
    for dep in &state.dependencies {
        out.push_str(&format!("  {}\n", dep));
    }
    let sections = [
        ("Clusters", &state.clusters),
        ("Helm plugins", &state.helm_plugins),
        ("Tools", &state.tools),
    ];
    for (title, packages) in sections {
        if packages.is_empty() {
            continue;
        }
        out.push_str(&format!("{}:\n", title));
        for package in packages.values() {
            out.push_str(&format!("  {}\n", package));
        }
    }
    if !state.hooks.is_empty() {
        out.push_str("Hooks:\n");
        for binding in &state.hooks {
            let package = binding
                .package
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            match &binding.inherited_from {
                Some(from) => out.push_str(&format!(
                    "  {}: {} (from {})\n",
                    binding.owning_tenant, package, from
                )),
                None => out.push_str(&format!("  {}: {}\n", binding.owning_tenant, package)),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_resolver::package::VersionedPackage;
    use tenant_resolver::phases::HookBinding;

    #[test]
    fn test_render_lists_sections_and_inheritance() {
        let mut state = ResolvedWorkspace {
            tenant: "kodjin".to_string(),
            dependencies: vec![VersionedPackage::new("deps.infra", "v1.0.0", "git::x")],
            ..Default::default()
        };
        state.tools.insert(
            "terraform".to_string(),
            VersionedPackage::new("terraform", "1.5.0", "https://x"),
        );
        let mut inherited = HookBinding::absent("kodjin");
        inherited.package = Some(VersionedPackage::new("deps.hooks", "1.3.0", "git::h"));
        inherited.inherited_from = Some("deps".to_string());
        state.hooks.push(inherited);

        let text = render(&state);

        assert!(text.contains("Tenant: kodjin"));
        assert!(text.contains("  deps.infra@v1.0.0"));
        assert!(text.contains("Tools:\n  terraform@1.5.0"));
        assert!(!text.contains("Clusters:"));
        assert!(text.contains("kodjin: deps.hooks@1.3.0 (from deps)"));
    }

    #[test]
    fn test_execute_without_state_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = execute(StatusArgs {
            manifest: None,
            workspace: Some(temp_dir.path().to_path_buf()),
            json: false,
        });
        assert!(result.unwrap_err().to_string().contains("No resolved state"));
    }
}
