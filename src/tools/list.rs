use super::ToolContext;
use crate::node_tree::{format_kb, format_modified, NodeTreeFile};
use std::fmt::Write as _;
use std::io;
use std::path::Path;

pub async fn list_json_files(ctx: &ToolContext) -> String {
    let desktop = ctx.workspace.desktop();
    if !tokio::fs::try_exists(desktop).await.unwrap_or(false) {
        return format!("❌ Cannot access the desktop: {}", desktop.display());
    }

    let names = match json_file_names(desktop).await {
        Ok(names) => names,
        Err(err) => {
            tracing::error!("Listing {} failed: {err}", desktop.display());
            return format!("❌ Listing JSON files on the desktop failed: {err}");
        }
    };

    if names.is_empty() {
        return format!(
            "📁 Desktop: {}\n\nNo JSON files found.",
            desktop.display()
        );
    }

    let mut text = format!(
        "📁 Desktop: {}\n\n🔍 Found {} JSON file(s):\n\n",
        desktop.display(),
        names.len()
    );
    for name in &names {
        describe_entry(&mut text, desktop, name).await;
    }
    text.push_str(
        "💡 Hint: use analyze-bvtk-config to inspect a file, or import-bvtk-config to import it.",
    );
    text
}

/// `*.json` entries of `dir`, case-insensitive, sorted by name.
async fn json_file_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_lowercase().ends_with(".json") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

async fn describe_entry(text: &mut String, desktop: &Path, name: &str) {
    let _ = writeln!(text, "📄 {name}");
    let path = desktop.join(name);
    match NodeTreeFile::read(&path, name).await {
        Ok(config) => {
            let _ = writeln!(text, "   Size: {}", config.size_kb());
            let _ = writeln!(text, "   Modified: {}", config.modified_display());
            if config.nodes().is_some() {
                let _ = write!(text, "   📊 Contains {} node(s)", config.node_count());
                if config.links().is_some() {
                    let _ = write!(text, ", {} link(s)", config.link_count());
                }
                text.push('\n');
            } else {
                text.push_str("   ❓ Unknown format\n");
            }
        }
        Err(err) => {
            tracing::debug!("Could not read {name}: {err}");
            if let Ok(metadata) = tokio::fs::metadata(&path).await {
                let _ = writeln!(text, "   Size: {}", format_kb(metadata.len()));
                let _ = writeln!(
                    text,
                    "   Modified: {}",
                    format_modified(metadata.modified().ok())
                );
            }
            text.push_str("   ❌ Unreadable or invalid JSON\n");
        }
    }
    text.push('\n');
}
