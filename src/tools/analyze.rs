use super::ToolContext;
use crate::error::BvtkError;
use crate::node_tree::NodeTreeFile;
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema, Clone)]
pub struct AnalyzeConfigParams {
    #[schemars(description = "JSON configuration filename on the user's desktop to analyze")]
    pub json_filename: String,
}

pub async fn analyze_config(ctx: &ToolContext, params: AnalyzeConfigParams) -> String {
    match NodeTreeFile::load(&ctx.workspace, &params.json_filename).await {
        Ok(config) => describe(&params.json_filename, &config),
        Err(BvtkError::FileNotFound { filename, path }) => format!(
            "❌ JSON file not found on the desktop: {filename}\nFull path: {}",
            path.display()
        ),
        Err(BvtkError::Parse { filename, source }) => {
            format!("❌ Invalid JSON: {filename}\n\nError: {source}")
        }
        Err(err) => {
            tracing::error!("Analysis of {} failed: {err}", params.json_filename);
            format!("❌ Analyzing the configuration failed: {err}")
        }
    }
}

/// Structure report for one file. Missing fields are flagged, not rejected.
fn describe(filename: &str, config: &NodeTreeFile) -> String {
    let mut text = format!("📋 JSON configuration analysis: {filename}\n\n");
    let _ = writeln!(
        text,
        "🔑 Top-level fields: {}\n",
        config.top_level_keys().join(", ")
    );

    match config.nodes() {
        Some(nodes) => {
            text.push_str("📊 Nodes:\n");
            let _ = writeln!(text, "  - Node count: {}", nodes.len());
            let types = config.node_types();
            if !types.is_empty() {
                let names: Vec<_> = types.keys().copied().collect();
                let _ = writeln!(text, "  - Distinct node types: {}", types.len());
                let _ = writeln!(text, "  - Node types: {}\n", names.join(", "));
                text.push_str("🔧 Nodes per type:\n");
                for (name, count) in &types {
                    let _ = writeln!(text, "  - {name}: {count}");
                }
            }
            text.push('\n');
        }
        None => text.push_str("❓ No 'nodes' array field found\n\n"),
    }

    match config.links() {
        Some(links) => {
            text.push_str("🔗 Links:\n");
            let _ = writeln!(text, "  - Link count: {}", links.len());
            let keys = config.first_link_keys();
            if !keys.is_empty() {
                let _ = writeln!(text, "  - Link fields: {}", keys.join(", "));
            }
            text.push('\n');
        }
        None => {
            let _ = writeln!(text, "🔗 Link count: {}", config.link_count());
            text.push_str("❓ No 'links' array field found\n\n");
        }
    }

    text.push_str("📁 File:\n");
    let _ = writeln!(text, "  - Size: {}", config.size_kb());
    let _ = writeln!(text, "  - Modified: {}\n", config.modified_display());
    text.push_str("✅ Analysis complete. The file is passed to the BVtkNodes import script unchanged.");
    text
}
