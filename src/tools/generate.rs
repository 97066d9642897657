use super::{default_node_tree_name, default_true, ToolContext};
use crate::error::{BvtkError, Result};
use crate::script::ImportScript;
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_script_filename() -> String {
    "bvtk_import_script.py".to_string()
}

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema, Clone)]
pub struct GenerateScriptParams {
    #[schemars(description = "JSON configuration filename on the user's desktop")]
    pub json_filename: String,
    #[serde(default = "default_node_tree_name")]
    #[schemars(description = "Name of the node tree to create or reuse in Blender")]
    pub node_tree_name: String,
    #[serde(default = "default_script_filename")]
    #[schemars(description = "Filename for the generated script, written to the desktop")]
    pub script_filename: String,
    #[serde(default = "default_true")]
    #[schemars(description = "Remove existing nodes from the tree before importing")]
    pub clear_existing: bool,
}

pub async fn generate_script(ctx: &ToolContext, params: GenerateScriptParams) -> String {
    match write_script(ctx, &params).await {
        Ok(script_path) => format!(
            "✅ Standalone import script generated!\n\n\
             📁 Script location: {}\n\
             📁 Target JSON: {}\n\
             🌲 Node tree name: {}\n\n\
             💡 Usage:\n\
             1. Open Blender\n\
             2. Switch to the Scripting workspace\n\
             3. Open or paste the generated script\n\
             4. Press Run Script\n\n\
             Running the import by hand makes problems easier to debug.",
            script_path.display(),
            params.json_filename,
            params.node_tree_name
        ),
        Err(BvtkError::FileNotFound { filename, path }) => format!(
            "❌ JSON file not found on the desktop: {filename}\nFull path: {}",
            path.display()
        ),
        Err(err) => {
            tracing::error!("Generating script for {} failed: {err}", params.json_filename);
            format!("❌ Generating the import script failed: {err}")
        }
    }
}

async fn write_script(ctx: &ToolContext, params: &GenerateScriptParams) -> Result<PathBuf> {
    let json_path = ctx.workspace.desktop_file(&params.json_filename);
    if !tokio::fs::try_exists(&json_path).await.unwrap_or(false) {
        return Err(BvtkError::FileNotFound {
            filename: params.json_filename.clone(),
            path: json_path,
        });
    }

    let script = ImportScript {
        json_path: &json_path,
        node_tree_name: &params.node_tree_name,
        clear_existing: params.clear_existing,
        save_path: None,
    }
    .render();
    let script_path = ctx.workspace.desktop_file(&params.script_filename);
    tokio::fs::write(&script_path, script).await?;
    tracing::debug!("Wrote import script to {}", script_path.display());
    Ok(script_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;
    use crate::tools::testing::context;
    use std::sync::Arc;

    fn params(json_filename: &str) -> GenerateScriptParams {
        serde_json::from_value(serde_json::json!({ "json_filename": json_filename }))
            .expect("params")
    }

    #[tokio::test]
    async fn writes_script_next_to_the_json() {
        let desktop = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        let runner = Arc::new(FakeRunner::failing());
        let ctx = context(desktop.path(), desktop.path(), runner.clone());

        let report = generate_script(&ctx, params("demo.json")).await;

        assert!(report.starts_with("✅ Standalone import script generated!"), "{report}");
        let script_path = desktop.path().join("bvtk_import_script.py");
        let script = std::fs::read_to_string(&script_path).unwrap();
        assert!(script.contains("SAVE_BLEND_FILE = \"\""));
        assert!(script.contains("NODE_TREE_NAME = \"BVTK Node Tree\""));
        assert!(report.contains(&script_path.display().to_string()));
        assert!(runner.calls().is_empty(), "generating never runs Blender");
    }

    #[tokio::test]
    async fn honours_custom_names() {
        let desktop = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        let ctx = context(desktop.path(), desktop.path(), Arc::new(FakeRunner::failing()));

        let mut request = params("demo.json");
        request.script_filename = "custom.py".to_string();
        request.node_tree_name = "Cones".to_string();
        request.clear_existing = false;
        generate_script(&ctx, request).await;

        let script = std::fs::read_to_string(desktop.path().join("custom.py")).unwrap();
        assert!(script.contains("NODE_TREE_NAME = \"Cones\""));
        assert!(script.contains("CLEAR_EXISTING = False"));
    }

    #[tokio::test]
    async fn missing_json_is_reported() {
        let desktop = tempfile::tempdir().unwrap();
        let ctx = context(desktop.path(), desktop.path(), Arc::new(FakeRunner::failing()));

        let report = generate_script(&ctx, params("absent.json")).await;

        assert!(report.starts_with("❌ JSON file not found on the desktop: absent.json"));
        assert!(!desktop.path().join("bvtk_import_script.py").exists());
    }
}
