use super::{default_node_tree_name, default_true, ToolContext};
use crate::cleanup::{remove_temp_script, sweep_temp_scripts};
use crate::error::{BvtkError, Result};
use crate::locator::{not_found_guidance, BlenderLocator, NotFound};
use crate::node_tree::NodeTreeFile;
use crate::runner::{run_blender_script, ScriptRun};
use crate::script::{temp_script_name, ImportScript, TEMP_SCRIPT_PREFIX};
use chrono::{DateTime, Utc};
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, schemars::JsonSchema, Clone)]
pub struct ImportConfigParams {
    #[schemars(description = "JSON configuration filename (looked up on the user's desktop)")]
    pub json_filename: String,
    #[serde(default = "default_node_tree_name")]
    #[schemars(description = "Name of the node tree to create or reuse in Blender")]
    pub node_tree_name: String,
    #[serde(default)]
    #[schemars(description = "Path to the Blender executable (optional, located automatically)")]
    pub blender_executable: Option<String>,
    #[serde(default = "default_true")]
    #[schemars(description = "Remove existing nodes from the tree before importing")]
    pub clear_existing: bool,
    #[serde(default)]
    #[schemars(description = "Run Blender in background mode (false opens the GUI)")]
    pub background_mode: bool,
    #[serde(default = "default_true")]
    #[schemars(description = "Save a .blend file on the desktop after the import")]
    pub save_blend_file: bool,
    #[serde(default)]
    #[schemars(description = "Custom .blend filename (optional, generated when omitted)")]
    pub blend_filename: Option<String>,
}

pub async fn import_config(ctx: &ToolContext, params: ImportConfigParams) -> String {
    match run_import(ctx, &params).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!("Import of {} failed: {err}", params.json_filename);
            failure_text(&err)
        }
    }
}

async fn run_import(ctx: &ToolContext, params: &ImportConfigParams) -> Result<String> {
    let config = NodeTreeFile::load(&ctx.workspace, &params.json_filename).await?;
    let now = ctx.clock.now();
    let save_path = params
        .save_blend_file
        .then(|| ctx.workspace.desktop_file(&blend_filename(params, now)));

    let explicit = params
        .blender_executable
        .as_deref()
        .filter(|exe| !exe.is_empty())
        .map(Path::new)
        .or(ctx.default_blender.as_deref());
    let blender = BlenderLocator::new(ctx.runner.as_ref())
        .locate(explicit, ctx.platform)
        .await
        .map_err(|NotFound { platform }| BvtkError::ExecutableNotFound { platform })?;

    let script = ImportScript {
        json_path: &config.path,
        node_tree_name: &params.node_tree_name,
        clear_existing: params.clear_existing,
        save_path: save_path.as_deref(),
    }
    .render();
    let script_path = ctx
        .workspace
        .temp()
        .join(temp_script_name(now.timestamp_millis()));

    tracing::info!(
        "Importing {} with {} in {} mode",
        params.json_filename,
        blender.path().display(),
        mode_name(params.background_mode)
    );
    let outcome = execute(ctx, blender.path(), &script_path, &script, params.background_mode).await;
    if outcome.is_err() {
        let swept = sweep_temp_scripts(ctx.workspace.temp()).await;
        tracing::debug!("Removed {swept} leftover {TEMP_SCRIPT_PREFIX}* files");
    }
    let run = outcome?;

    let saved = match &save_path {
        Some(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
        None => false,
    };
    Ok(success_text(params, &config, save_path.as_deref().filter(|_| saved), &run))
}

/// Writes the script, runs it, and removes it again whatever the outcome.
async fn execute(
    ctx: &ToolContext,
    blender: &Path,
    script_path: &Path,
    script: &str,
    background: bool,
) -> Result<ScriptRun> {
    tokio::fs::write(script_path, script).await?;
    let result = run_blender_script(
        ctx.runner.as_ref(),
        blender,
        script_path,
        background,
        ctx.limits,
    )
    .await;
    remove_temp_script(script_path).await;
    result
}

fn blend_filename(params: &ImportConfigParams, now: DateTime<Utc>) -> String {
    match &params.blend_filename {
        Some(name) => name.clone(),
        None => format!(
            "bvtk_import_{}_{}.blend",
            params.json_filename.replacen(".json", "", 1),
            now.format("%Y-%m-%dT%H-%M-%S")
        ),
    }
}

fn mode_name(background: bool) -> &'static str {
    if background {
        "background"
    } else {
        "GUI"
    }
}

fn success_text(
    params: &ImportConfigParams,
    config: &NodeTreeFile,
    saved_as: Option<&Path>,
    run: &ScriptRun,
) -> String {
    let mut text = format!(
        "🎉 BVtkNodes configuration imported{} successfully!\n\n",
        if saved_as.is_some() { " and saved" } else { "" }
    );
    let _ = writeln!(text, "📁 JSON file: {}", params.json_filename);
    let _ = writeln!(text, "🌲 Node tree: {}", params.node_tree_name);
    let _ = writeln!(
        text,
        "📊 Statistics: {} node(s), {} link(s)",
        config.node_count(),
        config.link_count()
    );
    let _ = writeln!(text, "🖥️ Run mode: {}", mode_name(params.background_mode));
    if let Some(name) = saved_as.and_then(Path::file_name) {
        let _ = writeln!(text, "💾 Saved as: {}", name.to_string_lossy());
    }
    text.push('\n');

    if !run.stdout.is_empty() {
        let _ = writeln!(text, "📝 Blender output:\n{}", run.stdout);
    }
    // Blender prints routine warnings on stderr; only surface real messages.
    if !run.stderr.is_empty() && !run.stderr.contains("Warning") {
        let _ = writeln!(text, "⚠️ Messages:\n{}", run.stderr);
    }

    if !params.background_mode {
        text.push_str(
            "\n💡 Hint: Blender should now be open in GUI mode; check the BVTK node editor workspace.",
        );
    } else if saved_as.is_some() {
        text.push_str("\n💡 Hint: open the saved blend file in Blender to inspect the imported nodes.");
    }
    text
}

fn failure_text(err: &BvtkError) -> String {
    match err {
        BvtkError::FileNotFound { filename, path } => format!(
            "❌ JSON file not found on the desktop: {filename}\nFull path: {}\n\nMake sure the file exists on the desktop.",
            path.display()
        ),
        BvtkError::Parse { filename, source } => {
            format!("❌ Invalid JSON file: {filename}\nError: {source}")
        }
        BvtkError::ExecutableNotFound { platform } => format!(
            "❌ Could not find a Blender executable on {platform}.\n\n{}",
            not_found_guidance()
        ),
        BvtkError::Timeout { .. } | BvtkError::Process { .. } | BvtkError::Io(_) => {
            let mut text = format!("❌ Importing the BVtkNodes configuration failed:\n\n{err}\n\n");
            if let Some((stdout, stderr)) = err.captured_output() {
                if !stdout.is_empty() {
                    let _ = writeln!(text, "📝 Blender output:\n{stdout}");
                }
                if !stderr.is_empty() {
                    let _ = writeln!(text, "⚠️ Blender errors:\n{stderr}");
                }
            }
            text.push_str(
                "Please check:\n\
                 1. Blender is installed correctly\n\
                 2. The BVtkNodes add-on is installed and enabled\n\
                 3. The JSON file is well-formed\n\
                 4. The file paths are accessible\n\n\
                 Try GUI mode (background_mode: false) to debug the problem.",
            );
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::{exited, FakeRunner};
    use crate::runner::RunError;
    use crate::tools::testing::context;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_test::traced_test;

    fn params(json_filename: &str) -> ImportConfigParams {
        serde_json::from_value(serde_json::json!({ "json_filename": json_filename }))
            .expect("params")
    }

    /// Reads the save path back out of a rendered script.
    fn saved_path_in(script: &str) -> Option<PathBuf> {
        let literal = script
            .lines()
            .find_map(|line| line.strip_prefix("SAVE_BLEND_FILE = "))?;
        let path: String = serde_json::from_str(literal).ok()?;
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    fn script_arg(args: &[OsString]) -> Option<PathBuf> {
        let at = args.iter().position(|arg| arg == "--python")?;
        args.get(at + 1).map(PathBuf::from)
    }

    /// Behaves like a Blender install: answers probes and "saves" the blend
    /// file named in the script.
    fn blender_stub() -> FakeRunner {
        FakeRunner::new(|_, args| {
            let Some(script) = script_arg(args) else {
                return Ok(exited(0, "Blender 4.2.0\n", ""));
            };
            let source = std::fs::read_to_string(&script).map_err(RunError::Io)?;
            if let Some(save) = saved_path_in(&source) {
                std::fs::write(save, b"BLENDER").map_err(RunError::Io)?;
            }
            Ok(exited(0, "Import finished\n", "Warning: ignored\n"))
        })
    }

    #[test]
    fn params_defaults() {
        let params = params("demo.json");
        assert_eq!(params.node_tree_name, "BVTK Node Tree");
        assert!(params.clear_existing);
        assert!(!params.background_mode);
        assert!(params.save_blend_file);
        assert!(params.blender_executable.is_none());
    }

    #[tokio::test]
    async fn imports_and_saves_end_to_end() {
        let desktop = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            desktop.path().join("demo.json"),
            r#"{"nodes":[{"bl_idname":"A"}],"links":[]}"#,
        )
        .unwrap();
        let runner = Arc::new(blender_stub());
        let ctx = context(desktop.path(), temp.path(), runner.clone());

        let mut request = params("demo.json");
        request.background_mode = true;
        let report = import_config(&ctx, request).await;

        assert!(report.starts_with("🎉 BVtkNodes configuration imported and saved"), "{report}");
        assert!(report.contains("📊 Statistics: 1 node(s), 0 link(s)"));
        assert!(report.contains("💾 Saved as: bvtk_import_demo_2025-03-14T09-26-53.blend"));
        assert!(report.contains("Import finished"));
        assert!(!report.contains("Warning: ignored"));
        assert!(desktop
            .path()
            .join("bvtk_import_demo_2025-03-14T09-26-53.blend")
            .exists());

        let calls = runner.calls();
        assert_eq!(calls.len(), 2, "one probe, one run");
        assert_eq!(calls[0].0, PathBuf::from("blender"));
        assert_eq!(calls[1].1[0], "--background");
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn gui_mode_without_saving() {
        let desktop = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), r#"{"nodes":[],"links":[]}"#).unwrap();
        let runner = Arc::new(blender_stub());
        let ctx = context(desktop.path(), temp.path(), runner.clone());

        let mut request = params("demo.json");
        request.save_blend_file = false;
        let report = import_config(&ctx, request).await;

        assert!(report.starts_with("🎉 BVtkNodes configuration imported successfully!"));
        assert!(!report.contains("💾"));
        assert!(report.contains("🖥️ Run mode: GUI"));
        assert!(report.contains("GUI mode; check the BVTK node editor"));
        assert_ne!(runner.calls()[1].1[0], "--background");
    }

    #[test]
    fn custom_blend_filename_is_used() {
        let now = Utc::now();
        let mut request = params("scene.json");
        request.blend_filename = Some("mine.blend".to_string());
        assert_eq!(blend_filename(&request, now), "mine.blend");
    }

    #[tokio::test]
    async fn missing_json_is_reported_without_probing() {
        let desktop = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::failing());
        let ctx = context(desktop.path(), desktop.path(), runner.clone());

        let report = import_config(&ctx, params("absent.json")).await;

        assert!(report.starts_with("❌ JSON file not found on the desktop: absent.json"));
        assert!(report.contains("Full path:"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_reported() {
        let desktop = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("bad.json"), "{ nope").unwrap();
        let ctx = context(desktop.path(), desktop.path(), Arc::new(FakeRunner::failing()));

        let report = import_config(&ctx, params("bad.json")).await;
        assert!(report.starts_with("❌ Invalid JSON file: bad.json"), "{report}");
    }

    #[tokio::test]
    async fn no_blender_found_lists_known_locations() {
        let desktop = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        let runner = Arc::new(FakeRunner::failing());
        let ctx = context(desktop.path(), desktop.path(), runner.clone());

        let report = import_config(&ctx, params("demo.json")).await;

        assert!(report.starts_with("❌ Could not find a Blender executable on Linux."));
        assert!(report.contains("- Windows:"));
        assert!(report.contains("- macOS:"));
        assert!(report.contains("- Linux:"));
        assert_eq!(runner.calls().len(), crate::locator::BLENDER_CANDIDATES.len());
    }

    #[tokio::test]
    async fn failed_run_sweeps_temp_scripts_and_shows_output() {
        let desktop = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        std::fs::write(temp.path().join("bvtk_import_123.py"), "leftover").unwrap();
        std::fs::write(temp.path().join("unrelated.txt"), "keep").unwrap();
        let runner = Arc::new(FakeRunner::new(|_, _| {
            Ok(exited(1, "Reading JSON\n", "ModuleNotFoundError: BVtkNodes\n"))
        }));
        let ctx = context(desktop.path(), temp.path(), runner.clone());

        let mut request = params("demo.json");
        request.blender_executable = Some("/opt/blender/blender".to_string());
        let report = import_config(&ctx, request).await;

        assert!(report.starts_with("❌ Importing the BVtkNodes configuration failed"));
        assert!(report.contains("Blender exited with code 1"));
        assert!(report.contains("ModuleNotFoundError: BVtkNodes"));
        assert!(report.contains("background_mode: false"));
        assert_eq!(runner.calls().len(), 1, "explicit executable skips probing");
        assert_eq!(runner.calls()[0].0, PathBuf::from("/opt/blender/blender"));

        let left: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, ["unrelated.txt"]);
    }

    #[tokio::test]
    async fn timeout_is_reported() {
        let desktop = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        let runner = Arc::new(FakeRunner::new(|_, args| {
            if script_arg(args).is_some() {
                Err(RunError::Timeout {
                    after: Duration::from_secs(120),
                })
            } else {
                Ok(exited(0, "Blender 4.2.0", ""))
            }
        }));
        let ctx = context(desktop.path(), temp.path(), runner);

        let report = import_config(&ctx, params("demo.json")).await;

        assert!(report.contains("Blender did not finish within 120 seconds"), "{report}");
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn configured_default_executable_skips_probing() {
        let desktop = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        let runner = Arc::new(blender_stub());
        let mut ctx = context(desktop.path(), temp.path(), runner.clone());
        ctx.default_blender = Some(PathBuf::from("/opt/blender/blender"));

        let mut request = params("demo.json");
        request.save_blend_file = false;
        import_config(&ctx, request).await;

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PathBuf::from("/opt/blender/blender"));
    }

    #[tokio::test]
    async fn empty_executable_is_located_automatically() {
        let desktop = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        let runner = Arc::new(blender_stub());
        let ctx = context(desktop.path(), temp.path(), runner.clone());

        let request: ImportConfigParams = serde_json::from_value(serde_json::json!({
            "json_filename": "demo.json",
            "blender_executable": "",
        }))
        .unwrap();
        let report = import_config(&ctx, request).await;

        assert!(report.starts_with("🎉"), "{report}");
        let calls = runner.calls();
        assert_eq!(calls[0].0, PathBuf::from("blender"));
        assert_eq!(calls[0].1, [OsString::from("--version")]);
    }

    #[tokio::test]
    #[traced_test]
    async fn failed_script_removal_does_not_fail_the_import() {
        let desktop = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(desktop.path().join("demo.json"), "{}").unwrap();
        // Blender removes the script itself, so the later cleanup finds nothing.
        let runner = Arc::new(FakeRunner::new(|_, args| {
            if let Some(script) = script_arg(args) {
                std::fs::remove_file(script).map_err(RunError::Io)?;
            }
            Ok(exited(0, "Import finished\n", ""))
        }));
        let ctx = context(desktop.path(), temp.path(), runner);

        let mut request = params("demo.json");
        request.save_blend_file = false;
        let report = import_config(&ctx, request).await;

        assert!(report.starts_with("🎉 BVtkNodes configuration imported successfully!"), "{report}");
        assert!(report.contains("Import finished"));
        assert!(logs_contain("temporary file cleanup failed"));
    }
}
