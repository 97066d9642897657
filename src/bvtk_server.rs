use crate::tools::analyze::{analyze_config, AnalyzeConfigParams};
use crate::tools::generate::{generate_script, GenerateScriptParams};
use crate::tools::import::{import_config, ImportConfigParams};
use crate::tools::list::list_json_files;
use crate::tools::ToolContext;
use rmcp::{
    handler::server::tool::Parameters,
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use std::future::Future;
use std::sync::Arc;

#[derive(Clone)]
pub struct BvtkServer {
    ctx: Arc<ToolContext>,
    tool_router: rmcp::handler::server::tool::ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for BvtkServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Imports BVtkNodes JSON configurations from the user's desktop into Blender. \
                 Use list-desktop-json-files and analyze-bvtk-config to inspect files, \
                 import-bvtk-config to run the import, or generate-import-script to get a \
                 script that can be run by hand."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl BvtkServer {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "import-bvtk-config",
        description = "Import a JSON configuration from the desktop into a Blender BVtkNodes node tree, optionally saving a .blend file"
    )]
    async fn import_bvtk_config(
        &self,
        Parameters(args): Parameters<ImportConfigParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::debug!("import-bvtk-config: {args:?}");
        text_result(import_config(&self.ctx, args).await)
    }

    #[tool(
        name = "generate-import-script",
        description = "Generate a standalone Python script on the desktop that imports a JSON configuration into Blender when run manually"
    )]
    async fn generate_import_script(
        &self,
        Parameters(args): Parameters<GenerateScriptParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::debug!("generate-import-script: {args:?}");
        text_result(generate_script(&self.ctx, args).await)
    }

    #[tool(
        name = "analyze-bvtk-config",
        description = "Analyze the structure of a BVtkNodes JSON configuration on the desktop without validating it"
    )]
    async fn analyze_bvtk_config(
        &self,
        Parameters(args): Parameters<AnalyzeConfigParams>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::debug!("analyze-bvtk-config: {args:?}");
        text_result(analyze_config(&self.ctx, args).await)
    }

    #[tool(
        name = "list-desktop-json-files",
        description = "List the JSON files on the user's desktop with their node and link counts"
    )]
    async fn list_desktop_json_files(&self) -> Result<CallToolResult, ErrorData> {
        text_result(list_json_files(&self.ctx).await)
    }
}

// Tool failures travel inside the text, so the protocol result is always a success.
fn text_result(text: String) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}
