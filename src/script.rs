use std::path::Path;

/// Prefix shared by every temporary import script. The error-path sweep
/// removes files carrying it.
pub const TEMP_SCRIPT_PREFIX: &str = "bvtk_import_";

pub const DEFAULT_NODE_TREE_NAME: &str = "BVTK Node Tree";

/// Inputs baked into the generated Blender script.
#[derive(Debug, Clone)]
pub struct ImportScript<'a> {
    pub json_path: &'a Path,
    pub node_tree_name: &'a str,
    pub clear_existing: bool,
    /// Rendered as an empty string, which the script reads as "do not save".
    pub save_path: Option<&'a Path>,
}

impl ImportScript<'_> {
    pub fn render(&self) -> String {
        let save_path = self
            .save_path
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!(
            "{SCRIPT_HEADER}\
JSON_FILE_PATH = {json_path}
NODE_TREE_NAME = {node_tree}
CLEAR_EXISTING = {clear}
SAVE_BLEND_FILE = {save}
{SCRIPT_BODY}",
            json_path = python_string(&self.json_path.to_string_lossy()),
            node_tree = python_string(self.node_tree_name),
            clear = if self.clear_existing { "True" } else { "False" },
            save = python_string(&save_path),
        )
    }
}

/// Quotes `value` as a Python string literal. JSON string syntax is a subset of
/// Python's, so Windows backslashes and embedded quotes come out escaped.
fn python_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

pub fn temp_script_name(unix_millis: i64) -> String {
    format!("{TEMP_SCRIPT_PREFIX}{unix_millis}.py")
}

const SCRIPT_HEADER: &str = r#""""
BVtkNodes JSON import script, generated by bvtk-mcp.

Run from Blender's Scripting workspace, or with
    blender --python <this file> --python-exit-code 1
"""

import json
import os
import sys

import bpy

"#;

const SCRIPT_BODY: &str = r#"

def import_vtk_json():
    if not os.path.exists(JSON_FILE_PATH):
        print(f"Error: file does not exist - {JSON_FILE_PATH}")
        return False

    if "BVtkNodes" not in bpy.context.preferences.addons:
        bpy.ops.preferences.addon_enable(module="BVtkNodes")
        print("Enabled the BVtkNodes add-on")

    from BVtkNodes.tree import insert_into_node_tree
    from BVtkNodes.cache import BVTKCache

    with open(JSON_FILE_PATH, "r", encoding="utf-8") as f:
        json_data = json.load(f)

    print(f"Read JSON file: {JSON_FILE_PATH}")
    print(f"Nodes: {len(json_data.get('nodes', []))}")
    print(f"Links: {len(json_data.get('links', []))}")

    if NODE_TREE_NAME in bpy.data.node_groups:
        node_tree = bpy.data.node_groups[NODE_TREE_NAME]
        print(f"Using existing node tree: {NODE_TREE_NAME}")
    else:
        node_tree = bpy.data.node_groups.new(NODE_TREE_NAME, "BVTK_NodeTreeType")
        print(f"Created node tree: {NODE_TREE_NAME}")

    settings = bpy.context.scene.bvtknodes_settings
    original_mode = settings.update_mode
    settings.update_mode = "no-automatic-updates"
    try:
        if CLEAR_EXISTING:
            node_tree.nodes.clear()
            print("Cleared existing nodes")
        insert_into_node_tree(node_tree, json_data.get("nodes", []), json_data.get("links", []))
        print("Inserted nodes")
    finally:
        settings.update_mode = original_mode

    if original_mode == "update-all":
        BVTKCache.update_all()
        print("Updated all caches")

    bpy.context.blend_data.is_dirty = True

    if SAVE_BLEND_FILE:
        save_dir = os.path.dirname(SAVE_BLEND_FILE)
        if save_dir:
            os.makedirs(save_dir, exist_ok=True)
        bpy.ops.wm.save_as_mainfile(filepath=SAVE_BLEND_FILE)
        print(f"Saved blend file: {SAVE_BLEND_FILE}")

    print(f"Node tree '{NODE_TREE_NAME}' holds {len(node_tree.nodes)} nodes")
    for i, node in enumerate(node_tree.nodes):
        print(f"  node {i + 1}: {node.name} ({node.bl_idname})")
    return True


if __name__ == "__main__":
    try:
        ok = import_vtk_json()
    except Exception:
        import traceback

        traceback.print_exc()
        ok = False
    print("Import finished" if ok else "Import failed")
    sys.exit(0 if ok else 1)
"#;
