//! Tool-manager registration and plugin discovery.

pub mod registry;

pub use registry::{
    get_tool_registry, ToolConfig, ToolDeclaration, ToolInfo, ToolManager, ToolManagerFactory,
    ToolPlugin, ToolRegistry, PLUGIN_GROUP, TOOL_MANAGER_DIMENSION,
};
