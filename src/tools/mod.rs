//! 工具层：工具目录解析、注册表与名称解析、HTTP 搜索后端、响应归一化、搜索分发

pub mod catalog;
pub mod dispatcher;
pub mod normalize;
pub mod registry;
pub mod search;

pub use catalog::{load_catalog, parse_catalog, Catalog, InvocationMethod, ToolEntry};
pub use dispatcher::{SearchBatch, SearchDispatcher, TOOL_DISABLED_ERROR};
pub use normalize::{normalize, ResponseShape, SearchResultItem};
pub use registry::ToolRegistry;
pub use search::{HttpSearchBackend, SearchBackend};
