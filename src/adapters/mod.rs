pub mod chat_handler;
pub mod mcp_client;
pub mod session_registry;
