//! JSON-RPC facade over the agents.

mod facade;
mod protocol;

pub use facade::{
    NoArgs, SwitchModelArgs, all_tools, discovery, handle, handle_raw, prompts, resources,
    server_info, standard_tools,
};
pub use protocol::{McpRequest, McpResponse, PROTOCOL_VERSION};
