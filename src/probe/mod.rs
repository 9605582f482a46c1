pub mod parser;
pub mod remote;
pub mod runner;
pub mod tool;

pub use parser::{Dialect, ParsedHop, is_valid_address, parse};
pub use remote::{RemoteHop, RemoteTraceClient};
pub use runner::{PathProber, ProbeError};
pub use tool::{ProbeTool, select_tool};
