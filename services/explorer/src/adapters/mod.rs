pub mod http;
pub mod leave_guard;
mod sse;
pub mod storage;

pub use http::HttpBackend;
pub use leave_guard::ConsoleLeaveGuard;
pub use storage::FileStore;
