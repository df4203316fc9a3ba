mod compiler;
mod message;

pub use compiler::CompilerNamespace;
pub use message::{WasmCompiledMessage, WasmVaultTransactionMessage};
