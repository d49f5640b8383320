mod interface;
#[cfg(not(target_arch = "wasm32"))]
mod mono_clock;
mod system_clock;

pub use interface::*;
#[cfg(not(target_arch = "wasm32"))]
pub use mono_clock::*;
pub use system_clock::*;
