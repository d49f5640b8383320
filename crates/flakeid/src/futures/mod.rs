mod generator;
#[cfg(any(feature = "async-tokio", feature = "async-smol"))]
mod runtime;
mod sleep_provider;

pub use generator::*;
#[cfg_attr(docsrs, doc(cfg(any(feature = "async-tokio", feature = "async-smol"))))]
#[cfg(any(feature = "async-tokio", feature = "async-smol"))]
pub use runtime::*;
pub use sleep_provider::*;
