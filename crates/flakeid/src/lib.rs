#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
#[cfg(feature = "futures")]
mod futures;
mod generator;
mod layout;
mod time;

pub use crate::config::*;
pub use crate::error::*;
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
#[cfg(feature = "futures")]
pub use crate::futures::*;
pub use crate::generator::*;
pub use crate::layout::*;
pub use crate::time::*;
