//! Stock contribution constructors.
//!
//! Every constructor returns an [`Asset`](crate::Asset) that can be further
//! configured with [`with_lifetime`](crate::Asset::with_lifetime) and
//! [`with_setup`](crate::Asset::with_setup) before it is provided.

mod alias;
mod build;
mod constant;
mod sink;
#[cfg(test)]
mod tests;

pub use self::alias::alias_asset;
pub use self::build::build_asset;
pub use self::constant::{const_asset, none_asset};
pub use self::sink::{AssetSink, on_asset, track_asset};
