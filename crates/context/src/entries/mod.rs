//! Stock entry kinds.

mod dynamic;
mod evaluated;
mod lifetime;
mod recent;
mod scoped;
mod single;
mod tracked;

pub use self::dynamic::{DynamicOptions, dynamic, dynamic_with};
pub use self::evaluated::{evaluated, evaluated_or};
pub use self::lifetime::context_lifetime;
pub use self::recent::{RecentOptions, recent, recent_or, recent_with};
pub use self::scoped::scoped;
pub use self::single::{single, single_or};
