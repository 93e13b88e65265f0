use std::fmt;
use std::rc::Weak;

use super::BuilderCore;
use crate::entry::Entry;
use crate::error::{CxError, ReferenceError};
use crate::request::Request;
use crate::target::Target;

/// Read access to entry values of a context.
pub trait CxValues {
	/// Resolves `entry` for `request`.
	///
	/// Returns `Ok(None)` only for nullable requests that resolved to nothing.
	fn resolve<V: 'static, A: 'static>(
		&self,
		entry: &Entry<V, A>,
		request: Request<V>,
	) -> Result<Option<V>, CxError>;

	fn get<V: 'static, A: 'static>(&self, entry: &Entry<V, A>) -> Result<V, CxError> {
		self.get_with(entry, Request::new())
	}

	fn get_with<V: 'static, A: 'static>(
		&self,
		entry: &Entry<V, A>,
		request: Request<V>,
	) -> Result<V, CxError> {
		self.resolve(entry, request)?
			.ok_or_else(|| ReferenceError::no_value(entry).into())
	}

	/// Like [`get`](Self::get), but yields `None` where the plain request would
	/// fail for lack of a value.
	fn get_opt<V: 'static, A: 'static>(&self, entry: &Entry<V, A>) -> Result<Option<V>, CxError> {
		self.get_opt_with(entry, Request::new())
	}

	fn get_opt_with<V: 'static, A: 'static>(
		&self,
		entry: &Entry<V, A>,
		request: Request<V>,
	) -> Result<Option<V>, CxError> {
		self.resolve(entry, request.nullable())
	}
}

/// Resolver of one context.
///
/// Holds its builder weakly: requests made after the builder is dropped fail.
/// Two getters are equal when they resolve through the same builder.
#[derive(Clone, Default)]
pub struct Getter {
	builder: Weak<BuilderCore>,
}

impl Getter {
	pub(crate) fn new(builder: Weak<BuilderCore>) -> Self {
		Self { builder }
	}

	/// Whether `target` belongs to the context of this getter.
	pub fn is_context_of<V: 'static, A: 'static>(&self, target: &Target<V, A>) -> bool {
		*self == target.getter()
	}

	pub fn is_dropped(&self) -> bool {
		self.builder.strong_count() == 0
	}
}

impl CxValues for Getter {
	fn resolve<V: 'static, A: 'static>(
		&self,
		entry: &Entry<V, A>,
		request: Request<V>,
	) -> Result<Option<V>, CxError> {
		match self.builder.upgrade() {
			Some(core) => core.get(entry, request),
			None => Err(ReferenceError::dropped(entry).into()),
		}
	}
}

impl PartialEq for Getter {
	fn eq(&self, other: &Self) -> bool {
		!self.is_dropped() && Weak::ptr_eq(&self.builder, &other.builder)
	}
}

impl Eq for Getter {}

impl fmt::Debug for Getter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.builder.upgrade() {
			Some(core) => f.debug_tuple("Getter").field(&core.label()).finish(),
			None => f.write_str("Getter(<dropped>)"),
		}
	}
}
