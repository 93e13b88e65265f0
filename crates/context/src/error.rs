use std::error::Error;
use std::fmt;
use std::rc::Rc;

use ctxreg_lifetime::OffReason;

use crate::entry::{Entry, EntryId};

/// Failure of a value request or asset iteration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CxError {
	/// No value could be resolved.
	#[error(transparent)]
	Reference(#[from] ReferenceError),
	/// User code raised an error.
	#[error(transparent)]
	Asset(#[from] AssetError),
}

impl CxError {
	/// Wraps an error raised by user placement, build or assign code.
	pub fn asset(error: impl Error + 'static) -> Self {
		Self::Asset(AssetError::new(error))
	}

	/// Returns the not-found failure, if this is one.
	pub fn as_reference(&self) -> Option<&ReferenceError> {
		match self {
			Self::Reference(error) => Some(error),
			Self::Asset(_) => None,
		}
	}
}

/// Underlying cause of a [`ReferenceError`].
#[derive(Debug, Clone)]
pub enum ReferenceCause {
	/// Resolution of another entry failed first.
	Reference(Box<ReferenceError>),
	/// The context was disposed.
	Off(OffReason),
}

/// Not-found failure naming the entry that could not be resolved.
#[derive(Debug, Clone)]
pub struct ReferenceError {
	entry_id: EntryId,
	entry_name: Rc<str>,
	message: String,
	cause: Option<ReferenceCause>,
}

impl ReferenceError {
	/// Creates a failure with a custom message.
	pub fn new<V, A>(entry: &Entry<V, A>, message: impl Into<String>) -> Self {
		Self {
			entry_id: entry.id(),
			entry_name: entry.name_rc(),
			message: message.into(),
			cause: None,
		}
	}

	pub fn no_value<V, A>(entry: &Entry<V, A>) -> Self {
		Self::new(entry, format!("No value for `{entry}`"))
	}

	pub fn no_value_provided<V, A>(entry: &Entry<V, A>) -> Self {
		Self::new(entry, format!("No value provided for `{entry}`"))
	}

	pub fn no_default<V, A>(entry: &Entry<V, A>) -> Self {
		Self::new(entry, format!("`{entry}` has no default value"))
	}

	/// A recent-valued entry read after its context was disposed.
	pub fn unavailable<V, A>(entry: &Entry<V, A>, reason: OffReason) -> Self {
		Self::new(entry, format!("`{entry}` is unavailable: {reason}"))
			.caused_by(ReferenceCause::Off(reason))
	}

	/// A list-valued entry read after its context was disposed.
	pub fn no_longer_available<V, A>(entry: &Entry<V, A>, reason: OffReason) -> Self {
		Self::new(entry, format!("`{entry}` is no longer available: {reason}"))
			.caused_by(ReferenceCause::Off(reason))
	}

	/// A getter or target outlived the builder it resolves in.
	pub fn dropped<V, A>(entry: &Entry<V, A>) -> Self {
		Self::new(entry, format!("`{entry}` context is dropped"))
	}

	/// Chains `cause` to this failure.
	pub fn caused_by(mut self, cause: ReferenceCause) -> Self {
		self.cause = Some(cause);
		self
	}

	pub fn entry_id(&self) -> EntryId {
		self.entry_id
	}

	pub fn entry_name(&self) -> &str {
		&self.entry_name
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn cause(&self) -> Option<&ReferenceCause> {
		self.cause.as_ref()
	}

	/// Returns the disposal reason this failure was raised for, if any.
	pub fn off_reason(&self) -> Option<&OffReason> {
		match &self.cause {
			Some(ReferenceCause::Off(reason)) => Some(reason),
			_ => None,
		}
	}

	/// Returns the chained failure of another entry, if any.
	pub fn referenced(&self) -> Option<&ReferenceError> {
		match &self.cause {
			Some(ReferenceCause::Reference(error)) => Some(error),
			_ => None,
		}
	}
}

impl fmt::Display for ReferenceError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl Error for ReferenceError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match &self.cause {
			Some(ReferenceCause::Reference(error)) => Some(error.as_ref()),
			Some(ReferenceCause::Off(reason)) => reason.error(),
			None => None,
		}
	}
}

/// Error raised by user code, propagated unmodified.
#[derive(Clone)]
pub struct AssetError(Rc<dyn Error + 'static>);

impl AssetError {
	pub fn new(error: impl Error + 'static) -> Self {
		Self(Rc::new(error))
	}

	/// Attempts to view the wrapped error as a concrete type.
	pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
		self.0.downcast_ref::<E>()
	}

	pub fn inner(&self) -> &(dyn Error + 'static) {
		self.0.as_ref()
	}
}

impl fmt::Display for AssetError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

impl fmt::Debug for AssetError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("AssetError").field(&self.0).finish()
	}
}

impl Error for AssetError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		self.0.source()
	}
}

/// Misuse of a builder's context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
	#[error("`{0}` is a peer builder without a context")]
	PeerOnly(Rc<str>),
	#[error("context of `{0}` is requested while being constructed")]
	UnderConstruction(Rc<str>),
	#[error("context of `{builder}` is not a `{expected}`")]
	WrongType { builder: Rc<str>, expected: &'static str },
	#[error("context builder is dropped")]
	Dropped,
}
