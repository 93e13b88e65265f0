use std::error::Error;
use std::fmt;
use std::rc::Rc;

/// Why a [`Lifetime`](crate::Lifetime) was cut off.
///
/// Either empty (a plain [`off`](crate::Lifetime::off)) or a shared error value.
#[derive(Clone, Default)]
pub struct OffReason(Option<Rc<dyn Error + 'static>>);

impl OffReason {
	/// Reason for a plain cut off.
	pub fn none() -> Self {
		Self(None)
	}

	/// Wraps an error as the reason.
	pub fn from_error(error: impl Error + 'static) -> Self {
		Self(Some(Rc::new(error)))
	}

	/// Returns the underlying error, if any.
	pub fn error(&self) -> Option<&(dyn Error + 'static)> {
		self.0.as_deref()
	}

	/// Returns true when no error was given.
	pub fn is_none(&self) -> bool {
		self.0.is_none()
	}

	/// Attempts to view the reason as a concrete error type.
	pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
		self.error()?.downcast_ref::<E>()
	}
}

impl fmt::Display for OffReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0 {
			Some(error) => fmt::Display::fmt(error, f),
			None => f.write_str("no reason"),
		}
	}
}

impl fmt::Debug for OffReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0 {
			Some(error) => f.debug_tuple("OffReason").field(error).finish(),
			None => f.write_str("OffReason(None)"),
		}
	}
}
