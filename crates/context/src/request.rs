use std::fmt;

/// How a value is requested, and how a resolved value was obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum RequestMethod {
	/// Explicitly provided assets only.
	Assets = 1,
	/// Assets first, then the entry default.
	#[default]
	Fallback = 0,
	/// The entry default only.
	Defaults = -1,
}

type Observer<V> = Box<dyn FnOnce(&V, RequestMethod)>;

/// Per-call value request.
///
/// ```
/// # use ctxreg::{Request, RequestMethod};
/// let request = Request::new().by(RequestMethod::Assets).or(0);
/// assert_eq!(request.method(), RequestMethod::Assets);
/// ```
pub struct Request<V> {
	pub(crate) by: RequestMethod,
	pub(crate) or: Option<V>,
	pub(crate) nullable: bool,
	pub(crate) observe: Option<Observer<V>>,
}

impl<V> Default for Request<V> {
	fn default() -> Self {
		Self {
			by: RequestMethod::default(),
			or: None,
			nullable: false,
			observe: None,
		}
	}
}

impl<V> Request<V> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the resolution mode.
	pub fn by(mut self, by: RequestMethod) -> Self {
		self.by = by;
		self
	}

	/// Sets the value returned when nothing else resolves.
	pub fn or(mut self, fallback: V) -> Self {
		self.or = Some(fallback);
		self
	}

	/// Registers a callback receiving the resolved value and the method that produced it.
	pub fn observe(mut self, observer: impl FnOnce(&V, RequestMethod) + 'static) -> Self {
		self.observe = Some(Box::new(observer));
		self
	}

	pub fn method(&self) -> RequestMethod {
		self.by
	}

	/// Configures an empty fallback: resolution yields `None` instead of failing.
	pub(crate) fn nullable(mut self) -> Self {
		self.nullable = true;
		self
	}

	pub(crate) fn has_fallback(&self) -> bool {
		self.or.is_some() || self.nullable
	}
}

impl<V: fmt::Debug> fmt::Debug for Request<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Request")
			.field("by", &self.by)
			.field("or", &self.or)
			.field("nullable", &self.nullable)
			.field("observe", &self.observe.is_some())
			.finish()
	}
}

/// Outcome of the precedence ladder before the request fallback is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution<V> {
	Value(V, RequestMethod),
	Fallback,
}
