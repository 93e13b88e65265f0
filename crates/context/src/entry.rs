use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CxError;
use crate::request::RequestMethod;
use crate::target::Target;

static NEXT_ENTRY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
	fn next() -> Self {
		Self(NEXT_ENTRY.fetch_add(1, Ordering::Relaxed))
	}

	#[inline]
	pub fn as_u64(self) -> u64 {
		self.0
	}
}

type Definer<V, A> = dyn Fn(&Target<V, A>) -> Definition<V>;

struct EntryInner<V, A> {
	id: EntryId,
	name: Rc<str>,
	define: Box<Definer<V, A>>,
}

/// A named slot holding values of type `V`, populated from assets of type `A`.
///
/// Entries compare by identity: two entries are equal only when one is a clone
/// of the other, regardless of their names.
pub struct Entry<V, A = V>(Rc<EntryInner<V, A>>);

impl<V, A> Entry<V, A> {
	/// Creates an entry. `define` runs once per context, on the first request.
	pub fn new(
		name: impl Into<Rc<str>>,
		define: impl Fn(&Target<V, A>) -> Definition<V> + 'static,
	) -> Self {
		Self(Rc::new(EntryInner {
			id: EntryId::next(),
			name: name.into(),
			define: Box::new(define),
		}))
	}

	#[inline]
	pub fn id(&self) -> EntryId {
		self.0.id
	}

	pub fn name(&self) -> &str {
		&self.0.name
	}

	pub(crate) fn name_rc(&self) -> Rc<str> {
		self.0.name.clone()
	}

	pub(crate) fn define(&self, target: &Target<V, A>) -> Definition<V> {
		(self.0.define)(target)
	}
}

impl<V, A> Clone for Entry<V, A> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<V, A> PartialEq for Entry<V, A> {
	fn eq(&self, other: &Self) -> bool {
		self.0.id == other.0.id
	}
}

impl<V, A> Eq for Entry<V, A> {}

impl<V, A> Hash for Entry<V, A> {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.0.id.hash(state);
	}
}

impl<V, A> fmt::Display for Entry<V, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0.name)
	}
}

impl<V, A> fmt::Debug for Entry<V, A> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entry")
			.field("id", &self.0.id)
			.field("name", &self.0.name)
			.finish()
	}
}

/// Receives the value computed by a [`Definition`].
///
/// The last assigned value wins. The assigner also tells how the value is
/// requested.
pub struct Assigner<V> {
	default_by: RequestMethod,
	requested_by: RequestMethod,
	has_fallback: bool,
	received: Option<(V, RequestMethod)>,
}

impl<V> Assigner<V> {
	fn new(default_by: RequestMethod, requested_by: RequestMethod, has_fallback: bool) -> Self {
		Self {
			default_by,
			requested_by,
			has_fallback,
			received: None,
		}
	}

	/// How the running request may obtain the value.
	pub fn requested_by(&self) -> RequestMethod {
		self.requested_by
	}

	/// Whether the running request carries an explicit fallback value.
	pub fn has_fallback(&self) -> bool {
		self.has_fallback
	}

	/// Assigns a value classified the way the running operation implies:
	/// [`Assets`](RequestMethod::Assets) from `assign`,
	/// [`Defaults`](RequestMethod::Defaults) from `assign_default`.
	pub fn assign(&mut self, value: V) {
		self.received = Some((value, self.default_by));
	}

	/// Assigns a value with an explicit classification.
	pub fn assign_by(&mut self, value: V, by: RequestMethod) {
		self.received = Some((value, by));
	}

	pub fn is_assigned(&self) -> bool {
		self.received.is_some()
	}
}

/// Assign operation of a [`Definition`].
pub type AssignFn<V> = Box<dyn Fn(&mut Assigner<V>) -> Result<(), CxError>>;

/// Per-context strategy turning assets into a value.
///
/// Both operations are optional. A definition with neither never resolves.
pub struct Definition<V> {
	assign: Option<AssignFn<V>>,
	assign_default: Option<AssignFn<V>>,
}

impl<V> Default for Definition<V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<V> Definition<V> {
	pub fn new() -> Self {
		Self {
			assign: None,
			assign_default: None,
		}
	}

	/// Sets the operation computing an explicitly provided value.
	pub fn assign(
		mut self,
		assign: impl Fn(&mut Assigner<V>) -> Result<(), CxError> + 'static,
	) -> Self {
		self.assign = Some(Box::new(assign));
		self
	}

	/// Sets the operation computing a default value.
	pub fn assign_default(
		mut self,
		assign: impl Fn(&mut Assigner<V>) -> Result<(), CxError> + 'static,
	) -> Self {
		self.assign_default = Some(Box::new(assign));
		self
	}

	/// A definition failing every request with `error`.
	pub fn failing(error: CxError) -> Self {
		Self::new().assign(move |_| Err(error.clone()))
	}

	pub(crate) fn has_assign_default(&self) -> bool {
		self.assign_default.is_some()
	}

	pub(crate) fn run_assign(
		&self,
		by: RequestMethod,
		has_fallback: bool,
	) -> Result<Option<(V, RequestMethod)>, CxError> {
		run(self.assign.as_ref(), Assigner::new(RequestMethod::Assets, by, has_fallback))
	}

	pub(crate) fn run_assign_default(
		&self,
		by: RequestMethod,
		has_fallback: bool,
	) -> Result<Option<(V, RequestMethod)>, CxError> {
		let assigner = Assigner::new(RequestMethod::Defaults, by, has_fallback);
		run(self.assign_default.as_ref(), assigner)
	}
}

fn run<V>(
	assign: Option<&AssignFn<V>>,
	mut assigner: Assigner<V>,
) -> Result<Option<(V, RequestMethod)>, CxError> {
	let Some(assign) = assign else {
		return Ok(None);
	};
	assign(&mut assigner)?;
	Ok(assigner.received)
}

impl<V> fmt::Debug for Definition<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Definition")
			.field("assign", &self.assign.is_some())
			.field("assign_default", &self.assign_default.is_some())
			.finish()
	}
}
