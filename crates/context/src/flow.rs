/// Result of an asset callback: keep iterating or stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Flow {
	#[default]
	Continue,
	Stop,
}

impl Flow {
	#[inline]
	pub fn is_continue(self) -> bool {
		matches!(self, Self::Continue)
	}

	#[inline]
	pub fn is_stop(self) -> bool {
		matches!(self, Self::Stop)
	}
}

impl From<bool> for Flow {
	/// `true` continues, `false` stops.
	fn from(go_on: bool) -> Self {
		if go_on { Self::Continue } else { Self::Stop }
	}
}
