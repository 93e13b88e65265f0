use std::rc::Rc;

use crate::entry::{Definition, Entry};
use crate::error::CxError;
use crate::memo::Memo;
use crate::target::Target;

type EvaluateFn<V, A> = Rc<dyn Fn(&Target<V, A>) -> Result<Option<V>, CxError>>;
type DefaultFn<V, A> = Rc<dyn Fn(&Target<V, A>) -> V>;

/// Entry evaluated once per context from its target.
///
/// A failed evaluation is not remembered and runs again on the next request.
pub fn evaluated<V: Clone + 'static, A: 'static>(
	name: impl Into<Rc<str>>,
	evaluate: impl Fn(&Target<V, A>) -> Result<Option<V>, CxError> + 'static,
) -> Entry<V, A> {
	let evaluate: EvaluateFn<V, A> = Rc::new(evaluate);
	Entry::new(name, move |target: &Target<V, A>| define(target, evaluate.clone(), None))
}

/// Like [`evaluated`], with a default used when evaluation yields nothing.
pub fn evaluated_or<V: Clone + 'static, A: 'static>(
	name: impl Into<Rc<str>>,
	evaluate: impl Fn(&Target<V, A>) -> Result<Option<V>, CxError> + 'static,
	by_default: impl Fn(&Target<V, A>) -> V + 'static,
) -> Entry<V, A> {
	let evaluate: EvaluateFn<V, A> = Rc::new(evaluate);
	let by_default: DefaultFn<V, A> = Rc::new(by_default);
	Entry::new(name, move |target: &Target<V, A>| {
		define(target, evaluate.clone(), Some(by_default.clone()))
	})
}

fn define<V: Clone + 'static, A: 'static>(
	target: &Target<V, A>,
	evaluate: EvaluateFn<V, A>,
	by_default: Option<DefaultFn<V, A>>,
) -> Definition<V> {
	let value = Memo::new();
	let owner = target.clone();
	let definition = Definition::new().assign(move |assigner| {
		if let Some(value) = value.get_or_try_init(|| evaluate(&owner))? {
			assigner.assign(value);
		}
		Ok(())
	});
	let Some(by_default) = by_default else {
		return definition;
	};
	let owner = target.clone();
	definition.assign_default(move |assigner| {
		assigner.assign(by_default(&owner));
		Ok(())
	})
}
