use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::assets::{build_asset, const_asset};
use crate::entries::recent;
use crate::{ContextError, Definition, PeerBuilder, Target};

fn builder() -> ContextBuilder<Getter> {
	ContextBuilder::new(|get, _| get)
}

/// Captures the setup target of a contribution to `entry` in `provide`.
fn setup_target(
	entry: &Entry<String>,
	provide: impl FnOnce(Asset<String>) -> Lifetime,
) -> Target<String> {
	let captured = Rc::new(RefCell::new(None));
	let sink = captured.clone();
	provide(
		const_asset(entry, "value".to_owned())
			.with_setup(move |target| *sink.borrow_mut() = Some(target.clone())),
	);
	captured.borrow_mut().take().expect("setup not called")
}

#[test]
fn context_is_constructed_once() {
	let calls = Rc::new(RefCell::new(0));
	let counter = calls.clone();
	let builder = ContextBuilder::new(move |get, _| {
		*counter.borrow_mut() += 1;
		get
	});

	let first = builder.context();
	let second = builder.context();

	assert!(Rc::ptr_eq(&first, &second));
	assert_eq!(*calls.borrow(), 1);
}

#[test]
fn factory_receives_own_getter() {
	let builder = builder();

	assert_eq!(*builder.context(), builder.getter());
}

#[test]
fn factory_may_read_values() {
	let greeting = recent::<String>("greeting");
	let entry = greeting.clone();
	let builder = ContextBuilder::new(move |get, _| get.get(&entry).unwrap());
	builder.provide(const_asset(&greeting, "hello".to_owned()));

	assert_eq!(*builder.context(), "hello");
}

#[test]
#[should_panic(expected = "while being constructed")]
fn reentrant_construction_panics() {
	let builder: ContextBuilder<u32> = ContextBuilder::new(|_, builder| *builder.context());

	builder.context();
}

#[test]
fn peer_builder_has_no_context() {
	let peer = PeerBuilder::new();
	let entry = recent::<String>("entry");

	let target = setup_target(&entry, |asset| peer.provide(asset));

	assert_eq!(target.try_context::<()>(), Err(ContextError::PeerOnly("peer".into())));
}

#[test]
fn context_type_is_checked() {
	let builder = builder();
	let entry = recent::<String>("entry");

	let target = setup_target(&entry, |asset| builder.provide(asset));

	assert!(Rc::ptr_eq(&target.context::<Getter>(), &builder.context()));
	assert_eq!(
		target.try_context::<String>(),
		Err(ContextError::WrongType {
			builder: "context".into(),
			expected: std::any::type_name::<String>(),
		})
	);
}

#[rstest]
#[case::alone(0, 1)]
#[case::one_peer(1, 2)]
#[case::three_peers(3, 4)]
fn rank_count_adds_peers(#[case] peers: usize, #[case] expected: usize) {
	let options = (0..peers).fold(BuilderOptions::new(), |options, _| {
		options.peer(&PeerBuilder::new())
	});

	let builder = ContextBuilder::with_options(options, |get, _| get);

	assert_eq!(builder.rank_count(), expected);
}

#[test]
fn rank_count_spans_nested_peers() {
	let grandparent = PeerBuilder::new();
	let parent = ContextBuilder::with_options(BuilderOptions::new().peer(&grandparent), |get, _| {
		get
	});
	let child = ContextBuilder::with_options(
		BuilderOptions::new().peer(&parent).peer(&parent.bound_peer()),
		|get, _| get,
	);

	assert_eq!(parent.rank_count(), 2);
	assert_eq!(parent.bound_peer().rank_count(), 2);
	assert_eq!(child.rank_count(), 5);
}

#[test]
fn label_defaults_per_flavour() {
	let named = ContextBuilder::with_options(BuilderOptions::new().label("request"), |get, _| get);

	assert_eq!(builder().label(), "context");
	assert_eq!(PeerBuilder::new().label(), "peer");
	assert_eq!(named.label(), "request");
	assert!(format!("{named:?}").contains("request"));
}

#[test]
fn owning_lifetime_disposes_builder() {
	let owner = Lifetime::new();
	let options = BuilderOptions::new().lifetime(&owner);
	let builder = ContextBuilder::with_options(options, |get, _| get);
	let entry = recent::<String>("entry");
	let built = builder.provide(build_asset(&entry, |_| Ok(Some("built".to_owned()))));

	assert_eq!(builder.get(&entry).unwrap(), "built");
	assert_eq!(builder.core.cache().len(), 1);
	assert_eq!(builder.core.record_count(), 1);

	owner.off();

	assert!(builder.lifetime().is_off());
	assert!(built.is_off());
	assert_eq!(builder.core.cache().len(), 0);
	assert_eq!(builder.core.record_count(), 0);
	assert!(builder.provide(const_asset(&entry, "late".to_owned())).is_off());
	assert_eq!(builder.core.record_count(), 0);
}

#[test]
fn disposal_releases_definitions() {
	let captured = Rc::new(());
	let held = Rc::downgrade(&captured);
	let entry = Entry::new("holder", move |_: &Target<u32>| {
		let captured = captured.clone();
		Definition::new().assign(move |assigner| {
			assigner.assign(Rc::strong_count(&captured) as u32);
			Ok(())
		})
	});
	let builder = builder();
	builder.get(&entry).unwrap();
	drop(entry);
	assert!(held.upgrade().is_some());

	builder.lifetime().off();

	assert!(held.upgrade().is_none());
	assert_eq!(builder.core.record_count(), 0);
}

#[test]
fn getters_compare_by_builder() {
	let first = builder();
	let second = builder();

	assert_eq!(first.getter(), first.getter());
	assert_ne!(first.getter(), second.getter());
	assert_ne!(Getter::default(), Getter::default());
}

#[test]
fn getter_outliving_builder_fails() {
	let entry = recent::<String>("entry");
	let builder = builder();
	builder.provide(const_asset(&entry, "value".to_owned()));
	let getter = builder.getter();
	assert_eq!(getter.get(&entry).unwrap(), "value");

	drop(builder);

	assert!(getter.is_dropped());
	let error = getter.get(&entry).unwrap_err();
	assert_eq!(error.to_string(), "`entry` context is dropped");
}

#[test]
fn provided_lifetime_revokes_contribution() {
	let entry = recent::<String>("entry");
	let builder = builder();
	builder.provide(const_asset(&entry, "first".to_owned()));
	let second = builder.provide(const_asset(&entry, "second".to_owned()));
	assert_eq!(builder.get(&entry).unwrap(), "second");

	second.off();

	assert_eq!(builder.get(&entry).unwrap(), "first");
}
