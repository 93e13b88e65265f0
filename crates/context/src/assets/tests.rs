use std::cell::Cell;
use std::rc::Rc;

use ctxreg_events::{EventEmitter, ValueTracker};
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::entries::{dynamic, recent, recent_or, single, single_or};
use crate::{
	BuilderOptions, ContextBuilder, CxError, CxValues, Definition, Entry, Flow, Getter, Lifetime,
	PeerBuilder, Target,
};

#[derive(Debug, thiserror::Error)]
#[error("build failed")]
struct BuildFailed;

fn builder() -> ContextBuilder<Getter> {
	ContextBuilder::new(|get, _| get)
}

fn builder_with(options: BuilderOptions) -> ContextBuilder<Getter> {
	ContextBuilder::with_options(options, |get, _| get)
}

/// Build function appending `suffix` to the value of `origin`, counting calls.
fn suffixed(
	origin: &Entry<String>,
	suffix: &'static str,
) -> (Rc<Cell<usize>>, impl Fn(&Target<String>) -> Result<Option<String>, CxError> + 'static) {
	let calls = Rc::new(Cell::new(0));
	let counter = calls.clone();
	let origin = origin.clone();
	let build = move |target: &Target<String>| {
		counter.set(counter.get() + 1);
		Ok(Some(format!("{}{suffix}", target.get(&origin)?)))
	};
	(calls, build)
}

#[test]
fn const_and_none_assets_place_in_order() {
	let builder = builder();
	let entry = dynamic::<u32>("numbers");

	builder.provide(const_asset(&entry, 1));
	builder.provide(none_asset(&entry));
	builder.provide(const_asset(&entry, 2));

	assert_eq!(builder.get(&entry).unwrap(), vec![1, 2]);
}

#[test]
fn explicit_lifetime_bounds_contribution() {
	let builder = builder();
	let entry = dynamic::<u32>("numbers");
	let lifetime = Lifetime::new();

	let provided = builder.provide(const_asset(&entry, 1).with_lifetime(&lifetime));
	assert_eq!(provided, lifetime);
	assert_eq!(builder.get(&entry).unwrap(), vec![1]);

	lifetime.off();

	assert_eq!(builder.get(&entry).unwrap(), Vec::<u32>::new());
}

#[test]
fn build_runs_once_per_context() {
	let entry1 = recent::<String>("entry 1");
	let entry2 = recent::<String>("entry 2");
	let peer = PeerBuilder::new();
	let builder1 = builder_with(BuilderOptions::new().peer(&peer));
	let builder2 = builder_with(BuilderOptions::new().peer(&peer));
	let (calls, build) = suffixed(&entry1, "!");

	builder1.provide(const_asset(&entry1, "1".to_owned()));
	builder2.provide(const_asset(&entry1, "2".to_owned()));
	peer.provide(build_asset(&entry2, build));

	assert_eq!(builder1.get(&entry1).unwrap(), "1");
	assert_eq!(builder2.get(&entry1).unwrap(), "2");
	assert_eq!(builder1.get(&entry2).unwrap(), "1!");
	assert_eq!(builder2.get(&entry2).unwrap(), "2!");
	assert_eq!(builder2.get(&entry2).unwrap(), "2!");
	assert_eq!(builder1.get(&entry2).unwrap(), "1!");
	assert_eq!(calls.get(), 2);
}

#[test]
fn build_runs_once_through_bound_peer() {
	let entry1 = recent::<String>("entry 1");
	let entry2 = recent::<String>("entry 2");
	let peer1 = PeerBuilder::new();
	let peer2 = PeerBuilder::new();
	let builder1 = builder_with(BuilderOptions::new().peer(&peer1));
	let builder2 = builder_with(BuilderOptions::new().peer(&builder1.bound_peer()).peer(&peer2));
	let (calls, build) = suffixed(&entry1, "!");

	peer1.provide(const_asset(&entry1, "1".to_owned()));
	peer1.provide(build_asset(&entry2, build));
	peer2.provide(const_asset(&entry1, "2".to_owned()));

	assert_eq!(builder2.get(&entry1).unwrap(), "2");
	assert_eq!(builder1.get(&entry1).unwrap(), "1");
	assert_eq!(builder1.get(&entry2).unwrap(), "1!");
	assert_eq!(builder2.get(&entry2).unwrap(), "1!");
	assert_eq!(builder2.get(&entry2).unwrap(), "1!");
	assert_eq!(builder1.get(&entry2).unwrap(), "1!");
	assert_eq!(calls.get(), 1);
}

#[test]
fn build_cache_is_cleared_once_revoked() {
	let entry1 = recent::<String>("entry 1");
	let entry2 = recent::<String>("entry 2");
	let peer = PeerBuilder::new();
	let builder1 = builder_with(BuilderOptions::new().peer(&peer));
	let builder2 = builder_with(BuilderOptions::new().peer(&peer));
	let lifetime = Lifetime::new();
	let (calls1, build1) = suffixed(&entry1, ".1");
	let (calls2, build2) = suffixed(&entry1, ".2");

	builder1.provide(const_asset(&entry1, "1".to_owned()));
	builder2.provide(const_asset(&entry1, "2".to_owned()));
	peer.provide(build_asset(&entry2, build1));
	builder2.provide(build_asset(&entry2, build2).with_lifetime(&lifetime));

	assert_eq!(builder1.get(&entry2).unwrap(), "1.1");
	assert_eq!(builder2.get(&entry2).unwrap(), "2.2");
	assert_eq!(builder2.get(&entry2).unwrap(), "2.2");
	assert_eq!(builder1.get(&entry2).unwrap(), "1.1");
	assert_eq!((calls1.get(), calls2.get()), (1, 1));

	lifetime.off();

	assert_eq!(builder1.get(&entry2).unwrap(), "1.1");
	assert_eq!(builder2.get(&entry2).unwrap(), "2.1");
	assert_eq!(builder2.get(&entry2).unwrap(), "2.1");
	assert_eq!(builder1.get(&entry2).unwrap(), "1.1");
	assert_eq!((calls1.get(), calls2.get()), (2, 1));
}

#[test]
fn build_returning_nothing_places_nothing() {
	let builder = builder();
	let entry = dynamic::<u32>("numbers");

	builder.provide(const_asset(&entry, 1));
	builder.provide(build_asset(&entry, |_| Ok(None)));

	assert_eq!(builder.get(&entry).unwrap(), vec![1]);
}

/// Forwards lists sent to `assets` into the sink.
fn forward(
	assets: &EventEmitter<Vec<u32>>,
) -> impl Fn(&Target<Vec<u32>, u32>, AssetSink<u32>, &Lifetime) + 'static {
	let assets = assets.clone();
	move |_: &Target<Vec<u32>, u32>, sink: AssetSink<u32>, tracking: &Lifetime| {
		assets.on(move |list: &Vec<u32>| sink.send(list.iter().copied()), tracking);
	}
}

#[test]
fn tracked_lists_replace_dynamic_value() {
	let builder = builder();
	let entry = dynamic::<u32>("numbers");
	let assets = EventEmitter::new();
	builder.provide(track_asset(&entry, forward(&assets)));

	assert_eq!(builder.get(&entry).unwrap(), Vec::<u32>::new());

	assets.send(vec![1, 2, 3]);
	assert_eq!(builder.get(&entry).unwrap(), vec![1, 2, 3]);

	assets.send(vec![4, 5]);
	assert_eq!(builder.get(&entry).unwrap(), vec![4, 5]);
}

#[test]
fn tracked_lists_update_recent_value() {
	let builder = builder();
	let entry: Entry<u32> = recent_or("number", |_| 0);
	let assets = EventEmitter::<Vec<u32>>::new();
	let source = assets.clone();
	builder.provide(track_asset(&entry, move |_, sink, tracking| {
		source.on(move |list: &Vec<u32>| sink.send(list.iter().copied()), tracking);
	}));

	assert_eq!(builder.get(&entry).unwrap(), 0);

	assets.send(vec![1, 2, 3]);
	assert_eq!(builder.get(&entry).unwrap(), 3);

	assets.send(vec![4, 5]);
	assert_eq!(builder.get(&entry).unwrap(), 5);
}

#[test]
fn tracked_assets_are_pulled_on_demand() {
	let builder = builder();
	let entry = Entry::new("first", |target: &Target<u32>| {
		let target = target.clone();
		Definition::new()
			.assign(move |assigner| {
				target.each_asset(|asset| {
					assigner.assign(asset);
					Flow::Stop
				})
			})
			.assign_default(|assigner| {
				assigner.assign(0);
				Ok(())
			})
	});
	let assets = EventEmitter::<Vec<u32>>::new();
	let source = assets.clone();
	builder.provide(track_asset(&entry, move |_, sink, tracking| {
		source.on(move |list: &Vec<u32>| sink.send(list.iter().copied()), tracking);
	}));

	assert_eq!(builder.get(&entry).unwrap(), 0);

	assets.send(vec![1, 2, 3]);
	assert_eq!(builder.get(&entry).unwrap(), 1);

	assets.send(vec![4, 5]);
	assert_eq!(builder.get(&entry).unwrap(), 4);
}

#[test]
fn sink_stops_once_revoked() {
	let builder = builder();
	let entry = dynamic::<u32>("numbers");
	let assets = EventEmitter::new();
	let lifetime = builder.provide(track_asset(&entry, forward(&assets)));
	assets.send(vec![1]);
	assert_eq!(builder.get(&entry).unwrap(), vec![1]);

	lifetime.off();
	assets.send(vec![2]);

	assert_eq!(builder.get(&entry).unwrap(), Vec::<u32>::new());
	assert!(assets.is_empty());
}

#[rstest]
#[case::present(true, vec![1, 2])]
#[case::absent(false, vec![])]
fn event_source_feeds_assets(#[case] present: bool, #[case] expected: Vec<u32>) {
	let builder = builder();
	let entry = dynamic::<u32>("numbers");
	let source = ValueTracker::new(vec![1, 2]);
	let tracked = source.clone();

	builder.provide(on_asset(&entry, move |_| present.then(|| tracked.clone())));

	assert_eq!(builder.get(&entry).unwrap(), expected);
}

#[test]
fn event_source_updates_follow() {
	let builder = builder();
	let entry = dynamic::<u32>("numbers");
	let source = ValueTracker::new(vec![1]);
	let tracked = source.clone();
	builder.provide(on_asset(&entry, move |_| Some(tracked.clone())));
	assert_eq!(builder.get(&entry).unwrap(), vec![1]);

	source.set(vec![2, 3]);

	assert_eq!(builder.get(&entry).unwrap(), vec![2, 3]);
}

#[test]
fn alias_places_origin_value() {
	let builder = builder();
	let origin = single::<String>("origin");
	let alias = single::<String>("alias");
	builder.provide(alias_asset(&alias, &origin));
	builder.provide(const_asset(&origin, "aliased".to_owned()));

	assert_eq!(builder.context().get(&alias).unwrap(), "aliased");
}

#[test]
fn alias_reports_missing_origin() {
	let builder = builder();
	let origin = single::<String>("origin");
	let alias = single::<String>("alias");
	builder.provide(alias_asset(&alias, &origin));

	let error = builder.get(&alias).unwrap_err();

	let error = error.as_reference().expect("reference error");
	assert_eq!(error.entry_id(), alias.id());
	assert_eq!(error.message(), "No value for `alias`");
	let cause = error.referenced().expect("origin failure");
	assert_eq!(cause.entry_id(), origin.id());
	assert_eq!(cause.message(), "No value for `origin`");
	assert!(cause.cause().is_none());
}

#[test]
fn alias_places_origin_default() {
	let builder = builder();
	let alias = single::<String>("alias");
	builder.provide(alias_asset(&alias, &single::<String>("missing")));
	let origin = single_or("origin", |_| "default".to_owned());
	builder.provide(alias_asset(&alias, &origin));

	assert_eq!(builder.get(&alias).unwrap(), "default");
}

#[test]
fn alias_passes_origin_errors_through() {
	let builder = builder();
	let origin = single::<String>("origin");
	let alias = single::<String>("alias");
	builder.provide(alias_asset(&alias, &origin));
	builder.provide(build_asset(&origin, |_| Err(CxError::asset(BuildFailed))));

	let error = builder.get(&alias).unwrap_err();

	match error {
		CxError::Asset(error) => assert!(error.downcast_ref::<BuildFailed>().is_some()),
		other => panic!("unexpected error {other}"),
	}
}
