//! End-to-end scenarios over the public API.

use std::cell::RefCell;
use std::rc::Rc;

use ctxreg::assets::{build_asset, const_asset, none_asset};
use ctxreg::entries::{dynamic, recent};
use ctxreg::{
	Asset, BuilderOptions, ContextBuilder, CxError, CxValues, Definition, Entry, Flow, Getter,
	Lifetime, PeerBuilder, ProvidedAsset, Request, RequestMethod, Target,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::{fixture, rstest};
use {ctxreg_events as _, ctxreg_lifetime as _, tracing as _};
use {indexmap as _, rustc_hash as _, smallvec as _};

#[derive(Debug, thiserror::Error)]
#[error("request finished")]
struct Finished;

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Parent builder and a child listing it as its only peer.
struct Family {
	parent: ContextBuilder<Getter>,
	child: ContextBuilder<Getter>,
}

#[fixture]
fn family() -> Family {
	init_tracing();
	let parent = ContextBuilder::with_options(BuilderOptions::new().label("parent"), |get, _| get);
	let child = ContextBuilder::with_options(
		BuilderOptions::new().label("child").peer(&parent),
		|get, _| get,
	);
	Family { parent, child }
}

/// Places every listed asset in one contribution.
fn place_all(entry: &Entry<Vec<u32>, u32>, assets: Vec<u32>) -> Asset<Vec<u32>, u32> {
	Asset::place(entry, move |_, collector| {
		for asset in &assets {
			if collector(*asset).is_stop() {
				break;
			}
		}
		Ok(())
	})
}

#[rstest]
fn explicit_request_rejects_default_classified_value(family: Family) {
	let entry = Entry::new("ladder", |_: &Target<String>| {
		Definition::new()
			.assign(|assigner| {
				assigner.assign_by("derived default".to_owned(), RequestMethod::Defaults);
				Ok(())
			})
			.assign_default(|assigner| {
				assigner.assign("default".to_owned());
				Ok(())
			})
	});
	let context = family.child.context();

	let error = context.get_with(&entry, Request::new().by(RequestMethod::Assets)).unwrap_err();
	assert_eq!(error.to_string(), "No value provided for `ladder`");

	let request = Request::new().by(RequestMethod::Assets).or("fallback".to_owned());
	assert_eq!(context.get_with(&entry, request).unwrap(), "fallback");
	assert_eq!(context.get(&entry).unwrap(), "derived default");
}

#[rstest]
fn most_recent_wins_across_ranks(family: Family) {
	let entry = recent::<u32>("recent");
	family.child.provide(const_asset(&entry, 11));
	family.child.provide(const_asset(&entry, 12));
	family.child.provide(const_asset(&entry, 13));

	assert_eq!(family.child.get(&entry).unwrap(), 13);
}

#[derive(Debug, Default, Clone, PartialEq)]
struct PerRank {
	recent: Vec<u32>,
	recent_first: Vec<u32>,
	iterated: Vec<u32>,
}

fn per_rank_entry() -> Entry<PerRank, u32> {
	Entry::new("per rank", |target: &Target<PerRank, u32>| {
		let state = Rc::new(RefCell::new(PerRank::default()));
		let sink = state.clone();
		target.track_asset_list(
			move |list: &[ProvidedAsset<u32>]| {
				let mut next = PerRank::default();
				for provided in list {
					if let Some(recent) = provided.recent_asset().unwrap() {
						next.recent.push(*recent.asset());
					}
					provided
						.each_recent_asset(|asset| {
							next.recent_first.push(asset);
							Flow::Continue
						})
						.unwrap();
				}
				*sink.borrow_mut() = next;
			},
			&target.lifetime().derive(),
		);

		let iterate = target.clone();
		Definition::new().assign(move |assigner| {
			let mut value = state.borrow().clone();
			iterate.each_recent_asset(|asset| {
				value.iterated.push(asset);
				Flow::Continue
			})?;
			assigner.assign(value);
			Ok(())
		})
	})
}

#[rstest]
fn recent_per_rank_combines_peer_and_own(family: Family) {
	let entry = per_rank_entry();
	family.parent.provide(const_asset(&entry, 1));
	family.parent.provide(build_asset(&entry, |_| Ok(None)));
	family.child.provide(Asset::place(&entry, |_, collector| {
		for asset in [11, 12, 13] {
			if collector(asset).is_stop() {
				break;
			}
		}
		Ok(())
	}));

	let value = family.child.get(&entry).unwrap();

	assert_eq!(
		value,
		PerRank {
			recent: vec![1, 13],
			recent_first: vec![1, 13, 12, 11],
			iterated: vec![13, 12, 11, 1],
		}
	);
}

#[rstest]
fn revocation_updates_live_list(family: Family) {
	let entry = dynamic::<u32>("numbers");
	let first = family.child.provide(const_asset(&entry, 1));
	family.child.provide(const_asset(&entry, 2));
	assert_eq!(family.child.get(&entry).unwrap(), vec![1, 2]);

	first.off();

	assert_eq!(family.child.get(&entry).unwrap(), vec![2]);
}

#[test]
fn shared_build_runs_once_per_context() {
	init_tracing();
	let name = recent::<String>("name");
	let greeting = recent::<String>("greeting");
	let shared = PeerBuilder::with_options(BuilderOptions::new().label("shared"));
	let first = ContextBuilder::with_options(BuilderOptions::new().peer(&shared), |get, _| get);
	let second = ContextBuilder::with_options(BuilderOptions::new().peer(&shared), |get, _| get);
	let calls = Rc::new(RefCell::new(Vec::new()));
	let log = calls.clone();
	let origin = name.clone();
	shared.provide(build_asset(&greeting, move |target| {
		let name = target.get(&origin)?;
		log.borrow_mut().push(name.clone());
		Ok(Some(format!("hello, {name}")))
	}));
	first.provide(const_asset(&name, "first".to_owned()));
	second.provide(const_asset(&name, "second".to_owned()));

	for _ in 0..2 {
		assert_eq!(first.get(&greeting).unwrap(), "hello, first");
		assert_eq!(second.get(&greeting).unwrap(), "hello, second");
	}

	assert_eq!(*calls.borrow(), vec!["first", "second"]);
}

#[rstest]
#[case::recent(true)]
#[case::dynamic(false)]
fn disposal_reason_is_reported(family: Family, #[case] recent_valued: bool) {
	let recent_entry = recent::<u32>("recent");
	let list_entry = dynamic::<u32>("list");
	family.child.provide(const_asset(&recent_entry, 1));
	family.child.provide(const_asset(&list_entry, 1));
	family.child.get(&recent_entry).unwrap();
	family.child.get(&list_entry).unwrap();

	family.child.lifetime().off_because(Finished);

	let error = if recent_valued {
		family.child.get(&recent_entry).unwrap_err()
	} else {
		family.child.get(&list_entry).map(|_| ()).unwrap_err()
	};
	assert!(error.to_string().ends_with(": request finished"), "{error}");
	let reference = error.as_reference().expect("reference error");
	let reason = reference.off_reason().expect("disposal reason");
	assert!(reason.downcast_ref::<Finished>().is_some());
	assert!(matches!(error, CxError::Reference(_)));
}

/// Chain of three builders: grandparent peer, parent and child.
struct Chain {
	levels: [Box<dyn Fn(Asset<(), u32>) -> Lifetime>; 3],
	child: ContextBuilder<Getter>,
}

fn chain() -> Chain {
	let grandparent = PeerBuilder::new();
	let parent = ContextBuilder::with_options(BuilderOptions::new().peer(&grandparent), |get, _| {
		get
	});
	let child = ContextBuilder::with_options(BuilderOptions::new().peer(&parent), |get, _| get);
	let own = child.clone();
	Chain {
		levels: [
			Box::new(move |asset: Asset<(), u32>| own.provide(asset)),
			Box::new(move |asset: Asset<(), u32>| parent.provide(asset)),
			Box::new(move |asset: Asset<(), u32>| grandparent.provide(asset)),
		],
		child,
	}
}

/// Entry recording `(asset, rank)` of every tracked contribution.
fn rank_entry(seen: &Rc<RefCell<Vec<(u32, usize)>>>) -> Entry<(), u32> {
	let seen = seen.clone();
	Entry::new("ranks", move |target: &Target<(), u32>| {
		let seen = seen.clone();
		target.track_assets(
			move |provided| {
				provided
					.each_asset(|level| {
						seen.borrow_mut().push((level, provided.rank()));
						Flow::Continue
					})
					.unwrap();
			},
			&Lifetime::new(),
		);
		Definition::new()
	})
}

proptest! {
	#[test]
	fn rank_grows_with_peer_distance(
		levels in prop::collection::vec(0..3_u32, 1..12),
		split in any::<prop::sample::Index>(),
	) {
		let chain = chain();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let entry = rank_entry(&seen);
		let split = split.index(levels.len() + 1);

		for (index, level) in levels.iter().enumerate() {
			if index == split {
				chain.child.get_opt(&entry).unwrap();
			}
			(chain.levels[*level as usize])(const_asset(&entry, *level));
		}
		if split == levels.len() {
			chain.child.get_opt(&entry).unwrap();
		}

		let seen = seen.borrow();
		prop_assert_eq!(seen.len(), levels.len());
		for &(level, rank) in seen.iter() {
			for &(other, other_rank) in seen.iter() {
				if level > other {
					prop_assert!(rank > other_rank);
				}
			}
		}
	}

	#[test]
	fn recent_iteration_reverses_forward_iteration(
		contributions in prop::collection::vec(
			(0..3_usize, prop::collection::vec(any::<u32>(), 0..4)),
			0..10,
		),
	) {
		let first = PeerBuilder::new();
		let second = PeerBuilder::new();
		let child = ContextBuilder::with_options(
			BuilderOptions::new().peer(&first).peer(&second),
			|get, _| get,
		);
		let entry = Entry::new("both ways", |target: &Target<(Vec<u32>, Vec<u32>), u32>| {
			let target = target.clone();
			Definition::new().assign(move |assigner| {
				let mut forward = Vec::new();
				target.each_asset(|asset| {
					forward.push(asset);
					Flow::Continue
				})?;
				let mut backward = Vec::new();
				target.each_recent_asset(|asset| {
					backward.push(asset);
					Flow::Continue
				})?;
				assigner.assign((forward, backward));
				Ok(())
			})
		});

		let mut expected = Vec::new();
		for (owner, assets) in contributions {
			expected.extend(assets.iter().copied());
			let asset = Asset::place(&entry, move |_, collector| {
				for asset in &assets {
					if collector(*asset).is_stop() {
						break;
					}
				}
				Ok(())
			});
			match owner {
				0 => child.provide(asset),
				1 => first.provide(asset),
				_ => second.provide(asset),
			};
		}

		let (mut forward, mut backward) = child.get(&entry).unwrap();
		backward.reverse();
		prop_assert_eq!(&forward, &backward);
		forward.sort_unstable();
		expected.sort_unstable();
		prop_assert_eq!(forward, expected);
	}
}

#[test]
fn lists_place_in_contribution_order() {
	let builder = ContextBuilder::new(|get, _| get);
	let entry = dynamic::<u32>("numbers");
	builder.provide(place_all(&entry, vec![1, 2]));
	builder.provide(none_asset(&entry));
	builder.provide(place_all(&entry, vec![3]));

	assert_eq!(builder.get(&entry).unwrap(), vec![1, 2, 3]);
}
