use std::path::PathBuf;

use compose_watch::config::Trigger;
use compose_watch::types::WatchAction;
use compose_watch::watch::path_utils::is_child;
use compose_watch::watch::{maybe_file_event, CompositeMatcher};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,8}(\\.[a-z]{1,3})?"
}

fn trigger(path: &str, target: Option<&str>) -> Trigger {
    Trigger {
        path: PathBuf::from(path),
        action: WatchAction::Sync,
        target: target.map(str::to_string),
        ignore: Vec::new(),
    }
}

proptest! {
    // A change below the trigger maps onto the same relative path under the
    // target directory.
    #[test]
    fn nested_changes_map_under_target(segments in proptest::collection::vec(segment(), 1..6)) {
        let trigger = trigger("/project/src", Some("/app"));
        let rel = segments.join("/");
        let host = PathBuf::from(format!("/project/src/{rel}"));

        let event = maybe_file_event(&trigger, &host, &CompositeMatcher::default())
            .expect("nested path must be classified");

        prop_assert_eq!(event.mapping.host_path, host);
        prop_assert_eq!(event.mapping.container_path, Some(format!("/app/{rel}")));
    }

    // Sharing a string prefix with the trigger is not containment.
    #[test]
    fn prefix_siblings_are_never_classified(
        suffix in "[a-z0-9_]{1,6}",
        segments in proptest::collection::vec(segment(), 0..4),
    ) {
        let trigger = trigger("/project/src", Some("/app"));
        let mut host = PathBuf::from(format!("/project/src{suffix}"));
        for s in &segments {
            host.push(s);
        }

        prop_assert!(!is_child(&trigger.path, &host));
        prop_assert!(maybe_file_event(&trigger, &host, &CompositeMatcher::default()).is_none());
    }

    // Without a target the event still fires but carries no container path.
    #[test]
    fn missing_target_yields_no_container_path(segments in proptest::collection::vec(segment(), 1..4)) {
        let trigger = trigger("/project/src", None);
        let host = PathBuf::from(format!("/project/src/{}", segments.join("/")));

        let event = maybe_file_event(&trigger, &host, &CompositeMatcher::default()).unwrap();
        prop_assert_eq!(event.mapping.container_path, None);
    }
}

#[test]
fn trigger_path_itself_maps_to_target() {
    let trigger = trigger("/project/src", Some("/app/"));
    let event = maybe_file_event(
        &trigger,
        &PathBuf::from("/project/src"),
        &CompositeMatcher::default(),
    )
    .unwrap();
    assert_eq!(event.mapping.container_path.as_deref(), Some("/app"));
}
