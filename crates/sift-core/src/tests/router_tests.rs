//! Tests for mode selection, registration and session handling on the router

use super::fixtures::{Call, RecordingPlugin, active_command, drain, router, visible_router};
use crate::plugin::{Plugin, PluginRef, same_plugin};
use crate::router::{Placement, Router, RouterConfig};
use crate::Error;
use serde_json::json;
use sift_types::{FocusTarget, LauncherUpdate, PluginEvent};
use std::sync::Arc;

fn text_changes(updates: &[LauncherUpdate]) -> Vec<String> {
    updates
        .iter()
        .filter_map(|u| match u {
            LauncherUpdate::TextChanged { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_registry_returns_last_bound_plugin() {
    let (mut router, _rx) = router();
    let first = RecordingPlugin::new("foo");
    let second = RecordingPlugin::new("foo");

    assert!(router.add_plugin(first.clone()).unwrap().is_none());
    let replaced = router.add_plugin(second.clone()).unwrap().unwrap();

    let first: PluginRef = first;
    let second: PluginRef = second;
    assert!(same_plugin(&replaced, &first));
    assert!(same_plugin(&router.plugin("foo").unwrap(), &second));
    assert_eq!(router.plugins().len(), 1);
}

#[test]
fn test_command_dispatch_rewrites_text() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();

    router.set_text(":foo bar");

    assert_eq!(router.text(), "bar");
    assert_eq!(active_command(&router), "foo");
    assert_eq!(foo.calls(), vec![Call::Search("bar".to_string())]);
}

#[test]
fn test_command_mode_passes_text_through() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();

    router.set_text(":foo bar");
    router.set_text("");
    router.set_text(":other");

    assert_eq!(active_command(&router), "foo");
    assert_eq!(foo.searches(), vec!["bar", "", ":other"]);
}

#[test]
fn test_command_without_remainder_falls_back_to_help() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();

    router.set_text(":foo");
    assert_eq!(active_command(&router), "help");
    assert_eq!(router.text(), ":foo");

    router.set_text(":foo   ");
    assert_eq!(active_command(&router), "help");
    assert!(foo.calls().is_empty());
}

#[test]
fn test_unknown_command_falls_back_to_help() {
    let (mut router, _rx) = router();
    router.set_text(":nope");
    assert_eq!(active_command(&router), "help");

    router.set_text(":help me");
    assert_eq!(active_command(&router), "help");
}

#[test]
fn test_visible_command_keeps_prefix() {
    let (mut router, _rx) = visible_router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();

    router.set_text(":foo bar");
    assert_eq!(router.text(), ":foo bar");
    assert_eq!(active_command(&router), "foo");

    router.set_text(":foo baz");
    router.set_text("");

    assert_eq!(active_command(&router), "dock");
    assert_eq!(
        foo.calls(),
        vec![
            Call::Search("bar".to_string()),
            Call::Search("baz".to_string()),
            Call::Clear,
        ]
    );
}

#[test]
fn test_empty_text_selects_dock() {
    let (mut router, _rx) = router();
    let dock = RecordingPlugin::new("dock");
    router.add_plugin(dock.clone()).unwrap();
    assert_eq!(dock.searches(), vec![""]);

    router.set_text("abc");
    assert_eq!(active_command(&router), "default");

    router.set_text("");
    assert_eq!(active_command(&router), "dock");
    assert_eq!(dock.searches(), vec!["", ""]);
}

#[test]
fn test_plain_text_selects_default() {
    let (mut router, _rx) = router();
    let apps = RecordingPlugin::new("apps");
    router.add_child(apps.clone(), Placement::DefaultOnly).unwrap();

    router.set_text("fire");

    assert_eq!(active_command(&router), "default");
    assert_eq!(apps.searches(), vec!["fire"]);
    assert!(router.plugin("apps").is_none());
}

#[test]
fn test_registered_default_overrides_builtin() {
    let (mut router, _rx) = router();
    let default = RecordingPlugin::new("default");
    router.add_plugin(default.clone()).unwrap();

    router.set_text("abc");

    let default_ref: PluginRef = default.clone();
    assert!(same_plugin(router.active_plugin(), &default_ref));
    assert_eq!(default.searches(), vec!["abc"]);
}

#[test]
fn test_switching_clears_only_previous_plugin() {
    let (mut router, _rx) = router();
    let dock = RecordingPlugin::new("dock");
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(dock.clone()).unwrap();
    router.add_plugin(foo.clone()).unwrap();
    dock.take_calls();

    router.set_text(":foo bar");
    assert_eq!(dock.take_calls(), vec![Call::Clear]);
    assert_eq!(foo.take_calls(), vec![Call::Search("bar".to_string())]);

    router.close();
    assert_eq!(foo.take_calls(), vec![Call::Clear]);
    assert_eq!(dock.take_calls(), vec![Call::Search(String::new())]);
}

#[test]
fn test_dispatch_emits_single_text_change() {
    let (mut router, mut rx) = router();
    router.add_plugin(RecordingPlugin::new("foo")).unwrap();
    drain(&mut rx);

    router.set_text(":foo bar");

    let updates = drain(&mut rx);
    assert_eq!(text_changes(&updates), vec!["bar"]);
    assert!(updates.contains(&LauncherUpdate::ActivePluginChanged {
        command: "foo".to_string()
    }));
}

#[test]
fn test_same_text_does_not_route() {
    let (mut router, _rx) = router();
    let apps = RecordingPlugin::new("apps");
    router.add_child(apps.clone(), Placement::DefaultOnly).unwrap();

    router.set_text("abc");
    router.set_text("abc");

    assert_eq!(apps.searches(), vec!["abc"]);
}

#[test]
fn test_invalid_commands_rejected() {
    let (mut router, _rx) = router();

    for command in ["", "my apps", ":apps"] {
        let err = router.add_plugin(RecordingPlugin::new(command)).err().unwrap();
        assert!(matches!(err, Error::InvalidCommand { .. }), "{command:?}");
    }

    let err = router
        .add_child(RecordingPlugin::new("a b"), Placement::Default)
        .unwrap_err();
    assert!(err.to_string().contains("contains whitespace"));
    assert!(router.builtin_default().plugins().is_empty());
}

#[test]
fn test_remove_plugin_keeps_active() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();
    router.set_text(":foo bar");

    assert!(router.remove_plugin("foo").is_some());
    assert!(router.remove_plugin("foo").is_none());

    router.set_text("baz");
    assert_eq!(active_command(&router), "foo");
    assert_eq!(foo.last_search().as_deref(), Some("baz"));
    assert!(!foo.calls().contains(&Call::Destroy));
}

fn forwarded_result_changes(updates: &[LauncherUpdate], command: &str) -> usize {
    updates
        .iter()
        .filter(|u| match u {
            LauncherUpdate::Plugin { command: c, event } => {
                c == command && matches!(event, PluginEvent::ResultChanged)
            }
            _ => false,
        })
        .count()
}

#[test]
fn test_replaced_active_plugin_keeps_forwarding() {
    let (mut router, mut rx) = router();
    let first = RecordingPlugin::new("foo");
    router.add_plugin(first.clone()).unwrap();
    router.set_text(":foo bar");

    let second = RecordingPlugin::new("foo");
    router.add_plugin(second.clone()).unwrap();
    drain(&mut rx);

    router.set_text("baz");

    assert_eq!(first.last_search().as_deref(), Some("baz"));
    assert!(second.calls().is_empty());
    assert_eq!(forwarded_result_changes(&drain(&mut rx), "foo"), 1);
}

#[test]
fn test_detached_plugin_stops_forwarding_once_inactive() {
    let (mut router, mut rx) = router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();
    router.set_text(":foo bar");
    router.remove_plugin("foo");

    router.close();
    assert_eq!(active_command(&router), "dock");
    drain(&mut rx);

    foo.state().set_result(vec![json!("late")]);
    assert_eq!(forwarded_result_changes(&drain(&mut rx), "foo"), 0);
}

#[test]
fn test_dock_replacement_only_when_dock_active() {
    let (mut router, _rx) = router();
    router.set_text("abc");

    let dock = RecordingPlugin::new("dock");
    router.add_plugin(dock.clone()).unwrap();

    assert_eq!(active_command(&router), "default");
    assert!(dock.calls().is_empty());
}

#[test]
fn test_activate_dispatches_to_active() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();
    router.set_text(":foo bar");

    router.activate();

    assert_eq!(foo.calls().last(), Some(&Call::Activate("bar".to_string())));
}

#[test]
fn test_visible_activate_reparses() {
    let (mut router, _rx) = visible_router();
    let foo = RecordingPlugin::new("foo");
    let apps = RecordingPlugin::new("apps");
    apps.set_items(vec![json!("firefox")]);
    router.add_plugin(foo.clone()).unwrap();
    router.add_child(apps.clone(), Placement::DefaultOnly).unwrap();

    router.set_text(":foo bar");
    router.activate();
    assert_eq!(foo.calls().last(), Some(&Call::Activate("bar".to_string())));

    router.set_text(":nope x");
    router.activate();

    router.set_text("fire");
    router.activate();
    assert_eq!(apps.calls().last(), Some(&Call::Activate("fire".to_string())));
    assert_eq!(
        foo.calls()
            .iter()
            .filter(|c| matches!(c, Call::Activate(_)))
            .count(),
        1
    );
}

#[test]
fn test_complete_non_visible() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    foo.set_completion("barbecue");
    router.add_plugin(foo.clone()).unwrap();
    router.set_text(":foo bar");

    assert_eq!(router.complete().as_deref(), Some("barbecue"));
    assert_eq!(router.text(), "bar");
}

#[test]
fn test_complete_visible_keeps_prefix() {
    let (mut router, _rx) = visible_router();
    let foo = RecordingPlugin::new("foo");
    foo.set_completion("bar");
    let apps = RecordingPlugin::new("apps");
    apps.set_completion("firefox");
    router.add_plugin(foo.clone()).unwrap();
    router.add_child(apps, Placement::DefaultOnly).unwrap();

    router.set_text(":foo ba");
    assert_eq!(router.complete().as_deref(), Some(":foo bar"));
    assert_eq!(foo.calls().last(), Some(&Call::Complete("ba".to_string())));

    router.set_text("fi");
    assert_eq!(router.complete().as_deref(), Some("firefox"));

    router.set_text(":nope");
    assert_eq!(router.complete(), None);
}

#[test]
fn test_complete_visible_without_leader_is_raw() {
    let (mut router, _rx) = visible_router();
    let apps = RecordingPlugin::new("apps");
    apps.set_completion("firefox");
    router.add_child(apps.clone(), Placement::Default).unwrap();

    router.set_text("fire");

    assert_eq!(active_command(&router), "default");
    assert_eq!(router.complete().as_deref(), Some("firefox"));
    assert_eq!(apps.calls().last(), Some(&Call::Complete("fire".to_string())));
}

#[test]
fn test_empty_completion_is_none() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    foo.set_completion("");
    router.add_plugin(foo).unwrap();
    router.set_text(":foo x");

    assert_eq!(router.complete(), None);
}

#[test]
fn test_open_and_close() {
    let (mut router, mut rx) = router();
    drain(&mut rx);

    router.open("abc");
    assert!(router.is_open());
    assert_eq!(active_command(&router), "default");

    let updates = drain(&mut rx);
    assert_eq!(updates[0], LauncherUpdate::OpenChanged { is_open: true });
    assert_eq!(
        updates[1],
        LauncherUpdate::Opened {
            text: "abc".to_string()
        }
    );
    assert_eq!(
        updates.last(),
        Some(&LauncherUpdate::Focus {
            target: FocusTarget::Entry
        })
    );

    router.close();
    assert!(!router.is_open());
    assert_eq!(router.text(), "");
    assert_eq!(active_command(&router), "dock");

    let updates = drain(&mut rx);
    assert_eq!(updates[0], LauncherUpdate::OpenChanged { is_open: false });
    assert_eq!(updates.last(), Some(&LauncherUpdate::Closed));
    assert_eq!(text_changes(&updates), vec![""]);
}

#[test]
fn test_help_activation_requests_command_text() {
    let (mut router, _rx) = router();
    router
        .add_plugin(RecordingPlugin::described("foo", "Find files"))
        .unwrap();

    router.set_text(":fo");
    router.activate();

    assert_eq!(router.text(), ":foo ");
    assert_eq!(active_command(&router), "help");

    router.set_text(":foo x");
    assert_eq!(active_command(&router), "foo");
    assert_eq!(router.text(), "x");
}

#[test]
fn test_plugin_events_forwarded() {
    let (mut router, mut rx) = router();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();
    drain(&mut rx);

    foo.state().error("boom");
    let updates = drain(&mut rx);
    assert_eq!(
        updates,
        vec![LauncherUpdate::Plugin {
            command: "foo".to_string(),
            event: PluginEvent::Error {
                message: "boom".to_string()
            },
        }]
    );

    router.remove_plugin("foo");
    foo.state().error("again");
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_default_child_result_events_forwarded() {
    let (mut router, mut rx) = router();
    let apps = RecordingPlugin::new("apps");
    router.add_child(apps.clone(), Placement::DefaultOnly).unwrap();
    drain(&mut rx);

    apps.state().set_result(vec![json!("x")]);

    let updates = drain(&mut rx);
    assert!(updates.contains(&LauncherUpdate::Plugin {
        command: "apps".to_string(),
        event: PluginEvent::ResultChanged,
    }));
    assert!(updates.contains(&LauncherUpdate::Plugin {
        command: "default".to_string(),
        event: PluginEvent::ResultChanged,
    }));
}

#[test]
fn test_placement_and_remove_child() {
    let (mut router, _rx) = router();
    let both = RecordingPlugin::new("files");
    let both_ref: PluginRef = both.clone();

    router.add_child(both.clone(), Placement::Default).unwrap();
    assert!(router.plugin("files").is_some());
    assert!(router.builtin_default().contains(&both_ref));

    assert!(router.remove_child(&both_ref));
    assert!(router.plugin("files").is_none());
    assert!(!router.builtin_default().contains(&both_ref));
    assert!(!router.remove_child(&both_ref));
}

#[test]
fn test_placement_serde() {
    let placement: Placement = serde_json::from_str("\"defaultOnly\"").unwrap();
    assert_eq!(placement, Placement::DefaultOnly);
    let placement: Placement = serde_json::from_str("\"default-only\"").unwrap();
    assert_eq!(placement, Placement::DefaultOnly);
    assert_eq!(Placement::default(), Placement::Registry);
}

#[test]
fn test_teardown_destroys_plugins() {
    let (mut router, _rx) = router();
    let foo = RecordingPlugin::new("foo");
    let apps = RecordingPlugin::new("apps");
    let files = RecordingPlugin::new("files");
    router.add_plugin(foo.clone()).unwrap();
    router.add_child(apps.clone(), Placement::DefaultOnly).unwrap();
    router.add_child(files.clone(), Placement::Default).unwrap();

    drop(router);

    for plugin in [&foo, &apps, &files] {
        let destroys = plugin
            .calls()
            .iter()
            .filter(|c| **c == Call::Destroy)
            .count();
        assert_eq!(destroys, 1, "{}", plugin.command());
    }
}

#[test]
fn test_empty_leader_rejected() {
    let result = Router::new(RouterConfig {
        command_leader: String::new(),
        ..RouterConfig::default()
    });
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_custom_leader() {
    let (mut router, _rx) = Router::new(RouterConfig {
        command_leader: "//".to_string(),
        ..RouterConfig::default()
    })
    .unwrap();
    let foo = RecordingPlugin::new("foo");
    router.add_plugin(foo.clone()).unwrap();

    router.set_text(":foo bar");
    assert_eq!(active_command(&router), "default");

    router.close();
    router.set_text("//foo bar");
    assert_eq!(active_command(&router), "foo");
    assert_eq!(router.text(), "bar");
}

#[tokio::test]
async fn test_background_session_requests() {
    let (mut router, _rx) = router();
    let session = router.session();

    tokio::spawn(async move {
        session.set_text("abc");
    })
    .await
    .unwrap();

    let request = router.next_session_request().await.unwrap();
    router.apply(request);

    assert_eq!(router.text(), "abc");
    assert_eq!(active_command(&router), "default");
}

#[test]
fn test_builtins_are_recognized() {
    let (router, _rx) = router();
    let dock: PluginRef = router.builtin_dock().clone();
    let help: PluginRef = router.builtin_help().clone();
    let stranger: PluginRef = Arc::new(crate::StaticPlugin::new(
        "dock",
        sift_types::PluginMeta::default(),
        Vec::new(),
    ));

    assert!(router.is_builtin(&dock));
    assert!(router.is_builtin(&help));
    assert!(!router.is_builtin(&stranger));
}
