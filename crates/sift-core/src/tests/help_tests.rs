//! Tests for the help plugin

use super::fixtures::{RecordingPlugin, drain};
use crate::plugin::{HelpOptions, HelpPlugin, Plugin, Registry};
use crate::router::SessionHandle;
use sift_types::SessionRequest;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::UnboundedReceiver;

struct Fixture {
    // Held so the help plugin's weak reference stays alive
    _registry: Arc<RwLock<Registry>>,
    help: HelpPlugin,
    session: UnboundedReceiver<SessionRequest>,
}

fn fixture(options: HelpOptions) -> Fixture {
    let registry = Arc::new(RwLock::new(Registry::new()));
    {
        let mut registry = registry.write().unwrap();
        registry.insert(RecordingPlugin::described("files", "Search files"));
        registry.insert(RecordingPlugin::described("find", "Find anything"));
        registry.insert(RecordingPlugin::described("emoji", "Pick an emoji"));
        registry.insert(RecordingPlugin::new("fixme"));
    }
    let (session, session_rx) = SessionHandle::channel();
    let help = HelpPlugin::new(":", Arc::downgrade(&registry), session, options);
    Fixture {
        _registry: registry,
        help,
        session: session_rx,
    }
}

fn commands(help: &HelpPlugin, text: &str) -> Vec<String> {
    help.matches(text)
        .iter()
        .map(|p| p.command().to_string())
        .collect()
}

#[test]
fn test_filters_by_prefix_and_description() {
    let f = fixture(HelpOptions::default());

    assert_eq!(commands(&f.help, ":fi"), vec!["files", "find"]);
    assert_eq!(commands(&f.help, ":em"), vec!["emoji"]);
    assert_eq!(commands(&f.help, ":"), vec!["files", "find", "emoji"]);
    assert!(commands(&f.help, ":zzz").is_empty());
}

#[test]
fn test_token_is_first_word() {
    let f = fixture(HelpOptions::default());
    assert_eq!(commands(&f.help, ":fin   "), vec!["find"]);
    assert_eq!(commands(&f.help, ":fil extra words"), vec!["files"]);
}

#[test]
fn test_show_all_lists_everything() {
    let f = fixture(HelpOptions {
        show_all: true,
        ..HelpOptions::default()
    });
    assert_eq!(
        commands(&f.help, ":zzz"),
        vec!["files", "find", "emoji", "fixme"]
    );

    f.help.set_show_all(false);
    assert!(commands(&f.help, ":zzz").is_empty());
}

#[test]
fn test_search_builds_items() {
    let f = fixture(HelpOptions::default());

    f.help.search(":em");

    let result = f.help.result();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0]["command"], "emoji");
    assert_eq!(result[0]["description"], "Pick an emoji");
    assert!(result[0]["icon"].is_string());
}

#[test]
fn test_activate_requests_command_text() {
    let mut f = fixture(HelpOptions::default());

    f.help.activate(":fin");
    f.help.activate(":zzz");

    assert_eq!(
        drain(&mut f.session),
        vec![SessionRequest::SetText {
            text: ":find ".to_string()
        }]
    );
}

#[test]
fn test_completion_gated_by_option() {
    let f = fixture(HelpOptions::default());
    assert_eq!(f.help.complete(":em"), None);

    f.help.set_enable_completion(true);
    assert_eq!(f.help.complete(":em").as_deref(), Some(":emoji "));
    assert_eq!(f.help.complete(":zzz"), None);
}

#[test]
fn test_dropped_registry_lists_nothing() {
    let f = fixture(HelpOptions {
        show_all: true,
        ..HelpOptions::default()
    });
    let Fixture {
        _registry: registry,
        help,
        ..
    } = f;
    drop(registry);

    assert!(help.matches(":").is_empty());
}

#[test]
fn test_options_serde() {
    let options: HelpOptions =
        serde_json::from_str(r#"{"showAll": true, "enableCompletion": true}"#).unwrap();
    assert!(options.show_all);
    assert!(options.enable_completion);

    let options: HelpOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(options, HelpOptions::default());
}
