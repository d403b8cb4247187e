//! The process-wide registry.
//!
//! The lifecycle lives in one test: the registry is shared by the whole
//! test binary, and parallel tests would see each other's arenas. Exit
//! behaviour is checked by re-running this binary as a child process with
//! [`ROLE_VAR`] selecting what the child does before it ends.

use std::process::Command;

use corral::{global, ArenaError};

const ROLE_VAR: &str = "CORRAL_EXIT_ROLE";
const SWEEP_LINE: &str = "swept 2 arenas, released 4 blocks";

#[test]
fn process_wide_registry_lifecycle() {
    let _ = env_logger::builder().is_test(true).try_init();

    // Lazily created on first use.
    let a = global::create_named("config");
    let b = global::create();
    assert_eq!(global::with_registry(|reg| reg.head()), Some(b));

    for size in [8, 16, 32] {
        let _ = global::allocate(a, size).unwrap();
    }
    let block = global::zero_allocate(b, 4, 4).unwrap();
    let block = global::reallocate(b, Some(block), 256).unwrap().unwrap();
    global::free(b, block).unwrap();

    let stats = global::destroy(a).unwrap();
    assert_eq!(stats.blocks, 3);
    assert!(global::with_registry(|reg| reg.find_by_label("config")).is_none());

    // Inside a locked body usage errors come back instead of exiting.
    assert_eq!(
        global::with_registry(|reg| reg.destroy(a)).unwrap_err(),
        ArenaError::UnknownArena { arena: a }
    );

    let len = global::scope(|scope| {
        let _ = scope.allocate(64).unwrap();
        let _ = scope.allocate(64).unwrap();
        scope.len()
    });
    assert_eq!(len, 2);

    // `b` is still live; an explicit sweep takes it.
    let _ = global::allocate(b, 1).unwrap();
    let swept = global::cleanup();
    assert_eq!(swept.arenas, 1);
    assert_eq!(swept.blocks, 1);
    assert!(global::with_registry(|reg| reg.is_empty()));

    // Left alive on purpose: the exit hook sweeps it when the binary ends.
    let leftover = global::create_named("leftover");
    let _ = global::allocate(leftover, 128).unwrap();
}

/// Child-process body. Does nothing unless [`ROLE_VAR`] is set.
#[test]
fn exit_role() {
    let Ok(role) = std::env::var(ROLE_VAR) else {
        return;
    };
    env_logger::Builder::new()
        .parse_filters("corral=debug")
        .init();

    let a = global::create_named("a");
    for _ in 0..3 {
        let _ = global::allocate(a, 16).unwrap();
    }
    let b = global::create_named("b");
    let other = global::allocate(b, 16).unwrap();

    if role == "usage-error" {
        let _ = global::free(a, other);
        panic!("usage error returned under the default policy");
    }
}

fn run_child(role: &str) -> (Option<i32>, String) {
    let output = Command::new(std::env::current_exe().unwrap())
        .args(["--exact", "exit_role", "--nocapture", "--test-threads=1"])
        .env(ROLE_VAR, role)
        .output()
        .unwrap();
    (
        output.status.code(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn exit_hook_sweeps_live_arenas() {
    let (code, stderr) = run_child("normal");
    assert_eq!(code, Some(0), "{stderr}");
    assert!(stderr.contains(SWEEP_LINE), "{stderr}");
}

#[test]
fn usage_error_exits_with_failure_after_sweeping() {
    let (code, stderr) = run_child("usage-error");
    assert_eq!(code, Some(1), "{stderr}");
    assert!(stderr.contains("was allocated by arena"), "{stderr}");
    assert!(stderr.contains(SWEEP_LINE), "{stderr}");
    assert!(!stderr.contains("skipping sweep"), "{stderr}");
}
