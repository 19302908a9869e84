//! Lock manager behavior against a real lock directory.
//!
//! Sessions are plain ids here; the transport layer is exercised
//! separately in `daemon_tests`.

use dirlock_proto::{LockCommand, LockCommandResult, LockRequest, LockResponse};
use dirlock_server::manager::reason;
use dirlock_server::{LockManager, SessionId};
use tempfile::TempDir;

const A: SessionId = SessionId::new(1);
const B: SessionId = SessionId::new(2);

fn run(manager: &LockManager, session: SessionId, command: LockCommand, name: &str) -> LockResponse {
    manager.process(session, LockRequest::new(command, name))
}

fn assert_reply(response: &LockResponse, result: LockCommandResult, reason: &str) {
    assert_eq!(response.result, result, "unexpected result: {response:?}");
    assert_eq!(response.reason, reason, "unexpected reason: {response:?}");
}

#[test]
fn acquire_is_exclusive_across_sessions() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    assert_reply(&run(&manager, A, LockCommand::Acquire, "L1"), LockCommandResult::Success, "");
    assert_reply(
        &run(&manager, B, LockCommand::Acquire, "L1"),
        LockCommandResult::Failed,
        reason::HELD_BY_OTHER_SESSION,
    );

    let peek = run(&manager, B, LockCommand::Peek, "L1");
    assert_reply(&peek, LockCommandResult::Success, "");
    assert!(peek.is_locked);

    assert_reply(&run(&manager, A, LockCommand::Release, "L1"), LockCommandResult::Success, "");
    assert_reply(&run(&manager, B, LockCommand::Acquire, "L1"), LockCommandResult::Success, "");
}

#[test]
fn reentrant_acquire_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    assert_reply(&run(&manager, A, LockCommand::Acquire, "L1"), LockCommandResult::Success, "");
    assert_reply(
        &run(&manager, A, LockCommand::Acquire, "L1"),
        LockCommandResult::Success,
        reason::NO_OP,
    );
    // still exclusively held after the no-op
    assert_reply(
        &run(&manager, B, LockCommand::Acquire, "L1"),
        LockCommandResult::Failed,
        reason::HELD_BY_OTHER_SESSION,
    );
}

#[test]
fn release_is_final_and_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());
    let lock_file = dir.path().join("L1.lck");

    run(&manager, A, LockCommand::Acquire, "L1");
    assert!(lock_file.exists());

    assert_reply(&run(&manager, A, LockCommand::Release, "L1"), LockCommandResult::Success, "");
    assert!(!lock_file.exists(), "release should unlink the lock file");

    assert_reply(
        &run(&manager, A, LockCommand::Release, "L1"),
        LockCommandResult::Failed,
        reason::LOCK_NOT_FOUND,
    );
}

#[test]
fn release_by_another_session_is_refused() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    run(&manager, A, LockCommand::Acquire, "L1");
    assert_reply(
        &run(&manager, B, LockCommand::Release, "L1"),
        LockCommandResult::Failed,
        reason::HELD_BY_OTHER_SESSION,
    );
    // the owner still holds it
    assert_reply(&run(&manager, A, LockCommand::Verify, "L1"), LockCommandResult::Success, "");
}

#[test]
fn disconnect_releases_locks_but_keeps_files() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());
    let lock_file = dir.path().join("L1.lck");

    run(&manager, A, LockCommand::Acquire, "L1");
    run(&manager, A, LockCommand::Acquire, "L2");
    manager.on_disconnect(A);

    // files stay on disk so the names can be reacquired race-free
    assert!(lock_file.exists());
    assert_reply(&run(&manager, B, LockCommand::Acquire, "L1"), LockCommandResult::Success, "");
    assert_reply(&run(&manager, B, LockCommand::Acquire, "L2"), LockCommandResult::Success, "");
}

#[test]
fn disconnect_of_a_sessionless_peer_is_harmless() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    run(&manager, A, LockCommand::Acquire, "L1");
    manager.on_disconnect(B);

    // A's lock is untouched
    assert_reply(&run(&manager, A, LockCommand::Verify, "L1"), LockCommandResult::Success, "");
}

#[test]
fn peek_reports_on_disk_state_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());
    let lock_file = dir.path().join("L2.lck");

    let peek = run(&manager, A, LockCommand::Peek, "L2");
    assert_reply(&peek, LockCommandResult::Success, "");
    assert!(!peek.is_locked);
    assert!(!lock_file.exists(), "peek must not create the lock file");

    run(&manager, A, LockCommand::Acquire, "L2");
    let peek = run(&manager, B, LockCommand::Peek, "L2");
    assert!(peek.is_locked);

    // the registry is untouched by peeks: the owner still reacquires as a no-op
    assert_reply(
        &run(&manager, A, LockCommand::Acquire, "L2"),
        LockCommandResult::Success,
        reason::NO_OP,
    );

    run(&manager, A, LockCommand::Release, "L2");
    let peek = run(&manager, B, LockCommand::Peek, "L2");
    assert!(!peek.is_locked);
}

#[test]
fn peek_sees_unlocked_leftover_files() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    // a disconnect leaves the file behind, unlocked
    run(&manager, A, LockCommand::Acquire, "L1");
    manager.on_disconnect(A);

    let peek = run(&manager, B, LockCommand::Peek, "L1");
    assert_reply(&peek, LockCommandResult::Success, "");
    assert!(!peek.is_locked);
}

#[test]
fn verify_tracks_ownership_exactly() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    assert_reply(
        &run(&manager, A, LockCommand::Verify, "L1"),
        LockCommandResult::Failed,
        reason::LOCK_NOT_FOUND,
    );

    run(&manager, A, LockCommand::Acquire, "L1");
    assert_reply(&run(&manager, A, LockCommand::Verify, "L1"), LockCommandResult::Success, "");
    assert_reply(
        &run(&manager, B, LockCommand::Verify, "L1"),
        LockCommandResult::Failed,
        reason::HELD_BY_OTHER_SESSION,
    );

    run(&manager, A, LockCommand::Release, "L1");
    assert_reply(
        &run(&manager, A, LockCommand::Verify, "L1"),
        LockCommandResult::Failed,
        reason::LOCK_NOT_FOUND,
    );
}

#[test]
fn invalid_lock_names_are_rejected_for_every_command() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    for command in [
        LockCommand::Peek,
        LockCommand::Acquire,
        LockCommand::Release,
        LockCommand::Verify,
    ] {
        for name in ["../etc/passwd", "under_score", "with space", ""] {
            assert_reply(
                &run(&manager, A, command, name),
                LockCommandResult::BadRequest,
                reason::INVALID_LOCK_NAME,
            );
        }
    }
    assert_eq!(dir.path().read_dir().unwrap().count(), 0);
}

#[test]
fn unassigned_command_bytes_are_rejected() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    // 0 is the uninitialized sentinel, 1 is reserved, the rest are unassigned
    for command in [0u8, 1, 6, 200] {
        let response = manager.process(
            A,
            LockRequest {
                version_major: 0,
                version_minor: 1,
                command,
                lock_name: "L1".to_string(),
            },
        );
        assert_reply(&response, LockCommandResult::BadRequest, reason::UNKNOWN_COMMAND);
    }
}

#[test]
fn responses_echo_the_request_with_the_server_version() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    let response = manager.process(
        A,
        LockRequest {
            version_major: 9,
            version_minor: 7,
            command: LockCommand::Acquire as u8,
            lock_name: "L1".to_string(),
        },
    );
    assert_eq!(response.request.version_major, dirlock_proto::VERSION_MAJOR);
    assert_eq!(response.request.version_minor, dirlock_proto::VERSION_MINOR);
    assert_eq!(response.request.command, LockCommand::Acquire as u8);
    assert_eq!(response.request.lock_name, "L1");
}

#[test]
fn acquire_writes_a_diagnostic_marker() {
    let dir = TempDir::new().unwrap();
    let manager = LockManager::new(dir.path());

    run(&manager, A, LockCommand::Acquire, "L1");
    let marker = std::fs::read_to_string(dir.path().join("L1.lck")).unwrap();
    assert!(marker.starts_with("locked by session-"), "got: {marker:?}");
}

#[test]
fn managers_are_isolated_instances() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    let first = LockManager::new(first_dir.path());
    let second = LockManager::new(second_dir.path());

    assert_reply(&run(&first, A, LockCommand::Acquire, "L1"), LockCommandResult::Success, "");
    // same name, different directory and registry
    assert_reply(&run(&second, B, LockCommand::Acquire, "L1"), LockCommandResult::Success, "");
}
