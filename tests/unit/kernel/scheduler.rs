use super::*;

const INTERVAL: Duration = Duration::from_secs(3);

fn armed(effect: &Effect) -> (TimerKind, Duration, u64) {
    match effect {
        Effect::ArmTimer {
            timer,
            after,
            generation,
        } => (*timer, *after, *generation),
        other => panic!("expected ArmTimer, got {:?}", other),
    }
}

#[test]
fn timer_slot_bumps_generation_on_arm_and_stop() {
    let now = Instant::now();
    let mut slot = TimerSlot::default();
    assert!(slot.stop(TimerKind::Sync).is_none());

    let (_, _, first) = armed(&slot.arm(TimerKind::Sync, now, INTERVAL));
    assert_eq!(slot.deadline(), Some(now + INTERVAL));
    assert!(matches!(
        slot.stop(TimerKind::Sync),
        Some(Effect::StopTimer {
            timer: TimerKind::Sync
        })
    ));
    assert!(slot.generation() > first);
    assert!(!slot.take_fire(first));
}

#[test]
fn timer_slot_fire_is_consumed_once() {
    let now = Instant::now();
    let mut slot = TimerSlot::default();
    let (_, _, generation) = armed(&slot.arm(TimerKind::Autosave, now, INTERVAL));
    assert!(slot.take_fire(generation));
    assert!(!slot.is_armed());
    assert!(!slot.take_fire(generation));
}

#[test]
fn autosave_first_edit_arms_full_interval() {
    let now = Instant::now();
    let mut autosave = AutosaveScheduler::new(INTERVAL);
    let effect = autosave.on_edit(None, now).unwrap();
    assert_eq!(armed(&effect), (TimerKind::Autosave, INTERVAL, 1));
}

#[test]
fn autosave_edits_inside_a_burst_leave_the_timer_alone() {
    let t0 = Instant::now();
    let mut autosave = AutosaveScheduler::new(INTERVAL);
    autosave.on_edit(None, t0);
    let deadline = autosave.slot().deadline();

    assert!(autosave
        .on_edit(Some(t0), t0 + Duration::from_millis(2_999))
        .is_none());
    assert_eq!(autosave.slot().deadline(), deadline);
}

#[test]
fn autosave_edit_after_a_quiet_gap_resets_the_timer() {
    let t0 = Instant::now();
    let mut autosave = AutosaveScheduler::new(INTERVAL);
    autosave.on_edit(None, t0);

    let later = t0 + Duration::from_millis(3_001);
    let effect = autosave.on_edit(Some(t0), later).unwrap();
    assert_eq!(armed(&effect).1, INTERVAL);
    assert_eq!(autosave.slot().deadline(), Some(later + INTERVAL));
}

#[test]
fn autosave_edit_rearms_when_nothing_is_pending() {
    let t0 = Instant::now();
    let mut autosave = AutosaveScheduler::new(INTERVAL);
    let (_, _, generation) = armed(&autosave.on_edit(None, t0).unwrap());
    let fire_at = t0 + INTERVAL;
    assert!(matches!(
        autosave.on_fire(generation, Some(t0), fire_at),
        ScanDecision::Scan
    ));

    // Inside the interval of the previous edit, but the timer is idle.
    let next = fire_at + Duration::from_millis(10);
    assert!(autosave
        .on_edit(Some(fire_at - Duration::from_millis(100)), next)
        .is_some());
}

#[test]
fn autosave_fire_too_soon_after_an_edit_defers() {
    let t0 = Instant::now();
    let mut autosave = AutosaveScheduler::new(INTERVAL);
    let (_, _, generation) = armed(&autosave.on_edit(None, t0).unwrap());

    let last_edit = t0 + Duration::from_millis(2_500);
    match autosave.on_fire(generation, Some(last_edit), t0 + INTERVAL) {
        ScanDecision::Defer(effect) => {
            assert_eq!(armed(&effect).1, Duration::from_millis(2_500));
        }
        other => panic!("expected Defer, got {:?}", other),
    }
}

#[test]
fn autosave_burst_is_scanned_once_it_reaches_the_max_wait() {
    let t0 = Instant::now();
    let mut autosave = AutosaveScheduler::new(INTERVAL);
    let (_, _, generation) = armed(&autosave.on_edit(None, t0).unwrap());
    let mut last_edit = t0;
    for millis in [1_000, 2_000, 3_000] {
        let now = t0 + Duration::from_millis(millis);
        assert!(autosave.on_edit(Some(last_edit), now).is_none());
        last_edit = now;
    }

    // Deferral never reaches past the first edit plus the max wait.
    let fire = t0 + INTERVAL;
    let generation = match autosave.on_fire(generation, Some(last_edit), fire) {
        ScanDecision::Defer(effect) => {
            let (_, after, generation) = armed(&effect);
            assert_eq!(after, INTERVAL);
            generation
        }
        other => panic!("expected Defer, got {:?}", other),
    };

    let deadline = t0 + autosave.max_wait();
    let still_typing = deadline - Duration::from_millis(200);
    assert!(autosave.on_edit(Some(last_edit), still_typing).is_none());
    assert!(matches!(
        autosave.on_fire(generation, Some(still_typing), deadline),
        ScanDecision::Scan
    ));

    // The next edit starts a fresh burst.
    let next = deadline + Duration::from_millis(500);
    let (_, _, generation) = armed(&autosave.on_edit(Some(still_typing), next).unwrap());
    assert!(matches!(
        autosave.on_fire(generation, Some(next), next + INTERVAL),
        ScanDecision::Scan
    ));
}

#[test]
fn autosave_save_failure_only_arms_an_idle_timer() {
    let now = Instant::now();
    let mut autosave = AutosaveScheduler::new(INTERVAL);
    assert!(autosave.on_save_failed(now).is_some());
    assert!(autosave.on_save_failed(now).is_none());
}

#[test]
fn sync_request_while_running_is_a_noop() {
    let t0 = Instant::now();
    let mut sync = SyncScheduler::new(Duration::from_secs(5));
    sync.start(t0);
    assert_eq!(sync.request(SyncKind::Manual, None).len(), 2);
    assert_eq!(sync.running(), Some(SyncKind::Manual));
    assert!(sync.request(SyncKind::Manual, None).is_empty());
    assert!(!sync.slot().is_armed());
}

#[test]
fn sync_manual_result_uses_the_base_interval() {
    let t0 = Instant::now();
    let interval = Duration::from_secs(5);
    let mut sync = SyncScheduler::new(interval);
    sync.request(SyncKind::Manual, None);

    let now = t0 + Duration::from_secs(60);
    let effect = sync.on_result(SyncKind::Manual, now, t0);
    assert_eq!(armed(&effect), (TimerKind::Sync, interval, sync.slot().generation()));
    assert_eq!(sync.next_sync_at(), Some(now + interval));
    assert!(!sync.is_running());
}

#[test]
fn sync_auto_result_never_comes_sooner_than_the_interval() {
    let t0 = Instant::now();
    let interval = Duration::from_secs(5);
    let mut sync = SyncScheduler::new(interval);
    sync.request(SyncKind::Auto, None);

    let now = t0 + Duration::from_secs(1);
    let effect = sync.on_result(SyncKind::Auto, now, now);
    assert_eq!(armed(&effect).1, interval);
}

#[test]
fn sync_user_action_ignored_while_running() {
    let t0 = Instant::now();
    let mut sync = SyncScheduler::new(Duration::from_secs(5));
    sync.request(SyncKind::Auto, None);
    let far = sync.on_result(SyncKind::Auto, t0 + Duration::from_secs(30), t0);
    assert!(matches!(far, Effect::ArmTimer { .. }));
    sync.request(SyncKind::Manual, None);

    assert!(sync
        .on_user_action(t0 + Duration::from_secs(31))
        .is_empty());
}
