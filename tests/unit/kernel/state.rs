use super::*;
use std::time::Duration;

fn tab(name: &str) -> DocumentTab {
    let mut tab = DocumentTab::new(FileId::new_v4(), name.into());
    tab.set_content(b"");
    tab
}

fn state_with_tabs(n: usize) -> (WorkspaceState, Vec<FileId>) {
    let mut state = WorkspaceState::new(Instant::now());
    let mut ids = Vec::new();
    for i in 0..n {
        let id = FileId::new_v4();
        state.insert_tab(id, format!("{i}.md").into());
        ids.push(id);
    }
    (state, ids)
}

#[test]
fn never_edited_tab_is_clean() {
    let mut tab = tab("a.md");
    assert!(!tab.is_dirty());
    tab.last_save_at = Some(Instant::now());
    assert!(!tab.is_dirty());
}

#[test]
fn dirty_until_a_save_lands_after_the_last_edit() {
    let t0 = Instant::now();
    let mut tab = tab("a.md");
    tab.last_edit_at = Some(t0);
    assert!(tab.is_dirty());

    tab.last_save_at = Some(t0 - Duration::from_millis(1));
    assert!(tab.is_dirty());
    tab.last_save_at = Some(t0);
    assert!(!tab.is_dirty());
}

#[test]
fn apply_edit_clamps_offsets() {
    let mut tab = tab("a.md");
    assert!(tab.apply_edit(&TextEdit::Insert {
        at: 99,
        text: "hello".into()
    }));
    assert!(tab.apply_edit(&TextEdit::Delete { range: 3..99 }));
    assert_eq!(tab.buffer.to_string(), "hel");

    assert!(!tab.apply_edit(&TextEdit::Delete { range: 10..20 }));
    assert!(!tab.apply_edit(&TextEdit::Insert {
        at: 0,
        text: String::new()
    }));
    assert!(!tab.apply_edit(&TextEdit::ReplaceAll("hel".into())));
    assert!(tab.apply_edit(&TextEdit::ReplaceAll("héllo wörld".into())));
    assert_eq!(tab.snapshot().to_bytes(), "héllo wörld".as_bytes());
}

#[test]
fn set_content_replaces_invalid_utf8() {
    let mut tab = DocumentTab::new(FileId::new_v4(), "bin".into());
    assert!(tab.loading);
    tab.set_content(&[b'o', b'k', 0xff]);
    assert!(!tab.loading);
    assert_eq!(tab.buffer.to_string(), "ok\u{fffd}");
}

#[test]
fn insert_tab_goes_after_the_active_one() {
    let (mut state, ids) = state_with_tabs(2);
    state.select_tab(0);
    let id = FileId::new_v4();
    state.insert_tab(id, "new.md".into());

    let order: Vec<FileId> = state.tabs.iter().map(|t| t.id).collect();
    assert_eq!(order, vec![ids[0], id, ids[1]]);
    assert_eq!(state.active().unwrap().id, id);
}

#[test]
fn select_tab_ignores_out_of_range_indices() {
    let (mut state, ids) = state_with_tabs(3);
    state.select_tab(0);
    assert!(!state.select_tab(42));
    assert_eq!(state.active().unwrap().id, ids[0]);
    assert!(state.select_tab(2));
    assert_eq!(state.active().unwrap().id, ids[2]);
    assert!(!state.select_tab(2));

    let mut empty = WorkspaceState::new(Instant::now());
    assert!(!empty.select_tab(0));
}

#[test]
fn close_tab_keeps_a_valid_active_index() {
    let (mut state, ids) = state_with_tabs(3);
    // Active is the last one.
    assert!(state.close_tab(ids[2]).is_some());
    assert_eq!(state.active().unwrap().id, ids[1]);

    state.select_tab(1);
    state.close_tab(ids[0]);
    assert_eq!(state.active().unwrap().id, ids[1]);

    state.close_tab(ids[1]);
    assert!(state.tabs.is_empty());
    assert!(state.active().is_none());
    assert!(state.close_tab(ids[1]).is_none());
}

#[test]
fn dirty_tabs_skips_loading_and_clean_tabs() {
    let now = Instant::now();
    let mut state = WorkspaceState::new(now);
    let mut dirty = tab("dirty.md");
    dirty.last_edit_at = Some(now);
    let mut loading = DocumentTab::new(FileId::new_v4(), "loading.md".into());
    loading.last_edit_at = Some(now);
    let dirty_id = dirty.id;
    state.tabs = vec![tab("clean.md"), dirty, loading];

    let ids: Vec<FileId> = state.dirty_tabs().map(|t| t.id).collect();
    assert_eq!(ids, vec![dirty_id]);
}

#[test]
fn background_errors_render_their_source() {
    let id = FileId::new_v4();
    let err = BackgroundError::Save {
        id,
        source: CoreError::unexpected("disk full"),
    };
    assert_eq!(err.to_string(), format!("saving {id}: disk full"));
    assert_eq!(
        BackgroundError::Sync(CoreError::unexpected("offline")).to_string(),
        "syncing: offline"
    );
}
