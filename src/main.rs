use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notedesk::app::Workspace;
use notedesk::kernel::services::adapters::{
    ensure_data_dir, ensure_settings_file, load_settings, LocalCore,
};
use notedesk::kernel::services::ports::{File, FileId, FileKind, NoteCore};
use notedesk::kernel::{SyncKind, TextEdit, WorkspaceMessage, WorkspaceState};

mod logging;

const TICK: Duration = Duration::from_millis(50);

const HELP: &str = "\
commands:
  ls                 list the current folder
  cd <n|name|..|/>   open a folder
  open <n|name>      open a document in a new tab
  new <name>         create a document in the current folder
  show               print the active document
  edit <text>        replace the active document
  append <text>      append a line to the active document
  save               save the active document now
  sync               sync now
  tabs               list open tabs (* active, + dirty, ~ saving)
  tab <n>            switch tab
  close              close the active tab
  status             show the sync status
  errors             show background errors
  quit               save everything and exit";

fn main() -> io::Result<()> {
    if let Err(e) = ensure_settings_file() {
        eprintln!("settings unavailable: {e}");
    }
    let settings = load_settings().unwrap_or_default();
    let logging = logging::init(settings.log_filter.as_deref());

    let data_dir = match settings.data_dir.clone() {
        Some(dir) => dir,
        None => ensure_data_dir()?,
    };
    let core: Arc<dyn NoteCore> = Arc::new(LocalCore::open(&data_dir).map_err(io::Error::other)?);
    let mut workspace = Workspace::new(core.clone(), &settings.workspace_config())?;

    #[cfg(unix)]
    install_signal_handler(&workspace)?;

    let lines = spawn_stdin_reader()?;
    println!("notedesk: {} (type `help`)", data_dir.display());
    if let Some(guard) = &logging {
        println!("logs: {}", guard.log_dir().display());
    }
    prompt();

    while !workspace.is_closed() {
        workspace.pump();
        match lines.recv_timeout(TICK) {
            Ok(line) => {
                run_command(&mut workspace, &core, line.trim());
                if !workspace.is_closed() {
                    prompt();
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                workspace.dispatch(WorkspaceMessage::Shutdown);
            }
        }
    }
    Ok(())
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("notedesk-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}

#[cfg(unix)]
fn install_signal_handler(workspace: &Workspace) -> io::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let tx = workspace.sender();
    std::thread::Builder::new()
        .name("notedesk-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                tracing::info!(signal, "termination signal; shutting down");
                let _ = tx.send(WorkspaceMessage::Shutdown);
            }
        })?;
    Ok(())
}

fn run_command(workspace: &mut Workspace, core: &Arc<dyn NoteCore>, line: &str) {
    let (command, arg) = line
        .split_once(' ')
        .map_or((line, ""), |(c, a)| (c, a.trim()));

    match command {
        "" => {}
        "help" => println!("{HELP}"),
        "ls" => print_listing(workspace.state()),
        "cd" => match resolve_folder(workspace.state(), arg) {
            Some(id) => {
                workspace.dispatch(WorkspaceMessage::OpenDir { id });
            }
            None => println!("no such folder: {arg}"),
        },
        "open" => match find_entry(workspace.state(), arg) {
            Some(file) => {
                let id = match file.kind {
                    FileKind::Document => Some(file.id),
                    FileKind::Link { target } => Some(target),
                    FileKind::Folder => None,
                };
                match id {
                    Some(id) => {
                        let name = file.name.clone();
                        workspace.dispatch(WorkspaceMessage::OpenDocument { id, name });
                    }
                    None => println!("{} is a folder; use cd", file.name),
                }
            }
            None => println!("no such file: {arg}"),
        },
        "new" => create_document(workspace, core, arg),
        "show" => match workspace.state().active() {
            Some(tab) if tab.loading => println!("{} is still loading", tab.name),
            Some(tab) => print!("{}", tab.buffer),
            None => println!("no open tab"),
        },
        "edit" => edit_active(workspace, |_| TextEdit::ReplaceAll(arg.to_string())),
        "append" => edit_active(workspace, |len| TextEdit::Insert {
            at: len,
            text: format!("{arg}\n"),
        }),
        "save" => match active_id(workspace.state()) {
            Some(id) => {
                workspace.dispatch(WorkspaceMessage::SaveRequested { id });
            }
            None => println!("no open tab"),
        },
        "sync" => {
            workspace.dispatch(WorkspaceMessage::StartSync {
                kind: SyncKind::Manual,
                generation: None,
            });
        }
        "tabs" => print_tabs(workspace.state()),
        "tab" => match arg.parse::<usize>() {
            Ok(index) if index < workspace.state().tabs.len() => {
                workspace.dispatch(WorkspaceMessage::SelectTab { index });
            }
            Ok(index) => println!("no tab {index}"),
            Err(_) => println!("usage: tab <n>"),
        },
        "close" => match active_id(workspace.state()) {
            Some(id) => {
                workspace.dispatch(WorkspaceMessage::CloseTab { id });
            }
            None => println!("no open tab"),
        },
        "status" => print_status(workspace),
        "errors" => {
            let errors = &workspace.state().bg_errors;
            if errors.is_empty() {
                println!("no background errors");
            }
            for e in errors {
                println!("{e}");
            }
        }
        "quit" | "exit" => {
            workspace.dispatch(WorkspaceMessage::Shutdown);
        }
        other => println!("unknown command: {other} (type `help`)"),
    }
}

fn active_id(state: &WorkspaceState) -> Option<FileId> {
    state.active().map(|tab| tab.id)
}

fn edit_active(workspace: &mut Workspace, edit: impl FnOnce(usize) -> TextEdit) {
    let Some(tab) = workspace.state().active() else {
        println!("no open tab");
        return;
    };
    let id = tab.id;
    let edit = edit(tab.buffer.len_chars());
    workspace.dispatch(WorkspaceMessage::Edited { id, edit });
}

fn create_document(workspace: &Workspace, core: &Arc<dyn NoteCore>, name: &str) {
    let Some(parent) = workspace.state().explorer.current else {
        println!("folder listing not loaded yet");
        return;
    };
    let refresh = workspace.state().explorer.target;
    let core = core.clone();
    let tx = workspace.sender();
    let name = name.to_string();
    let spawned = std::thread::Builder::new()
        .name("notedesk-create".to_string())
        .spawn(move || match core.create_file(&name, parent, FileKind::Document) {
            Ok(_) => {
                let _ = tx.send(WorkspaceMessage::OpenDir { id: refresh });
            }
            Err(e) => tracing::warn!(name = %name, error = %e, "create file failed"),
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "failed to spawn create thread");
    }
}

/// `Some(None)` is the root folder.
fn resolve_folder(state: &WorkspaceState, arg: &str) -> Option<Option<FileId>> {
    match arg {
        "" | "/" => Some(None),
        ".." => {
            let parents = &state.explorer.parents;
            if parents.len() >= 2 {
                Some(Some(parents[parents.len() - 2].id))
            } else {
                Some(None)
            }
        }
        _ => find_entry(state, arg)
            .filter(|f| f.is_folder())
            .map(|f| Some(f.id)),
    }
}

fn find_entry<'a>(state: &'a WorkspaceState, arg: &str) -> Option<&'a File> {
    let entries = &state.explorer.entries;
    match arg.parse::<usize>() {
        Ok(index) => entries.get(index),
        Err(_) => entries.iter().find(|f| f.name == arg),
    }
}

fn print_listing(state: &WorkspaceState) {
    let path: Vec<&str> = state
        .explorer
        .parents
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    println!("/{}", path.join("/"));
    if state.explorer.entries.is_empty() {
        println!("  (empty)");
    }
    for (i, file) in state.explorer.entries.iter().enumerate() {
        let suffix = if file.is_folder() { "/" } else { "" };
        println!("  {i:>3}  {}{suffix}", file.name);
    }
}

fn print_tabs(state: &WorkspaceState) {
    if state.tabs.is_empty() {
        println!("no open tabs");
    }
    for (i, tab) in state.tabs.iter().enumerate() {
        let active = if i == state.active_tab { '*' } else { ' ' };
        let dirty = if tab.is_dirty() { '+' } else { ' ' };
        let saving = if tab.is_saving() { '~' } else { ' ' };
        println!("{active}{dirty}{saving} {i:>3}  {}", tab.name);
    }
}

fn print_status(workspace: &Workspace) {
    let state = workspace.state();
    if state.status.is_empty() {
        println!("never synced");
    } else {
        println!("{}", state.status);
    }
    if workspace.store().is_syncing() {
        println!("sync in progress");
    } else if let Some(at) = workspace.store().next_sync_at() {
        let secs = at.saturating_duration_since(Instant::now()).as_secs();
        println!("next sync in {secs}s");
    }
}
