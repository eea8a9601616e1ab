use super::*;
use parking_lot::Mutex;

fn file(name: &str, parent: FileId, kind: FileKind) -> File {
    File {
        id: FileId::new_v4(),
        parent,
        name: name.into(),
        kind,
        lastmod: Utc::now(),
    }
}

struct TreeCore {
    root: FileId,
    files: Mutex<Vec<File>>,
}

impl TreeCore {
    fn new() -> Self {
        let id = FileId::new_v4();
        let root = File {
            id,
            parent: id,
            name: "root".into(),
            kind: FileKind::Folder,
            lastmod: Utc::now(),
        };
        Self {
            root: id,
            files: Mutex::new(vec![root]),
        }
    }

    fn add(&self, name: &str, parent: FileId, kind: FileKind) -> FileId {
        let f = file(name, parent, kind);
        let id = f.id;
        self.files.lock().push(f);
        id
    }
}

impl NoteCore for TreeCore {
    fn write_document(&self, _id: FileId, _content: &[u8]) -> Result<()> {
        Ok(())
    }

    fn read_document(&self, _id: FileId) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn sync_all(&self, _progress: &mut dyn FnMut(SyncProgress)) -> Result<()> {
        Ok(())
    }

    fn last_synced_human_string(&self) -> Result<String> {
        Ok(String::new())
    }

    fn root(&self) -> Result<File> {
        self.file_by_id(self.root)
    }

    fn file_by_id(&self, id: FileId) -> Result<File> {
        self.files
            .lock()
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(id))
    }

    fn children(&self, id: FileId) -> Result<Vec<File>> {
        Ok(self
            .files
            .lock()
            .iter()
            .filter(|f| f.parent == id && !f.is_root())
            .cloned()
            .collect())
    }

    fn create_file(&self, name: &str, parent: FileId, kind: FileKind) -> Result<File> {
        let id = self.add(name, parent, kind);
        self.file_by_id(id)
    }
}

#[test]
fn sort_files_puts_folders_first_then_names() {
    let parent = FileId::new_v4();
    let mut files = vec![
        file("b.md", parent, FileKind::Document),
        file("zeta", parent, FileKind::Folder),
        file("a.md", parent, FileKind::Document),
        file("alpha", parent, FileKind::Folder),
    ];
    sort_files(&mut files);
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta", "a.md", "b.md"]);
}

#[test]
fn file_kind_is_a_tagged_union() {
    let target = FileId::new_v4();
    let kind = FileKind::Link { target };
    assert_eq!(kind.to_string(), format!("Link('{}')", target));

    let json = serde_json::to_value(kind).unwrap();
    assert_eq!(json["type"], "link");
    assert_eq!(json["target"], target.to_string());
    assert_eq!(
        serde_json::from_value::<FileKind>(serde_json::json!({"type": "folder"})).unwrap(),
        FileKind::Folder
    );
}

#[test]
fn root_is_its_own_parent() {
    let core = TreeCore::new();
    assert!(core.root().unwrap().is_root());
    let doc = core.add("a.md", core.root, FileKind::Document);
    assert!(!core.file_by_id(doc).unwrap().is_root());
}

#[test]
fn parents_are_ordered_from_the_root_down() {
    let core = TreeCore::new();
    let notes = core.add("notes", core.root, FileKind::Folder);
    let work = core.add("work", notes, FileKind::Folder);

    let crumbs = parents_of(&core, work).unwrap();
    let names: Vec<&str> = crumbs.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["notes", "work"]);
    assert!(parents_of(&core, core.root).unwrap().is_empty());
}

#[test]
fn list_dir_defaults_to_the_root() {
    let core = TreeCore::new();
    core.add("todo.md", core.root, FileKind::Document);
    let folder = core.add("archive", core.root, FileKind::Folder);
    core.add("old.md", folder, FileKind::Document);

    let listing = list_dir(&core, None).unwrap();
    assert_eq!(listing.id, core.root);
    assert!(listing.parents.is_empty());
    let names: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["archive", "todo.md"]);

    let nested = list_dir(&core, Some(folder)).unwrap();
    assert_eq!(nested.parents.len(), 1);
    assert_eq!(nested.files.len(), 1);
}

#[test]
fn list_dir_of_unknown_folder_fails() {
    let core = TreeCore::new();
    let err = list_dir(&core, Some(FileId::new_v4())).unwrap_err();
    assert_eq!(err.code, CoreErrorCode::FileNotFound);
}

#[test]
fn file_id_parses_its_display_form() {
    let id = FileId::new_v4();
    assert_eq!(id.to_string().parse::<FileId>().unwrap(), id);
    assert!("not-a-uuid".parse::<FileId>().is_err());
}
