//! File events and the sources that produce them

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Kind of change that can trigger a sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Renamed,
}

/// A file appeared in the watched directory, either freshly created or
/// renamed into its final name (e.g. `file.pdf.part` -> `file.pdf`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

impl FileEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: FileEventKind::Created,
            path: path.into(),
        }
    }

    pub fn renamed(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: FileEventKind::Renamed,
            path: path.into(),
        }
    }

    /// Translate a raw notify event into the events the engine reacts to.
    ///
    /// Only creations and the new side of renames are kept. Backends that
    /// cannot tell the two sides apart report every path; the engine's
    /// existence check discards the stale one.
    pub fn from_notify(event: &Event) -> Vec<FileEvent> {
        match event.kind {
            EventKind::Create(CreateKind::Folder) => Vec::new(),
            EventKind::Create(_) => event.paths.iter().map(FileEvent::created).collect(),
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::From => Vec::new(),
                RenameMode::To => event.paths.iter().map(FileEvent::renamed).collect(),
                RenameMode::Both => event
                    .paths
                    .get(1)
                    .map(FileEvent::renamed)
                    .into_iter()
                    .collect(),
                RenameMode::Any | RenameMode::Other => {
                    event.paths.iter().map(FileEvent::renamed).collect()
                }
            },
            _ => Vec::new(),
        }
    }
}

/// A lazy, unbounded stream of file events.
///
/// The engine only depends on this trait; the OS watcher is one
/// implementation and a plain channel receiver is another.
pub trait EventSource: Send {
    /// Next event, or `None` once the source is exhausted
    fn next_event(&mut self) -> impl Future<Output = Option<FileEvent>> + Send;
}

impl EventSource for mpsc::UnboundedReceiver<FileEvent> {
    fn next_event(&mut self) -> impl Future<Output = Option<FileEvent>> + Send {
        self.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::DataChange;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        Event {
            kind,
            paths: paths.iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_create_file() {
        let events = FileEvent::from_notify(&event(
            EventKind::Create(CreateKind::File),
            &["/dl/a.pdf"],
        ));
        assert_eq!(events, vec![FileEvent::created("/dl/a.pdf")]);
    }

    #[test]
    fn test_create_folder_ignored() {
        let events = FileEvent::from_notify(&event(
            EventKind::Create(CreateKind::Folder),
            &["/dl/Documents"],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn test_rename_both_keeps_new_path() {
        let events = FileEvent::from_notify(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/dl/a.pdf.part", "/dl/a.pdf"],
        ));
        assert_eq!(events, vec![FileEvent::renamed("/dl/a.pdf")]);
    }

    #[test]
    fn test_rename_sides() {
        let from = FileEvent::from_notify(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::From)),
            &["/dl/a.pdf.part"],
        ));
        assert!(from.is_empty());

        let to = FileEvent::from_notify(&event(
            EventKind::Modify(ModifyKind::Name(RenameMode::To)),
            &["/dl/a.pdf"],
        ));
        assert_eq!(to, vec![FileEvent::renamed("/dl/a.pdf")]);
    }

    #[test]
    fn test_data_changes_ignored() {
        let events = FileEvent::from_notify(&event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/dl/a.pdf"],
        ));
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_channel_source() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(FileEvent::created("/dl/a.pdf")).unwrap();
        drop(tx);

        assert_eq!(rx.next_event().await, Some(FileEvent::created("/dl/a.pdf")));
        assert_eq!(rx.next_event().await, None);
    }
}
