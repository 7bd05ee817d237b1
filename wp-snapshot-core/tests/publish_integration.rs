use async_trait::async_trait;
use std::sync::Mutex;

use wp_snapshot_core::contract::{
    FileWrite, MockSnapshotStore, NormalizedRecord, RemoteFile, SnapshotStore, StoreError,
};
use wp_snapshot_core::publish::{publish, PublishAction, PublishError, PublishTarget};
use wp_snapshot_core::snapshot::Snapshot;

const PATH: &str = "data/knowledge_base.json";

fn target() -> PublishTarget<'static> {
    PublishTarget {
        path: PATH,
        message_prefix: None,
    }
}

fn snapshot(n: usize, tag: &str) -> Snapshot {
    Snapshot::new(
        (0..n)
            .map(|i| NormalizedRecord {
                title: format!("{tag} article {i}"),
                link: format!("https://kb.example.org/{tag}/{i}"),
                body: "Zählerstand prüfen".to_string(),
                publish_date: "2024-06-01T12:00:00".to_string(),
            })
            .collect(),
    )
}

/// In-memory repository holding a single file, with a revision counter.
#[derive(Default)]
struct MemoryStore {
    file: Mutex<Option<RemoteFile>>,
    writes: Mutex<Vec<(String, Option<String>)>>,
    next_rev: Mutex<u32>,
}

impl MemoryStore {
    fn bump(&self) -> String {
        let mut n = self.next_rev.lock().unwrap();
        *n += 1;
        format!("rev-{n}")
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        Ok(self
            .file
            .lock()
            .unwrap()
            .clone()
            .filter(|f| f.path == path))
    }

    async fn create_file<'a>(&self, write: FileWrite<'a>) -> Result<String, StoreError> {
        let mut file = self.file.lock().unwrap();
        if file.is_some() {
            return Err(StoreError::Status {
                status: 422,
                message: "sha wasn't supplied".into(),
            });
        }
        let revision = self.bump();
        *file = Some(RemoteFile {
            path: write.path.to_string(),
            revision: revision.clone(),
            content: Some(write.content.to_string()),
        });
        self.writes
            .lock()
            .unwrap()
            .push((write.message.to_string(), None));
        Ok(revision)
    }

    async fn update_file<'a>(
        &self,
        write: FileWrite<'a>,
        revision: &'a str,
    ) -> Result<String, StoreError> {
        let mut file = self.file.lock().unwrap();
        match file.as_ref() {
            Some(current) if current.revision == revision => {}
            _ => {
                return Err(StoreError::Status {
                    status: 409,
                    message: "revision mismatch".into(),
                })
            }
        }
        let new_revision = self.bump();
        *file = Some(RemoteFile {
            path: write.path.to_string(),
            revision: new_revision.clone(),
            content: Some(write.content.to_string()),
        });
        self.writes
            .lock()
            .unwrap()
            .push((write.message.to_string(), Some(revision.to_string())));
        Ok(new_revision)
    }
}

#[tokio::test]
async fn empty_snapshot_is_rejected_without_touching_the_store() {
    // No expectations: any call on the mock fails the test.
    let store = MockSnapshotStore::new();

    let result = publish(&Snapshot::empty(), &store, target()).await;

    assert!(matches!(result, Err(PublishError::Rejected(_))));
}

#[tokio::test]
async fn first_publish_creates_then_changed_snapshot_updates_with_returned_revision() {
    let store = MemoryStore::default();

    let first = publish(&snapshot(60, "a"), &store, target())
        .await
        .expect("first publish should succeed");
    assert_eq!(first.action, PublishAction::Created);
    assert_eq!(first.record_count, 60);
    assert_eq!(first.revision, "rev-1");

    let second = publish(&snapshot(75, "b"), &store, target())
        .await
        .expect("second publish should succeed");
    assert_eq!(second.action, PublishAction::Updated);
    assert_eq!(second.record_count, 75);
    assert_eq!(second.revision, "rev-2");

    let writes = store.writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].1, None);
    assert_eq!(writes[1].1.as_deref(), Some("rev-1"));
    assert!(writes[1].0.contains("75 articles"));

    let stored = store.file.lock().unwrap().clone().unwrap();
    let roundtrip = Snapshot::from_json(stored.content.as_deref().unwrap()).unwrap();
    assert_eq!(roundtrip, snapshot(75, "b"));
}

#[tokio::test]
async fn identical_snapshot_is_not_written_again() {
    let store = MemoryStore::default();
    publish(&snapshot(60, "a"), &store, target()).await.unwrap();

    let again = publish(&snapshot(60, "a"), &store, target()).await.unwrap();

    assert_eq!(again.action, PublishAction::Unchanged);
    assert_eq!(again.revision, "rev-1");
    assert_eq!(store.writes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn update_uses_the_existing_revision_handle() {
    let mut store = MockSnapshotStore::new();
    store.expect_get_file().times(1).returning(|path| {
        Ok(Some(RemoteFile {
            path: path.to_string(),
            revision: "abc123".to_string(),
            content: Some("[]\n".to_string()),
        }))
    });
    store.expect_create_file().never();
    store
        .expect_update_file()
        .withf(|write: &FileWrite<'_>, revision: &str| {
            write.path == PATH && revision == "abc123" && write.content.contains("\"title\"")
        })
        .times(1)
        .returning(|_, _| Ok("def456".to_string()));

    let report = publish(&snapshot(50, "a"), &store, target()).await.unwrap();

    assert_eq!(report.action, PublishAction::Updated);
    assert_eq!(report.revision, "def456");
}

#[tokio::test]
async fn write_failure_is_surfaced_verbatim_and_not_retried() {
    let mut store = MockSnapshotStore::new();
    store.expect_get_file().times(1).returning(|_| Ok(None));
    store
        .expect_create_file()
        .times(1)
        .returning(|_| {
            Err(StoreError::Status {
                status: 401,
                message: "Bad credentials".into(),
            })
        });

    let err = publish(&snapshot(50, "a"), &store, target()).await.unwrap_err();

    match err {
        PublishError::Failure(msg) => assert!(msg.contains("Bad credentials"), "{msg}"),
        other => panic!("expected Failure, got {other:?}"),
    }
}

#[tokio::test]
async fn lookup_failure_aborts_before_writing() {
    let mut store = MockSnapshotStore::new();
    store
        .expect_get_file()
        .times(1)
        .returning(|_| Err(StoreError::Transport("connection refused".into())));
    store.expect_create_file().never();
    store.expect_update_file().never();

    let err = publish(&snapshot(50, "a"), &store, target()).await.unwrap_err();

    assert!(matches!(err, PublishError::Failure(ref m) if m.contains("connection refused")));
}
