#[cfg(test)]
mod tests {
    use relorm::db::Database;
    use relorm::libs::config::DbConfig;
    use relorm::libs::schema::{Entity, EntitySchema};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Counter {
        id: Option<i64>,
        left: Option<i64>,
        right: Option<i64>,
    }

    impl Entity for Counter {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("counters")
                .primary_key("id", |c| &c.id, |c, v| c.id = v)
                .column("left_value", |c| &c.left, |c, v| c.left = v)
                .column("right_value", |c| &c.right, |c, v| c.right = v)
                .build()
        }
    }

    fn counter(value: i64) -> Counter {
        Counter {
            id: None,
            left: Some(value),
            right: Some(value),
        }
    }

    struct SessionTestContext {
        _temp_dir: TempDir,
        db: Database,
    }

    impl TestContext for SessionTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let config = DbConfig::new("sessions.db", 1).with_directory(temp_dir.path());
            let db = Database::builder(config).register::<Counter>().build();
            SessionTestContext { _temp_dir: temp_dir, db }
        }
    }

    #[test_context(SessionTestContext)]
    #[test]
    fn test_connection_closes_after_each_standalone_operation(ctx: &mut SessionTestContext) {
        let counters = ctx.db.dao::<Counter>();

        assert!(!ctx.db.is_open());
        assert!(counters.insert(&counter(1)) > 0);
        assert!(!ctx.db.is_open());
        assert_eq!(ctx.db.session_count(), 0);
    }

    #[test_context(SessionTestContext)]
    #[test]
    fn test_sessions_are_reference_counted(ctx: &mut SessionTestContext) {
        let counters = ctx.db.dao::<Counter>();

        let first = ctx.db.open_session();
        let second = ctx.db.open_session();
        assert_eq!(ctx.db.session_count(), 2);
        assert!(!ctx.db.is_open());

        counters.insert(&counter(1));
        assert!(ctx.db.is_open());
        assert_eq!(ctx.db.session_count(), 2);

        drop(first);
        assert!(ctx.db.is_open());

        drop(second);
        assert_eq!(ctx.db.session_count(), 0);
        assert!(!ctx.db.is_open());

        assert_eq!(counters.query_count(), 1);
    }

    #[test_context(SessionTestContext)]
    #[test]
    fn test_lock_bracket_blocks_other_threads(ctx: &mut SessionTestContext) {
        let counters = ctx.db.dao::<Counter>();
        let (done_tx, done_rx) = mpsc::channel();

        let locked = counters.lock();
        let worker = {
            let counters = counters.clone();
            thread::spawn(move || {
                counters.insert(&counter(2));
                done_tx.send(()).unwrap();
            })
        };

        locked.insert(&counter(1));
        thread::sleep(Duration::from_millis(100));
        assert!(done_rx.try_recv().is_err());
        assert_eq!(locked.query_list().len(), 1);

        drop(locked);
        done_rx.recv().unwrap();
        worker.join().unwrap();
        assert_eq!(counters.query_count(), 2);
    }

    #[test_context(SessionTestContext)]
    #[test]
    fn test_concurrent_writers_never_interleave(ctx: &mut SessionTestContext) {
        let counters = ctx.db.dao::<Counter>();
        let id = counters.insert(&counter(0));

        let writers: Vec<_> = (1..=4)
            .map(|n| {
                let counters = counters.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let value = n * 1000 + i;
                        assert_eq!(
                            counters.update(&Counter {
                                id: Some(id),
                                left: Some(value),
                                right: Some(value),
                            }),
                            1
                        );
                        assert!(counters.insert(&counter(value)) > 0);
                    }
                })
            })
            .collect();

        let reader = {
            let counters = counters.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let current = counters.query_one(id).unwrap();
                    assert_eq!(current.left, current.right);
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(counters.query_count(), 101);
        assert_eq!(ctx.db.session_count(), 0);
        assert!(!ctx.db.is_open());
    }

    #[test_context(SessionTestContext)]
    #[test]
    fn test_is_open_does_not_wait_for_a_held_lock(ctx: &mut SessionTestContext) {
        let counters = ctx.db.dao::<Counter>();
        let (state_tx, state_rx) = mpsc::channel();

        let locked = counters.lock();
        locked.insert(&counter(1));

        let watcher = {
            let db = ctx.db.clone();
            thread::spawn(move || {
                state_tx.send((db.is_open(), db.is_locked())).unwrap();
            })
        };

        assert_eq!(state_rx.recv_timeout(Duration::from_secs(5)), Ok((true, true)));
        watcher.join().unwrap();

        drop(locked);
        assert!(!ctx.db.is_open());
    }
}
