#[cfg(test)]
mod tests {
    use relorm::db::Database;
    use relorm::libs::config::DbConfig;
    use relorm::libs::relation::{Action, ActionMask, Relation};
    use relorm::libs::schema::{Entity, EntitySchema};
    use relorm::libs::value::Value;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Address {
        id: Option<i64>,
        line: Option<String>,
    }

    impl Entity for Address {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("addresses")
                .primary_key("id", |a| &a.id, |a, v| a.id = v)
                .column("line", |a| &a.line, |a, v| a.line = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct User {
        id: Option<i64>,
        name: Option<String>,
        address_id: Option<i64>,
        address: Option<Address>,
    }

    impl Entity for User {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("users")
                .primary_key("id", |u| &u.id, |u, v| u.id = v)
                .column("name", |u| &u.name, |u, v| u.name = v)
                .column("address_id", |u| &u.address_id, |u, v| u.address_id = v)
                .one_to_one(Relation::new("address_id", "id"), |u| &u.address, |u, v| u.address = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Page {
        id: Option<i64>,
        book_id: Option<i64>,
        number: Option<i32>,
    }

    impl Entity for Page {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("pages")
                .primary_key("id", |p| &p.id, |p, v| p.id = v)
                .column("book_id", |p| &p.book_id, |p, v| p.book_id = v)
                .column("number", |p| &p.number, |p, v| p.number = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Book {
        id: Option<i64>,
        author_id: Option<i64>,
        title: Option<String>,
        pages: Vec<Page>,
    }

    impl Entity for Book {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("books")
                .primary_key("id", |b| &b.id, |b, v| b.id = v)
                .column("author_id", |b| &b.author_id, |b, v| b.author_id = v)
                .column("title", |b| &b.title, |b, v| b.title = v)
                .one_to_many(Relation::new("id", "book_id").actions(ActionMask::ALL), |b| &b.pages, |b, v| b.pages = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Author {
        id: Option<i64>,
        name: Option<String>,
        books: Vec<Book>,
    }

    impl Entity for Author {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("authors")
                .primary_key("id", |a| &a.id, |a, v| a.id = v)
                .column("name", |a| &a.name, |a, v| a.name = v)
                .one_to_many(Relation::new("id", "author_id").actions(ActionMask::ALL), |a| &a.books, |a, v| a.books = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Post {
        id: Option<i64>,
        blogger_id: Option<i64>,
        title: Option<String>,
    }

    impl Entity for Post {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("posts")
                .primary_key("id", |p| &p.id, |p, v| p.id = v)
                .column("blogger_id", |p| &p.blogger_id, |p, v| p.blogger_id = v)
                .column("title", |p| &p.title, |p, v| p.title = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Blogger {
        id: Option<i64>,
        name: Option<String>,
        posts: Vec<Post>,
    }

    impl Entity for Blogger {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("bloggers")
                .primary_key("id", |b| &b.id, |b, v| b.id = v)
                .column("name", |b| &b.name, |b, v| b.name = v)
                .one_to_many(Relation::new("id", "blogger_id").actions(ActionMask::NONE), |b| &b.posts, |b, v| b.posts = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Label {
        id: Option<i64>,
        shop_id: Option<i64>,
        text: Option<String>,
    }

    impl Entity for Label {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("labels")
                .primary_key("id", |l| &l.id, |l, v| l.id = v)
                .column("shop_id", |l| &l.shop_id, |l, v| l.shop_id = v)
                .column("text", |l| &l.text, |l, v| l.text = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Shop {
        id: Option<i64>,
        name: Option<String>,
        labels: Vec<Label>,
    }

    impl Entity for Shop {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("shops")
                .primary_key("id", |s| &s.id, |s, v| s.id = v)
                .column("name", |s| &s.name, |s, v| s.name = v)
                .many_to_many(Relation::new("id", "shop_id"), |s| &s.labels, |s, v| s.labels = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Leaf {
        id: Option<i64>,
        tree_id: Option<i64>,
    }

    impl Entity for Leaf {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("leaves")
                .primary_key("id", |l| &l.id, |l, v| l.id = v)
                .column("tree_id", |l| &l.tree_id, |l, v| l.tree_id = v)
                .build()
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Tree {
        id: Option<i64>,
        name: Option<String>,
        leaves: Vec<Leaf>,
    }

    impl Entity for Tree {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("trees")
                .primary_key("id", |t| &t.id, |t, v| t.id = v)
                .column("name", |t| &t.name, |t, v| t.name = v)
                .one_to_many(Relation::new("id", "tree_id"), |t| &t.leaves, |t, v| t.leaves = v)
                .build()
        }
    }

    /// Same table as [`Tree`], but its leaves go with it.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct PrunedTree {
        id: Option<i64>,
        name: Option<String>,
        leaves: Vec<Leaf>,
    }

    impl Entity for PrunedTree {
        fn schema() -> EntitySchema<Self> {
            EntitySchema::<Self>::builder()
                .table("trees")
                .primary_key("id", |t| &t.id, |t, v| t.id = v)
                .column("name", |t| &t.name, |t, v| t.name = v)
                .one_to_many(Relation::new("id", "tree_id").actions(ActionMask::ALL), |t| &t.leaves, |t, v| t.leaves = v)
                .build()
        }
    }

    fn book(title: &str) -> Book {
        Book {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    fn author(name: &str, titles: &[&str]) -> Author {
        Author {
            id: None,
            name: Some(name.to_string()),
            books: titles.iter().map(|t| book(t)).collect(),
        }
    }

    struct RelationTestContext {
        _temp_dir: TempDir,
        db: Database,
    }

    impl TestContext for RelationTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let config = DbConfig::new("relations.db", 1).with_directory(temp_dir.path());
            let db = Database::builder(config)
                .register::<User>()
                .register::<Author>()
                .register::<Blogger>()
                .register::<Shop>()
                .register::<Tree>()
                .register::<PrunedTree>()
                .build();
            RelationTestContext { _temp_dir: temp_dir, db }
        }
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_unregistered_related_tables_are_created(ctx: &mut RelationTestContext) {
        let tables = ctx.db.table_names();
        for table in ["users", "addresses", "authors", "books", "pages", "bloggers", "posts", "shops", "labels"] {
            assert!(tables.iter().any(|t| t == table), "missing table {}", table);
        }
        assert_eq!(ctx.db.relation_graph().reachable("authors", Action::Delete), vec!["books", "pages"]);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_one_to_one_insert_and_query(ctx: &mut RelationTestContext) {
        let users = ctx.db.dao::<User>();
        let user = User {
            id: None,
            name: Some("A".into()),
            address_id: Some(1),
            address: Some(Address {
                id: None,
                line: Some("X St".into()),
            }),
        };

        let id = users.insert(&user);
        assert_eq!(id, 1);

        let loaded = users.query_one(1i64).unwrap();
        assert_eq!(
            loaded,
            User {
                id: Some(1),
                name: Some("A".into()),
                address_id: Some(1),
                address: Some(Address {
                    id: Some(1),
                    line: Some("X St".into()),
                }),
            }
        );
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_missing_key_value_skips_the_cascade(ctx: &mut RelationTestContext) {
        let users = ctx.db.dao::<User>();
        let user = User {
            id: None,
            name: Some("B".into()),
            address_id: None,
            address: Some(Address {
                id: None,
                line: Some("Nowhere".into()),
            }),
        };

        let id = users.insert(&user);
        assert!(id > 0);
        assert_eq!(ctx.db.dao::<Address>().query_count(), 0);
        assert_eq!(users.query_one(id).and_then(|u| u.address), None);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_one_to_many_insert_and_query(ctx: &mut RelationTestContext) {
        let authors = ctx.db.dao::<Author>();
        let books = ctx.db.dao::<Book>();

        let id = authors.insert(&author("Le Guin", &["Earthsea", "Lathe", "Dispossessed"]));
        assert_eq!(books.query_count_where("author_id = ?", &[Value::Long(id)]), 3);

        let loaded = authors.query_one(id).unwrap();
        assert_eq!(loaded.books.len(), 3);
        assert!(loaded.books.iter().all(|b| b.author_id == Some(id) && b.id.is_some()));
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_many_to_many_follows_the_default_mask(ctx: &mut RelationTestContext) {
        let shops = ctx.db.dao::<Shop>();
        let labels = ctx.db.dao::<Label>();
        let shop = Shop {
            id: None,
            name: Some("corner".into()),
            labels: vec![
                Label {
                    text: Some("open".into()),
                    ..Default::default()
                },
                Label {
                    text: Some("late".into()),
                    ..Default::default()
                },
            ],
        };

        let id = shops.insert(&shop);
        let texts: Vec<String> = shops.query_one(id).unwrap().labels.into_iter().filter_map(|l| l.text).collect();
        assert_eq!(texts, vec!["open", "late"]);

        assert_eq!(shops.delete(id), 1);
        assert_eq!(labels.query_count(), 2);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_empty_mask_cascades_nothing(ctx: &mut RelationTestContext) {
        let bloggers = ctx.db.dao::<Blogger>();
        let posts = ctx.db.dao::<Post>();
        let blogger = Blogger {
            id: None,
            name: Some("quiet".into()),
            posts: vec![Post {
                title: Some("draft".into()),
                ..Default::default()
            }],
        };

        let id = bloggers.insert(&blogger);
        assert_eq!(posts.query_count(), 0);

        posts.insert(&Post {
            id: None,
            blogger_id: Some(id),
            title: Some("manual".into()),
        });
        assert!(bloggers.query_one(id).unwrap().posts.is_empty());

        assert_eq!(bloggers.delete(id), 1);
        assert_eq!(posts.query_count(), 1);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_update_cascades_to_children(ctx: &mut RelationTestContext) {
        let authors = ctx.db.dao::<Author>();
        let books = ctx.db.dao::<Book>();
        let id = authors.insert(&author("Banks", &["Consider Phlebas", "Excession"]));

        let mut loaded = authors.query_one(id).unwrap();
        loaded.name = Some("Iain Banks".into());
        loaded.books[0].title = Some("Use of Weapons".into());
        assert_eq!(authors.update(&loaded), 1);

        let titles: Vec<String> = books
            .query_list_where("author_id = ?", vec![Value::Long(id)])
            .into_iter()
            .filter_map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Use of Weapons", "Excession"]);
        assert_eq!(authors.query_one(id).and_then(|a| a.name), Some("Iain Banks".to_string()));
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_delete_cascades_through_chained_relations(ctx: &mut RelationTestContext) {
        let authors = ctx.db.dao::<Author>();
        let books = ctx.db.dao::<Book>();
        let pages = ctx.db.dao::<Page>();

        let kept = authors.insert(&author("Kept", &["Stays"]));
        let gone = authors.insert(&author("Gone", &["First", "Second"]));
        for b in books.query_list() {
            pages.insert(&Page {
                id: None,
                book_id: b.id,
                number: Some(1),
            });
        }
        assert_eq!(pages.query_count(), 3);

        assert_eq!(authors.delete(gone), 1);

        assert_eq!(books.query_count(), 1);
        assert_eq!(books.query_count_where("author_id = ?", &[Value::Long(kept)]), 1);
        assert_eq!(pages.query_count(), 1);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_delete_where_does_not_cascade(ctx: &mut RelationTestContext) {
        let authors = ctx.db.dao::<Author>();
        let books = ctx.db.dao::<Book>();
        authors.insert(&author("Orphaned", &["Left", "Behind"]));

        assert_eq!(authors.delete_where("name = ?", &[Value::Text("Orphaned".into())]), 1);
        assert_eq!(authors.query_count(), 0);
        assert_eq!(books.query_count(), 2);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_delete_one_cascades(ctx: &mut RelationTestContext) {
        let authors = ctx.db.dao::<Author>();
        let books = ctx.db.dao::<Book>();
        let id = authors.insert(&author("Single", &["Only"]));

        let loaded = authors.query_one(id).unwrap();
        assert_eq!(authors.delete_one(&loaded), 1);
        assert_eq!(books.query_count(), 0);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_delete_all_clears_reachable_tables(ctx: &mut RelationTestContext) {
        let authors = ctx.db.dao::<Author>();
        let books = ctx.db.dao::<Book>();
        let pages = ctx.db.dao::<Page>();
        let users = ctx.db.dao::<User>();

        authors.insert(&author("Everyone", &["One", "Two"]));
        for b in books.query_list() {
            pages.insert(&Page {
                id: None,
                book_id: b.id,
                number: Some(7),
            });
        }
        users.insert(&User {
            name: Some("bystander".into()),
            ..Default::default()
        });

        assert_eq!(authors.delete_all(), 5);
        assert_eq!(books.query_count(), 0);
        assert_eq!(pages.query_count(), 0);
        assert_eq!(users.query_count(), 1);
    }

    #[test_context(RelationTestContext)]
    #[test]
    fn test_types_sharing_a_table_keep_their_own_masks(ctx: &mut RelationTestContext) {
        let trees = ctx.db.dao::<Tree>();
        let pruned = ctx.db.dao::<PrunedTree>();
        let leaves = ctx.db.dao::<Leaf>();

        let kept = trees.insert(&Tree {
            id: None,
            name: Some("oak".into()),
            leaves: vec![Leaf::default(), Leaf::default()],
        });
        let gone = pruned.insert(&PrunedTree {
            id: None,
            name: Some("elm".into()),
            leaves: vec![Leaf::default()],
        });
        assert_eq!(leaves.query_count(), 3);

        assert_eq!(pruned.delete(gone), 1);
        assert_eq!(leaves.query_count(), 2);

        assert_eq!(trees.delete(kept), 1);
        assert_eq!(leaves.query_count(), 2);
    }
}
