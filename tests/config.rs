#[cfg(test)]
mod tests {
    use relorm::libs::config::{DbConfig, CONFIG_FILE_NAME, DEFAULT_DB_NAME};
    use relorm::libs::data_storage::DataStorage;
    use std::fs;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};

    struct ConfigTestContext {
        temp_dir: TempDir,
    }

    impl TestContext for ConfigTestContext {
        fn setup() -> Self {
            ConfigTestContext {
                temp_dir: tempfile::tempdir().unwrap(),
            }
        }
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_default_config(_ctx: &mut ConfigTestContext) {
        let config = DbConfig::default();
        assert_eq!(config.name, DEFAULT_DB_NAME);
        assert_eq!(config.version, 1);
        assert!(config.directory.is_none());
        assert!(config.path().ends_with(DEFAULT_DB_NAME));
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_explicit_directory_wins(ctx: &mut ConfigTestContext) {
        let config = DbConfig::new("app.db", 3).with_directory(ctx.temp_dir.path());
        assert_eq!(config.directory(), ctx.temp_dir.path());
        assert_eq!(config.path(), ctx.temp_dir.path().join("app.db"));
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_save_and_read(ctx: &mut ConfigTestContext) {
        let path = ctx.temp_dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = DbConfig::new("saved.db", 7).with_directory(ctx.temp_dir.path().join("data"));

        config.save(&path).unwrap();
        assert_eq!(DbConfig::read(&path).unwrap(), config);
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_directory_is_optional_in_json(ctx: &mut ConfigTestContext) {
        let path = ctx.temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "name": "plain.db", "version": 2 }"#).unwrap();

        let config = DbConfig::read(&path).unwrap();
        assert_eq!(config, DbConfig::new("plain.db", 2));
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_read_failures(ctx: &mut ConfigTestContext) {
        assert!(DbConfig::read(&ctx.temp_dir.path().join("missing.json")).is_err());

        let path = ctx.temp_dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        let error = DbConfig::read(&path).unwrap_err();
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test_context(ConfigTestContext)]
    #[test]
    fn test_read_default_uses_data_directory(ctx: &mut ConfigTestContext) {
        // Mock the home/appdata directory for cross-platform compatibility.
        std::env::set_var("HOME", ctx.temp_dir.path());
        std::env::set_var("LOCALAPPDATA", ctx.temp_dir.path());

        assert_eq!(DbConfig::read_default().unwrap(), DbConfig::default());

        let path = DataStorage::new().get_path(CONFIG_FILE_NAME).unwrap();
        DbConfig::new("custom.db", 5).save(&path).unwrap();

        let config = DbConfig::read_default().unwrap();
        assert_eq!(config.name, "custom.db");
        assert_eq!(config.version, 5);
        assert!(config.path().starts_with(ctx.temp_dir.path()));
    }
}
