#[derive(Debug, Clone)]
pub enum Message {
    // === SCHEMA MESSAGES ===
    DuplicatePrimaryKey(String),  // column
    EntityWithoutTable(String),   // type name
    UnknownForeignKey {
        relation: String,
        table: String,
        column: String,
    },
    FieldSkipped {
        column: String,
        error: String,
    },

    // === CONNECTION MESSAGES ===
    DatabaseOpened(String), // path
    DatabaseClosed(String), // path
    ExecutingSql(String),

    // === MIGRATION MESSAGES ===
    MigrationStarted {
        from: u32,
        to: u32,
    },
    MigrationStatement(String),
    OrphanTable(String),
    OrphanColumn {
        table: String,
        column: String,
    },
    MigrationCompleted {
        version: u32,
        statements: usize,
    },
    DatabaseUpToDate(u32),
    DatabaseDowngrade {
        stored: u32,
        requested: u32,
    },
    MigrationFailed(String),

    // === OPERATION MESSAGES ===
    OperationFailed {
        operation: &'static str,
        error: String,
    },
    CascadeSkipped {
        relation: String,
        reason: String,
    },
    CascadeDepthReached(String), // table

    // === INSPECTION MESSAGES ===
    TablesHeader,
    NoTables,
    ColumnsHeader(String),
    TableNotFound(String),
    MigrationHistoryHeader,
    NoMigrationHistory,
    DatabaseVersion {
        path: String,
        version: u32,
    },
    RowsAffected(i64),
    NoRowsReturned,
    StatementFailed,
}
