//! Session state and the statement dispatcher.
//!
//! A [`Session`] owns everything that outlives a single statement: the
//! operating mode, the capture log handle, and the per-session memory of
//! which tables have already been augmented or had their schema captured.
//! The transport is passed in per call so one session can outlive
//! reconnects.

use chrono::Utc;
use provgres_core::{DedupSet, Mode, Settings};
use provgres_log::{CaptureLog, ReplayLog};
use provgres_sql::{
    alter_table_add_provenance, classify, query_id, split_table_list, ProvenanceQuery, Statement,
    StatementKind,
};
use uuid::Uuid;

use crate::error::ClientError;
use crate::outcome::QueryOutcome;
use crate::transport::QueryTransport;

/// One provenance-tracking client session.
pub struct Session {
    settings: Settings,
    pid: u32,
    connection_id: Uuid,
    modified_tables: DedupSet,
    captured_tables: DedupSet,
    capture: Option<CaptureLog>,
    replay: Option<ReplayLog>,
    connection_logged: bool,
}

impl Session {
    /// Initialize a session from settings. Opens the capture log file when
    /// the mode calls for one and the replay log when a path is configured.
    pub fn new(settings: Settings) -> Result<Self, ClientError> {
        let pid = std::process::id();

        let capture = if settings.mode.opens_capture_log() {
            let label = settings.session_id.to_string();
            let log =
                CaptureLog::create(&settings.log_directory, settings.session_id, pid, &label)?;
            tracing::info!(path = %log.path().display(), "capture log opened");
            Some(log)
        } else {
            None
        };

        let replay = if settings.mode.opens_replay_log() {
            match &settings.replay_path {
                Some(path) => Some(ReplayLog::open(path)?),
                None => {
                    tracing::warn!(mode = settings.mode.code(), "replay mode without a replay log path");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            settings,
            pid,
            connection_id: Uuid::new_v4(),
            modified_tables: DedupSet::new(),
            captured_tables: DedupSet::new(),
            capture,
            replay,
            connection_logged: false,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub(crate) fn session_id(&self) -> i32 {
        self.settings.session_id
    }

    pub(crate) fn capture_log(&self) -> Option<&CaptureLog> {
        self.capture.as_ref()
    }

    pub(crate) fn harvests_mutations(&self) -> bool {
        self.settings.harvest_mutations
    }

    pub(crate) fn remember_captured_table(&mut self, table: &str) -> bool {
        self.captured_tables.insert(table)
    }

    /// Capture one raw wire read, if the mode asks for it. Returns the
    /// package counter assigned to the record.
    pub fn record_raw_read(&self, payload: &[u8]) -> Result<Option<i64>, ClientError> {
        match (&self.capture, self.settings.mode) {
            (Some(log), Mode::CaptureRaw) => Ok(Some(log.store_read(payload)?)),
            _ => Ok(None),
        }
    }

    /// Next captured wire payload from the replay log, in capture order.
    pub fn next_raw_read(&mut self) -> Result<Option<Vec<u8>>, ClientError> {
        match &mut self.replay {
            Some(log) => Ok(log.next_raw_read()?),
            None => Ok(None),
        }
    }

    /// Execute one statement, applying provenance rewriting when the mode
    /// calls for it.
    ///
    /// Everything the provenance layer does around the caller's statement
    /// is best-effort: a failed augmentation, probe or harvest is traced
    /// and abandoned, and the original statement still runs.
    pub async fn dispatch(
        &mut self,
        transport: &dyn QueryTransport,
        sql: &str,
    ) -> Result<QueryOutcome, ClientError> {
        if !self.settings.mode.rewrites_queries() {
            return transport.execute(sql).await;
        }

        self.log_connection_once(transport);

        let Some((kind, body)) = classify(sql) else {
            tracing::debug!(connection = %self.connection_id, "unclassified statement, forwarding unchanged");
            return transport.execute(sql).await;
        };

        if kind == StatementKind::Bypass {
            return transport.execute(body).await;
        }

        let statement = Statement::from_body(kind, body);
        let timestamp_micros = Utc::now().timestamp_micros();
        let id = query_id(self.pid, sql, timestamp_micros);
        let prov = ProvenanceQuery::assemble(statement, id, self.session_id(), timestamp_micros);

        tracing::debug!(
            connection = %self.connection_id,
            query_id = prov.query_id,
            kind = ?kind,
            "dispatching provenance statement"
        );

        match kind {
            StatementKind::Insert => self.dispatch_insert(transport, sql, &prov).await,
            StatementKind::Select => self.dispatch_select(transport, sql, &prov).await,
            StatementKind::Update | StatementKind::Delete => {
                self.dispatch_mutation(transport, sql, &prov).await
            }
            StatementKind::Bypass => transport.execute(sql).await,
        }
    }

    /// INSERT: capture the original statement, augment the target table,
    /// then run the derived insert (with bookkeeping values) instead of
    /// the original.
    async fn dispatch_insert(
        &mut self,
        transport: &dyn QueryTransport,
        original: &str,
        prov: &ProvenanceQuery,
    ) -> Result<QueryOutcome, ClientError> {
        if let Some(log) = &self.capture {
            if let Err(err) = log.store_insert(
                self.pid,
                prov.query_id,
                prov.version,
                prov.timestamp_micros,
                original,
            ) {
                tracing::warn!(error = %err, "failed to capture insert statement");
            }
        }

        let table = prov.statement.table.clone();
        self.ensure_augmented(transport, &table).await;

        match &prov.derived_sql {
            Some(derived) => transport.execute(derived).await,
            None => transport.execute(original).await,
        }
    }

    /// SELECT: augment every referenced table, materialize the provenance
    /// result as a temp view, harvest the contributing rows through it,
    /// then run the original statement so the caller sees exactly what it
    /// asked for.
    async fn dispatch_select(
        &mut self,
        transport: &dyn QueryTransport,
        original: &str,
        prov: &ProvenanceQuery,
    ) -> Result<QueryOutcome, ClientError> {
        let tables = prov.statement.table.clone();
        self.ensure_augmented_list(transport, &tables).await;
        if let Some(derived) = &prov.derived_sql {
            self.build_view_and_harvest(transport, &tables, derived).await;
        }
        transport.execute(original).await
    }

    /// UPDATE and DELETE: augment, probe for the rows about to be touched,
    /// optionally claim them, then run the original statement.
    async fn dispatch_mutation(
        &mut self,
        transport: &dyn QueryTransport,
        original: &str,
        prov: &ProvenanceQuery,
    ) -> Result<QueryOutcome, ClientError> {
        let tables = prov.statement.table.clone();
        self.ensure_augmented_list(transport, &tables).await;

        if let Some(probe) = &prov.derived_sql {
            match transport.execute(probe).await {
                Ok(outcome) if outcome.is_ok() => {
                    if self.harvests_mutations() {
                        self.harvest_probe(transport, &outcome).await;
                    }
                }
                Ok(outcome) => {
                    tracing::warn!(status = ?outcome.status, "provenance probe was rejected");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "provenance probe failed");
                }
            }
        }

        transport.execute(original).await
    }

    /// Record the connection identity in the capture log, once.
    fn log_connection_once(&mut self, transport: &dyn QueryTransport) {
        if self.connection_logged {
            return;
        }
        self.connection_logged = true;
        if let Some(log) = &self.capture {
            if let Err(err) = log.store_connection(transport.database(), transport.user()) {
                tracing::warn!(error = %err, "failed to capture connection identity");
            }
        }
    }

    /// Add the provenance columns to `table` the first time it is seen.
    ///
    /// The table is remembered before the ALTER runs, matching the
    /// once-per-session contract: a rejected ALTER (usually because the
    /// columns already exist from an earlier session) is not retried.
    pub(crate) async fn ensure_augmented(&mut self, transport: &dyn QueryTransport, table: &str) {
        if table.is_empty() || !self.modified_tables.insert(table) {
            return;
        }
        let sql = alter_table_add_provenance(table);
        tracing::debug!(table, "adding provenance columns");
        match transport.execute(&sql).await {
            Ok(outcome) if outcome.is_ok() => {}
            Ok(outcome) => {
                tracing::warn!(table, status = ?outcome.status, "schema augmentation rejected");
            }
            Err(err) => {
                tracing::warn!(table, error = %err, "schema augmentation failed");
            }
        }
    }

    /// Augment every table in a comma-separated FROM-style list.
    pub(crate) async fn ensure_augmented_list(
        &mut self,
        transport: &dyn QueryTransport,
        tables: &str,
    ) {
        for table in split_table_list(tables) {
            self.ensure_augmented(transport, &table).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use std::path::Path;

    fn capture_settings(dir: &Path, session_id: i32) -> Settings {
        Settings {
            mode: Mode::Capture,
            session_id,
            log_directory: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    fn log_contents(session: &Session) -> String {
        let path = session.capture_log().unwrap().path();
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn disabled_mode_forwards_everything_untouched() {
        let transport = MockTransport::new();
        let mut session = Session::new(Settings::default()).unwrap();

        session
            .dispatch(&transport, "SELECT x FROM t WHERE x>1")
            .await
            .unwrap();
        session
            .dispatch(&transport, "INSERT INTO t VALUES (1)")
            .await
            .unwrap();

        assert_eq!(
            transport.executed(),
            vec![
                "SELECT x FROM t WHERE x>1".to_string(),
                "INSERT INTO t VALUES (1)".to_string(),
            ]
        );
        assert!(session.capture_log().is_none());
    }

    #[tokio::test]
    async fn bypass_forwards_the_body_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        let mut session = Session::new(capture_settings(dir.path(), 3)).unwrap();

        session
            .dispatch(&transport, "BYPASS CREATE INDEX idx ON t (x)")
            .await
            .unwrap();

        assert_eq!(
            transport.executed(),
            vec!["CREATE INDEX idx ON t (x)".to_string()]
        );
    }

    #[tokio::test]
    async fn insert_is_captured_augmented_and_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        let mut session = Session::new(capture_settings(dir.path(), 5)).unwrap();

        session
            .dispatch(&transport, "INSERT INTO t VALUES (1)")
            .await
            .unwrap();

        let executed = transport.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].starts_with("ALTER TABLE t ADD COLUMN _prov_p"));
        assert!(executed[1].starts_with("INSERT INTO t VALUES (1, "));
        assert!(executed[1].ends_with(", 5, now())"));

        let log = log_contents(&session);
        assert!(log.contains("prv_store_dbname\tshop"));
        assert!(log.contains("prv_store_user\talice"));
        assert!(log.contains("\tINSERT INTO t VALUES (1)"));
    }

    #[tokio::test]
    async fn a_table_is_augmented_once_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        let mut session = Session::new(capture_settings(dir.path(), 5)).unwrap();

        session
            .dispatch(&transport, "INSERT INTO t VALUES (1)")
            .await
            .unwrap();
        session
            .dispatch(&transport, "INSERT INTO t VALUES (2)")
            .await
            .unwrap();

        let alters = transport
            .executed()
            .iter()
            .filter(|sql| sql.starts_with("ALTER TABLE"))
            .count();
        assert_eq!(alters, 1);

        // Identity records are written once, not per statement.
        let log = log_contents(&session);
        assert_eq!(log.matches("prv_store_dbname").count(), 1);
    }

    #[tokio::test]
    async fn select_builds_a_view_harvests_and_runs_the_original() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new()
            .respond(
                "select column_name",
                QueryOutcome::with_rows(
                    vec![
                        "column_name".into(),
                        "data_type".into(),
                        "character_maximum_length".into(),
                        "column_default".into(),
                    ],
                    vec![vec![
                        "id".into(),
                        "integer".into(),
                        String::new(),
                        String::new(),
                    ]],
                ),
            )
            .respond(
                "UPDATE t SET _prov_insertedby",
                QueryOutcome::with_rows(
                    vec!["id".into(), "_prov_rowid".into()],
                    vec![vec!["1".into(), "aaa".into()]],
                ),
            );
        let mut session = Session::new(capture_settings(dir.path(), 9)).unwrap();

        session
            .dispatch(&transport, "SELECT x FROM t WHERE x>1")
            .await
            .unwrap();

        let executed = transport.executed();
        assert!(executed[0].starts_with("ALTER TABLE t "));
        assert!(executed[1]
            .starts_with("CREATE OR REPLACE TEMP VIEW _prov_view_"));
        assert!(executed[1].ends_with(" AS SELECT PROVENANCE x FROM t WHERE x>1"));
        assert!(executed[2].starts_with("select column_name"));
        assert!(executed[3].starts_with("UPDATE t SET _prov_insertedby = 9 FROM _prov_view_"));
        assert!(executed[4].starts_with("DROP VIEW IF EXISTS _prov_view_"));
        assert_eq!(executed[5], "SELECT x FROM t WHERE x>1");

        let log = log_contents(&session);
        assert!(log.contains("prv_store_table\tCREATE TABLE t (id integer);"));
        assert!(log.contains("prv_store_row\taaa\tt\tINSERT INTO t VALUES ('1', 'aaa');"));
    }

    #[tokio::test]
    async fn update_probes_but_does_not_claim_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        let mut session = Session::new(capture_settings(dir.path(), 9)).unwrap();

        session
            .dispatch(&transport, "UPDATE t SET x = 2 WHERE id = 1")
            .await
            .unwrap();

        let executed = transport.executed();
        assert_eq!(executed.len(), 3);
        assert!(executed[0].starts_with("ALTER TABLE t "));
        assert_eq!(executed[1], "SELECT PROVENANCE * FROM t WHERE id = 1");
        assert_eq!(executed[2], "UPDATE t SET x = 2 WHERE id = 1");
    }

    #[tokio::test]
    async fn update_claims_probed_rows_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new().respond(
            "SELECT PROVENANCE",
            QueryOutcome::with_rows(
                vec!["x".into(), "prov_public_t___prov__rowid".into()],
                vec![vec!["1".into(), "aaa".into()]],
            ),
        );
        let settings = Settings {
            harvest_mutations: true,
            ..capture_settings(dir.path(), 9)
        };
        let mut session = Session::new(settings).unwrap();

        session
            .dispatch(&transport, "UPDATE t SET x = 2 WHERE id = 1")
            .await
            .unwrap();

        let claim = transport
            .executed()
            .into_iter()
            .find(|sql| sql.starts_with("UPDATE t SET _prov_insertedby = 9 WHERE"))
            .unwrap();
        assert!(claim.contains("_prov_insertedby = 0"));
        assert!(claim.contains("string_to_array('aaa',',')"));
        assert_eq!(
            transport.executed().last().unwrap(),
            "UPDATE t SET x = 2 WHERE id = 1"
        );
    }

    #[tokio::test]
    async fn unclassified_statements_pass_through_in_capture_mode() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new();
        let mut session = Session::new(capture_settings(dir.path(), 3)).unwrap();

        session
            .dispatch(&transport, "TRUNCATE TABLE t")
            .await
            .unwrap();

        assert_eq!(transport.executed(), vec!["TRUNCATE TABLE t".to_string()]);
    }

    #[tokio::test]
    async fn rejected_augmentation_does_not_fail_the_insert() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new()
            .respond("ALTER TABLE", QueryOutcome::failed("permission denied"));
        let mut session = Session::new(capture_settings(dir.path(), 5)).unwrap();

        let outcome = session
            .dispatch(&transport, "INSERT INTO t VALUES (1)")
            .await
            .unwrap();

        assert!(outcome.is_ok());
        let executed = transport.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[1].starts_with("INSERT INTO t VALUES (1, "));
    }

    #[tokio::test]
    async fn failed_view_creation_aborts_the_harvest_not_the_select() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new()
            .respond("CREATE OR REPLACE TEMP VIEW", QueryOutcome::failed("syntax error"));
        let mut session = Session::new(capture_settings(dir.path(), 9)).unwrap();

        let outcome = session
            .dispatch(&transport, "SELECT x FROM t WHERE x>1")
            .await
            .unwrap();

        assert!(outcome.is_ok());
        let executed = transport.executed();
        // Augment, failed view creation, then the caller's statement; no
        // claim and no view drop once the harvest is abandoned.
        assert_eq!(executed.len(), 3);
        assert!(!executed
            .iter()
            .any(|sql| sql.starts_with("UPDATE t SET _prov_insertedby")));
        assert!(!executed.iter().any(|sql| sql.starts_with("DROP VIEW")));
        assert_eq!(executed[2], "SELECT x FROM t WHERE x>1");
    }

    #[tokio::test]
    async fn claim_without_a_row_set_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MockTransport::new()
            .respond("UPDATE t SET _prov_insertedby", QueryOutcome::command_ok("UPDATE 0"));
        let mut session = Session::new(capture_settings(dir.path(), 9)).unwrap();

        let outcome = session
            .dispatch(&transport, "SELECT x FROM t WHERE x>1")
            .await
            .unwrap();

        assert!(outcome.is_ok());
        assert!(!log_contents(&session).contains("prv_store_row"));
        assert_eq!(
            transport.executed().last().unwrap(),
            "SELECT x FROM t WHERE x>1"
        );
    }

    #[tokio::test]
    async fn claimed_rows_go_to_exactly_one_session() {
        let dir = tempfile::tempdir().unwrap();
        // Two sessions race on the same row: the first conditional update
        // matches it, the second finds it already claimed and returns an
        // empty row set.
        let transport = MockTransport::new()
            .respond(
                "UPDATE t SET _prov_insertedby = ",
                QueryOutcome::with_rows(
                    vec!["id".into(), "_prov_rowid".into()],
                    vec![vec!["1".into(), "aaa".into()]],
                ),
            )
            .respond(
                "UPDATE t SET _prov_insertedby = ",
                QueryOutcome::with_rows(vec!["id".into(), "_prov_rowid".into()], vec![]),
            );

        let mut first = Session::new(capture_settings(dir.path(), 5)).unwrap();
        let mut second = Session::new(capture_settings(dir.path(), 6)).unwrap();

        let sql = "SELECT x FROM t WHERE x>1";
        assert!(first.dispatch(&transport, sql).await.unwrap().is_ok());
        assert!(second.dispatch(&transport, sql).await.unwrap().is_ok());

        assert!(log_contents(&first).contains("prv_store_row\taaa\tt\t"));
        assert!(!log_contents(&second).contains("prv_store_row"));
    }

    #[tokio::test]
    async fn raw_reads_are_only_captured_in_raw_mode() {
        let dir = tempfile::tempdir().unwrap();
        let capture = Session::new(capture_settings(dir.path(), 3)).unwrap();
        assert_eq!(capture.record_raw_read(b"Q").unwrap(), None);

        let raw = Session::new(Settings {
            mode: Mode::CaptureRaw,
            ..capture_settings(dir.path(), 4)
        })
        .unwrap();
        assert_eq!(raw.record_raw_read(b"Q").unwrap(), Some(0));
        assert_eq!(raw.record_raw_read(b"X").unwrap(), Some(1));
    }
}
