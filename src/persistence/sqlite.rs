use super::{PersistenceError, PersistenceResult, PlanStore};
use crate::metadata::PlanMetadata;
use crate::plan::Plan;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const ENTITY_TABLES: [&str; 4] = ["days", "calendars", "tasks", "resources"];

/// Keeps one plan in a SQLite file. Metadata sits in a single row; every
/// day, calendar, task and resource is a JSON row keyed by its position.
pub struct SqlitePlanStore {
    connection: Mutex<Connection>,
}

impl SqlitePlanStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let mut ddl = String::from(
            r#"
            CREATE TABLE IF NOT EXISTS plan_metadata (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                metadata_json TEXT NOT NULL
            );
            "#,
        );
        for table in ENTITY_TABLES {
            ddl.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY, item_json TEXT NOT NULL);\n"
            ));
        }
        connection.execute_batch(&ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::InvalidData("sqlite connection lock poisoned".to_string()))
    }

    /// Metadata of the stored plan without loading its rows.
    pub fn load_metadata(&self) -> PersistenceResult<Option<PlanMetadata>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row("SELECT metadata_json FROM plan_metadata WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        json.map(|json| serde_json::from_str(&json).map_err(PersistenceError::from))
            .transpose()
    }

    fn save_metadata(tx: &Transaction, metadata: &PlanMetadata) -> PersistenceResult<()> {
        let json = serde_json::to_string(metadata)?;
        tx.execute("DELETE FROM plan_metadata", [])?;
        tx.execute(
            "INSERT INTO plan_metadata (id, metadata_json) VALUES (1, ?1)",
            params![json],
        )?;
        Ok(())
    }

    fn save_rows<T: Serialize>(tx: &Transaction, table: &str, items: &[T]) -> PersistenceResult<()> {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        let mut stmt = tx.prepare(&format!("INSERT INTO {table} (id, item_json) VALUES (?1, ?2)"))?;
        for (id, item) in items.iter().enumerate() {
            let json = serde_json::to_string(item)?;
            let id = i64::try_from(id)
                .map_err(|_| PersistenceError::InvalidData(format!("{table} row {id} out of range")))?;
            stmt.execute(params![id, json])?;
        }
        Ok(())
    }

    /// Rows must be numbered 0, 1, 2... with no gaps; positions are the
    /// cross references between entities.
    fn load_rows<T: DeserializeOwned>(conn: &Connection, table: &str) -> PersistenceResult<Vec<T>> {
        let mut stmt = conn.prepare(&format!("SELECT id, item_json FROM {table} ORDER BY id ASC"))?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let mut items = Vec::new();
        for row in rows {
            let (id, json) = row?;
            if usize::try_from(id).ok() != Some(items.len()) {
                return Err(PersistenceError::InvalidData(format!(
                    "{table} row {id} found where row {} was expected",
                    items.len()
                )));
            }
            items.push(serde_json::from_str(&json)?);
        }
        Ok(items)
    }
}

impl PlanStore for SqlitePlanStore {
    fn save_plan(&self, plan: &Plan) -> PersistenceResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::save_metadata(&tx, plan.metadata())?;
        Self::save_rows(&tx, "days", plan.days())?;
        Self::save_rows(&tx, "calendars", plan.calendars())?;
        Self::save_rows(&tx, "tasks", plan.tasks())?;
        Self::save_rows(&tx, "resources", plan.resources())?;
        tx.commit()?;
        debug!(tasks = plan.task_count(), resources = plan.resource_count(), "stored plan");
        Ok(())
    }

    fn load_plan(&self) -> PersistenceResult<Option<Plan>> {
        let Some(metadata) = self.load_metadata()? else {
            return Ok(None);
        };

        let conn = self.lock()?;
        let days = Self::load_rows(&conn, "days")?;
        let calendars = Self::load_rows(&conn, "calendars")?;
        let tasks = Self::load_rows(&conn, "tasks")?;
        let resources = Self::load_rows(&conn, "resources")?;
        drop(conn);

        Ok(Some(Plan::from_parts(metadata, days, calendars, tasks, resources)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn empty_store_loads_nothing() {
        let store = SqlitePlanStore::in_memory().expect("store");
        assert!(store.load_plan().expect("load").is_none());
        assert!(store.load_metadata().expect("metadata").is_none());
    }

    #[test]
    fn saving_twice_keeps_the_latest_plan() {
        let store = SqlitePlanStore::in_memory().expect("store");
        let mut plan = Plan::new();
        plan.push_task(Task::new("First")).expect("push");
        plan.push_task(Task::new("Dropped")).expect("push");
        plan.push_task(Task::new("Also dropped")).expect("push");
        store.save_plan(&plan).expect("save");

        plan.set_title("Second revision");
        plan.remove_task(2).expect("remove");
        plan.remove_task(1).expect("remove");
        plan.push_task(Task::new("Second")).expect("push");
        store.save_plan(&plan).expect("save");

        let loaded = store.load_plan().expect("load").expect("stored");
        assert_eq!(loaded, plan);
        let metadata = store.load_metadata().expect("metadata").expect("stored");
        assert_eq!(metadata.title, "Second revision");
    }

    #[test]
    fn gaps_in_row_ids_are_rejected() {
        let store = SqlitePlanStore::in_memory().expect("store");
        let mut plan = Plan::new();
        plan.push_task(Task::new("Only")).expect("push");
        store.save_plan(&plan).expect("save");
        store
            .lock()
            .expect("lock")
            .execute("UPDATE tasks SET id = 5 WHERE id = 0", [])
            .expect("renumber");

        match store.load_plan() {
            Err(PersistenceError::InvalidData(message)) => assert!(message.contains("tasks row 5")),
            other => panic!("expected invalid data, got {other:?}"),
        }
    }
}
