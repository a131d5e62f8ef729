//! [`SqliteStore`]: the SQLite implementation of [`SurveyStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use survey_core::{
  code::{StudyCode, TransportCode},
  dimension::{Dimensions, LinkQuery},
  link::{Link, LinkId, LinkTarget, NormalizedLinkKey},
  plan::{Association, Plan, PlanId},
  store::{InsertOutcome, SurveyStore, SurveyTx},
};

use crate::{
  Error, Result,
  encode::{
    RawAssociation, RawLink, RawPlan, decode_study, decode_transport, encode_direction, encode_dt,
    encode_link_key,
  },
  schema::SCHEMA,
};

/// How long a writer waits for another connection's transaction to finish.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A survey store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
  }

  /// Like [`SqliteStore::open`], waiting up to `busy_timeout` for other
  /// connections to release the write lock.
  pub async fn open_with_timeout(
    path: impl AsRef<Path>,
    busy_timeout: Duration,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init(busy_timeout).await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init(DEFAULT_BUSY_TIMEOUT).await?;
    Ok(store)
  }

  async fn init(&self, busy_timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Statement executor over an open transaction.
struct SqliteTx<'c> {
  conn: &'c rusqlite::Connection,
}

const FIND_LINK: &str = "
  SELECT link_id FROM links
  WHERE origin_road = ?1 AND category = ?2 AND direction = ?3
    AND (destination_road = ?4 OR (destination_road IS NULL AND milepost = ?5))
  ORDER BY link_id DESC
  LIMIT 1";

fn outcome(rows: usize) -> InsertOutcome {
  if rows == 0 {
    InsertOutcome::Conflict
  } else {
    InsertOutcome::Inserted
  }
}

impl SurveyTx for SqliteTx<'_> {
  type Error = Error;

  fn insert_study_if_absent(&mut self, code: &StudyCode) -> Result<bool> {
    let rows = self.conn.execute(
      "INSERT INTO studies (code) VALUES (?1) ON CONFLICT (code) DO NOTHING",
      rusqlite::params![code.as_str()],
    )?;
    Ok(rows > 0)
  }

  fn insert_transport_if_absent(&mut self, code: &TransportCode) -> Result<bool> {
    let rows = self.conn.execute(
      "INSERT INTO transports (code) VALUES (?1) ON CONFLICT (code) DO NOTHING",
      rusqlite::params![code.as_str()],
    )?;
    Ok(rows > 0)
  }

  fn find_link(&mut self, key: &NormalizedLinkKey) -> Result<Option<LinkId>> {
    let k = encode_link_key(key);
    let id: Option<i64> = self
      .conn
      .query_row(
        FIND_LINK,
        rusqlite::params![k.origin_road, k.category, k.direction, k.destination, k.milepost],
        |r| r.get(0),
      )
      .optional()?;
    Ok(id.map(LinkId))
  }

  fn insert_link(
    &mut self,
    key: &NormalizedLinkKey,
    coordinates: Option<&str>,
  ) -> Result<InsertOutcome> {
    let k = encode_link_key(key);
    let rows = self.conn.execute(
      "INSERT INTO links (
         category, direction, origin_road, destination_road, milepost, coordinates
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT DO NOTHING",
      rusqlite::params![
        k.category,
        k.direction,
        k.origin_road,
        k.destination,
        k.milepost,
        coordinates,
      ],
    )?;
    Ok(outcome(rows))
  }

  fn set_dimensions(&mut self, link_id: LinkId, dimensions: &Dimensions) -> Result<usize> {
    Ok(self.conn.execute(
      "UPDATE links SET length = ?1, width = ?2, measured_at = ?3 WHERE link_id = ?4",
      rusqlite::params![
        dimensions.length.as_str(),
        dimensions.width.as_str(),
        encode_dt(dimensions.measured_at),
        link_id.0,
      ],
    )?)
  }

  fn find_plan(&mut self, transport: &TransportCode, link_id: LinkId) -> Result<Option<PlanId>> {
    let id: Option<i64> = self
      .conn
      .query_row(
        "SELECT plan_id FROM plans WHERE transport_code = ?1 AND link_id = ?2",
        rusqlite::params![transport.as_str(), link_id.0],
        |r| r.get(0),
      )
      .optional()?;
    Ok(id.map(PlanId))
  }

  fn insert_plan(
    &mut self,
    transport: &TransportCode,
    link_id: LinkId,
    coordinates: &str,
  ) -> Result<InsertOutcome> {
    let rows = self.conn.execute(
      "INSERT INTO plans (transport_code, link_id, coordinates) VALUES (?1, ?2, ?3)
       ON CONFLICT (transport_code, link_id) DO NOTHING",
      rusqlite::params![transport.as_str(), link_id.0, coordinates],
    )?;
    Ok(outcome(rows))
  }

  fn study_for_plan(&mut self, plan_id: PlanId) -> Result<Option<StudyCode>> {
    let code: Option<String> = self
      .conn
      .query_row(
        "SELECT study_code FROM plan_studies WHERE plan_id = ?1",
        rusqlite::params![plan_id.0],
        |r| r.get(0),
      )
      .optional()?;
    code.as_deref().map(decode_study).transpose()
  }

  fn insert_association(
    &mut self,
    plan_id: PlanId,
    study: &StudyCode,
    at: DateTime<Utc>,
  ) -> Result<()> {
    self.conn.execute(
      "INSERT INTO plan_studies (plan_id, study_code, associated_at) VALUES (?1, ?2, ?3)",
      rusqlite::params![plan_id.0, study.as_str(), encode_dt(at)],
    )?;
    Ok(())
  }

  fn delete_association(&mut self, plan_id: PlanId) -> Result<usize> {
    Ok(self.conn.execute(
      "DELETE FROM plan_studies WHERE plan_id = ?1",
      rusqlite::params![plan_id.0],
    )?)
  }
}

// ─── SurveyStore impl ────────────────────────────────────────────────────────

impl SurveyStore for SqliteStore {
  type Error = Error;

  async fn transact<T, E, F>(&self, work: F) -> Result<T, E>
  where
    T: Send + 'static,
    E: From<Error> + Send + 'static,
    F: FnOnce(&mut dyn SurveyTx<Error = Error>) -> Result<T, E> + Send + 'static,
  {
    // IMMEDIATE takes the write lock up front, so two submissions never
    // interleave their find and insert steps.
    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = {
          let mut handle = SqliteTx { conn: &tx };
          work(&mut handle)
        };
        match outcome {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => {
            tx.rollback()?;
            Ok(Err(e))
          }
        }
      })
      .await;

    match result {
      Ok(inner) => inner,
      Err(e) => {
        tracing::warn!(error = %e, "survey transaction aborted");
        Err(E::from(Error::Database(e)))
      }
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_link(&self, id: LinkId) -> Result<Option<Link>> {
    let raw: Option<RawLink> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM links WHERE link_id = ?1", RawLink::COLUMNS),
              rusqlite::params![id.0],
              RawLink::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLink::into_link).transpose()
  }

  async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>> {
    let raw: Option<RawPlan> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM plans p WHERE p.plan_id = ?1", RawPlan::COLUMNS),
              rusqlite::params![id.0],
              RawPlan::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPlan::into_plan).transpose()
  }

  async fn association_for_plan(&self, id: PlanId) -> Result<Option<Association>> {
    let raw: Option<RawAssociation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT plan_id, study_code, associated_at FROM plan_studies WHERE plan_id = ?1",
              rusqlite::params![id.0],
              |row| {
                Ok(RawAssociation {
                  plan_id:       row.get(0)?,
                  study_code:    row.get(1)?,
                  associated_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAssociation::into_association).transpose()
  }

  async fn plans_for_study(&self, study: StudyCode) -> Result<Vec<Plan>> {
    let raws: Vec<RawPlan> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}
           FROM plans p
           JOIN plan_studies s ON s.plan_id = p.plan_id
           WHERE s.study_code = ?1
           ORDER BY p.plan_id",
          RawPlan::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![study.as_str()], RawPlan::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPlan::into_plan).collect()
  }

  async fn search_links(&self, query: LinkQuery) -> Result<Vec<Link>> {
    let mut sql = format!("SELECT {} FROM links WHERE 1 = 1", RawLink::COLUMNS);
    let mut params: Vec<String> = Vec::new();
    let mut filter = |column: &str, value: String| {
      params.push(value);
      sql.push_str(&format!(" AND {column} = ?{}", params.len()));
    };

    if let Some(origin) = &query.origin {
      filter("origin_road", origin.as_str().to_owned());
    }
    if let Some(direction) = query.direction {
      filter("direction", encode_direction(direction));
    }
    if let Some(code) = query.category_code {
      filter("category", code);
    }
    match query.target {
      Some(LinkTarget::Destination(road)) => filter("destination_road", road.as_str().to_owned()),
      Some(LinkTarget::Milepost(m)) => filter("milepost", m.as_str().to_owned()),
      None => {}
    }
    sql.push_str(" ORDER BY link_id");

    let raws: Vec<RawLink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawLink::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLink::into_link).collect()
  }

  async fn list_studies(&self) -> Result<Vec<StudyCode>> {
    let codes = self.list_codes("SELECT code FROM studies ORDER BY code").await?;
    codes.iter().map(|c| decode_study(c)).collect()
  }

  async fn list_transports(&self) -> Result<Vec<TransportCode>> {
    let codes = self.list_codes("SELECT code FROM transports ORDER BY code").await?;
    codes.iter().map(|c| decode_transport(c)).collect()
  }
}

impl SqliteStore {
  async fn list_codes(&self, sql: &'static str) -> Result<Vec<String>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(sql)?;
          let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  /// Number of rows in `table`. Test-only inspection helper.
  #[cfg(test)]
  pub(crate) async fn row_count(&self, table: &'static str) -> Result<i64> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        })
        .await?,
    )
  }
}
