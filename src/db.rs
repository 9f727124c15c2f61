//! SQLite storage for collected listings.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::models::Listing;

const DATE_FORMAT: &str = "%Y-%m-%d";

const LISTING_COLUMNS: &str = "id, property_type, price, price_condominium, iptu, area_m2, rooms,
     bathrooms, vacancies, region, neighborhood, collection_date";

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("date parse error: {0}")]
    Date(#[from] chrono::ParseError),
}

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<(), DbError> {
        let schema = include_str!("../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Insert or refresh a batch of listings in one transaction.
    ///
    /// On an existing id every column is overwritten except `id`,
    /// `collection_date` and `collection_time`, and `updated_at` is stamped.
    /// Any failure rolls back the whole batch.
    pub fn upsert_listings(&mut self, listings: &[Listing]) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO properties (
                   id, property_type, price, price_condominium, iptu, area_m2,
                   rooms, bathrooms, vacancies, region, neighborhood, collection_date
                 )
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(id) DO UPDATE SET
                   property_type = excluded.property_type,
                   price = excluded.price,
                   price_condominium = excluded.price_condominium,
                   iptu = excluded.iptu,
                   area_m2 = excluded.area_m2,
                   rooms = excluded.rooms,
                   bathrooms = excluded.bathrooms,
                   vacancies = excluded.vacancies,
                   region = excluded.region,
                   neighborhood = excluded.neighborhood,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            )?;

            for listing in listings {
                stmt.execute(params![
                    listing.id,
                    listing.property_type,
                    listing.price,
                    listing.price_condominium,
                    listing.iptu,
                    listing.area_m2,
                    listing.rooms,
                    listing.bathrooms,
                    listing.vacancies,
                    listing.region,
                    listing.neighborhood,
                    listing.collection_date.format(DATE_FORMAT).to_string(),
                ])?;
            }
        }
        tx.commit()?;

        info!("{} listings saved to the database", listings.len());
        Ok(listings.len())
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<Listing>, DbError> {
        let sql = format!("SELECT {} FROM properties WHERE id = ?1", LISTING_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![id], StoredRow::from_row)
            .optional()?;
        raw.map(StoredRow::into_listing).transpose()
    }

    /// Every stored listing, ordered by id
    pub fn all_listings(&self) -> Result<Vec<Listing>, DbError> {
        let sql = format!("SELECT {} FROM properties ORDER BY id", LISTING_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], StoredRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Loaded {} stored listings", rows.len());
        rows.into_iter().map(StoredRow::into_listing).collect()
    }
}

/// A `properties` row before its date column is parsed
struct StoredRow {
    listing: Listing,
    collection_date: String,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            listing: Listing {
                id: row.get(0)?,
                property_type: row.get(1)?,
                price: row.get(2)?,
                price_condominium: row.get(3)?,
                iptu: row.get(4)?,
                area_m2: row.get(5)?,
                rooms: row.get(6)?,
                bathrooms: row.get(7)?,
                vacancies: row.get(8)?,
                region: row.get(9)?,
                neighborhood: row.get(10)?,
                collection_date: NaiveDate::MIN,
            },
            collection_date: row.get(11)?,
        })
    }

    fn into_listing(self) -> Result<Listing, DbError> {
        let mut listing = self.listing;
        listing.collection_date = NaiveDate::parse_from_str(&self.collection_date, DATE_FORMAT)?;
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_db() -> Db {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.init().expect("init schema");
        db
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn listing(id: &str, price: f64, day: u32) -> Listing {
        Listing {
            id: id.to_string(),
            property_type: "apartamento".to_string(),
            price: Some(price),
            price_condominium: Some(800.0),
            iptu: None,
            area_m2: 70,
            rooms: 2,
            bathrooms: 1,
            vacancies: 1,
            region: Some("São Paulo".to_string()),
            neighborhood: Some("Pinheiros".to_string()),
            collection_date: date(day),
        }
    }

    fn updated_at(db: &Db, id: &str) -> Option<String> {
        db.conn
            .query_row(
                "SELECT updated_at FROM properties WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .expect("query updated_at")
    }

    #[test]
    fn test_init_idempotent() {
        let db = open_test_db();
        db.init().expect("second init");
    }

    #[test]
    fn test_insert_then_read_back() {
        let mut db = open_test_db();
        let saved = db.upsert_listings(&[listing("1", 500_000.0, 1)]).unwrap();
        assert_eq!(saved, 1);

        let stored = db.get_listing("1").unwrap().expect("row exists");
        assert_eq!(stored, listing("1", 500_000.0, 1));
        assert_eq!(updated_at(&db, "1"), None);
        assert!(db.get_listing("2").unwrap().is_none());
    }

    #[test]
    fn test_upsert_refreshes_attributes_but_keeps_collection_date() {
        let mut db = open_test_db();
        db.upsert_listings(&[listing("1", 500_000.0, 1)]).unwrap();

        let mut changed = listing("1", 450_000.0, 20);
        changed.rooms = 3;
        changed.neighborhood = None;
        db.upsert_listings(&[changed]).unwrap();

        let all = db.all_listings().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].price, Some(450_000.0));
        assert_eq!(all[0].rooms, 3);
        assert_eq!(all[0].neighborhood, None);
        assert_eq!(all[0].collection_date, date(1));
        assert!(updated_at(&db, "1").is_some());
    }

    #[test]
    fn test_collection_time_is_server_assigned_and_kept() {
        let mut db = open_test_db();
        db.upsert_listings(&[listing("1", 1.0, 1)]).unwrap();
        let before: String = db
            .conn
            .query_row("SELECT collection_time FROM properties WHERE id = '1'", [], |r| {
                r.get(0)
            })
            .unwrap();
        db.upsert_listings(&[listing("1", 2.0, 2)]).unwrap();
        let after: String = db
            .conn
            .query_row("SELECT collection_time FROM properties WHERE id = '1'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_failed_batch_rolls_back_entirely() {
        let mut db = open_test_db();
        db.upsert_listings(&[listing("1", 500_000.0, 1)]).unwrap();

        let mut broken = listing("3", 1.0, 1);
        broken.area_m2 = -5;
        let result = db.upsert_listings(&[listing("1", 1.0, 2), listing("2", 2.0, 2), broken]);
        assert!(matches!(result, Err(DbError::Sqlite(_))));

        let all = db.all_listings().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].price, Some(500_000.0));
    }

    #[test]
    fn test_all_listings_ordered_by_id() {
        let mut db = open_test_db();
        db.upsert_listings(&[listing("b", 1.0, 1), listing("a", 2.0, 1)])
            .unwrap();
        let ids: Vec<_> = db.all_listings().unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
