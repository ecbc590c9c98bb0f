use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{menu::DailyMenu, reservation::Reservation},
    services::mirror::RemoteMirror,
};

/// Document-style mirror in Postgres: `menus` and `reservations` tables, one
/// row per record, read back with an equality filter on `date`.
pub struct PgDocumentMirror {
    pool: PgPool,
}

impl PgDocumentMirror {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteMirror for PgDocumentMirror {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn upsert_menu(&self, menu: &DailyMenu) -> anyhow::Result<()> {
        // Replace by date: a row left under an older id for this date takes
        // over the local id.
        sqlx::query(
            r#"INSERT INTO menus (id, date, name, description, price, image_url)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (date) DO UPDATE SET
                   id = EXCLUDED.id,
                   name = EXCLUDED.name,
                   description = EXCLUDED.description,
                   price = EXCLUDED.price,
                   image_url = EXCLUDED.image_url,
                   updated_at = NOW()"#,
        )
        .bind(menu.id)
        .bind(menu.date)
        .bind(&menu.name)
        .bind(&menu.description)
        .bind(menu.price)
        .bind(&menu.image_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_menu(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn menus_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<DailyMenu>> {
        let menus = sqlx::query_as::<_, DailyMenu>(
            r#"SELECT id, date, name, description, price, image_url
               FROM menus
               WHERE date = $1"#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(menus)
    }

    async fn all_menus(&self) -> anyhow::Result<Vec<DailyMenu>> {
        let menus = sqlx::query_as::<_, DailyMenu>(
            r#"SELECT id, date, name, description, price, image_url
               FROM menus
               ORDER BY date"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(menus)
    }

    async fn upsert_reservation(&self, reservation: &Reservation) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO reservations (id, name, room_number, date, is_paid, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (id) DO UPDATE SET
                   is_paid = EXCLUDED.is_paid"#,
        )
        .bind(reservation.id)
        .bind(&reservation.name)
        .bind(&reservation.room_number)
        .bind(reservation.date)
        .bind(reservation.is_paid)
        .bind(reservation.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_payment(&self, reservation: &Reservation) -> anyhow::Result<()> {
        // Upsert so a reservation whose create never reached the mirror lands now.
        self.upsert_reservation(reservation).await
    }

    async fn delete_reservation(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reservation(&self, id: Uuid) -> anyhow::Result<Option<Reservation>> {
        let row = sqlx::query_as::<_, Reservation>(
            r#"SELECT id, name, room_number, date, is_paid, created_at
               FROM reservations
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn reservations(&self, date: Option<NaiveDate>) -> anyhow::Result<Vec<Reservation>> {
        let rows = match date {
            Some(date) => {
                sqlx::query_as::<_, Reservation>(
                    r#"SELECT id, name, room_number, date, is_paid, created_at
                       FROM reservations
                       WHERE date = $1
                       ORDER BY created_at DESC"#,
                )
                .bind(date)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Reservation>(
                    r#"SELECT id, name, room_number, date, is_paid, created_at
                       FROM reservations
                       ORDER BY created_at DESC"#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }
}
