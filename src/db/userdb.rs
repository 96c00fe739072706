use async_trait::async_trait;
use sqlx::Error;
use uuid::Uuid;

use crate::{
    db::db::DBClient,
    models::usermodel::{AdminAuditEntry, Profile, UserRole},
};

#[async_trait]
pub trait UserExt {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, Error>;

    /// Inserts the profile unless one exists. Returns the stored row and
    /// whether this call created it.
    async fn ensure_profile(
        &self,
        user_id: Uuid,
        email: &str,
        full_name: Option<String>,
        phone: Option<String>,
        role: UserRole,
    ) -> Result<(Profile, bool), Error>;

    async fn list_profiles(
        &self,
        page: u32,
        limit: u32,
        role: Option<UserRole>,
    ) -> Result<Vec<Profile>, Error>;

    async fn count_profiles(&self, role: Option<UserRole>) -> Result<i64, Error>;

    async fn count_profiles_by_role(&self) -> Result<Vec<(UserRole, i64)>, Error>;

    async fn update_profile_role(&self, user_id: Uuid, role: UserRole) -> Result<Option<Profile>, Error>;

    async fn delete_profile(&self, user_id: Uuid) -> Result<bool, Error>;

    async fn insert_audit_log(
        &self,
        admin_id: Uuid,
        action: &str,
        target_user_id: Option<Uuid>,
        details: Option<serde_json::Value>,
    ) -> Result<(), Error>;

    async fn list_audit_log(&self, page: u32, limit: u32) -> Result<Vec<AdminAuditEntry>, Error>;

    async fn count_audit_log(&self) -> Result<i64, Error>;
}

#[async_trait]
impl UserExt for DBClient {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, phone, role, created_at, updated_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn ensure_profile(
        &self,
        user_id: Uuid,
        email: &str,
        full_name: Option<String>,
        phone: Option<String>,
        role: UserRole,
    ) -> Result<(Profile, bool), Error> {
        let inserted = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, full_name, phone, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            RETURNING id, email, full_name, phone, role, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(full_name)
        .bind(phone)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(profile) = inserted {
            return Ok((profile, true));
        }

        let existing = self.get_profile(user_id).await?.ok_or(Error::RowNotFound)?;
        Ok((existing, false))
    }

    async fn list_profiles(
        &self,
        page: u32,
        limit: u32,
        role: Option<UserRole>,
    ) -> Result<Vec<Profile>, Error> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, phone, role, created_at, updated_at
            FROM profiles
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(role)
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_profiles(&self, role: Option<UserRole>) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM profiles
            WHERE ($1::user_role IS NULL OR role = $1)
            "#,
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await
    }

    async fn count_profiles_by_role(&self) -> Result<Vec<(UserRole, i64)>, Error> {
        sqlx::query_as::<_, (UserRole, i64)>(
            r#"
            SELECT role, COUNT(*) FROM profiles
            GROUP BY role
            ORDER BY role
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn update_profile_role(&self, user_id: Uuid, role: UserRole) -> Result<Option<Profile>, Error> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, full_name, phone, role, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_audit_log(
        &self,
        admin_id: Uuid,
        action: &str,
        target_user_id: Option<Uuid>,
        details: Option<serde_json::Value>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO admin_audit_log (admin_id, action, target_user_id, details)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(admin_id)
        .bind(action)
        .bind(target_user_id)
        .bind(details)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_audit_log(&self, page: u32, limit: u32) -> Result<Vec<AdminAuditEntry>, Error> {
        let offset = (page.saturating_sub(1) as i64) * limit as i64;

        sqlx::query_as::<_, AdminAuditEntry>(
            r#"
            SELECT id, admin_id, action, target_user_id, details, created_at
            FROM admin_audit_log
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_audit_log(&self) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admin_audit_log")
            .fetch_one(&self.pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    use crate::db::testing::profile;

    #[sqlx::test(migrations = "./migrations")]
    async fn audit_log_pages_newest_first(pool: PgPool) {
        let db = DBClient::new(pool);
        let admin = profile(&db, UserRole::Admin).await;

        for action in ["user_created", "role_changed", "user_deleted"] {
            db.insert_audit_log(admin, action, None, None).await.unwrap();
        }

        assert_eq!(db.count_audit_log().await.unwrap(), 3);

        let first = db.list_audit_log(1, 2).await.unwrap();
        let second = db.list_audit_log(2, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert!(first[1].created_at >= second[0].created_at);
    }
}
