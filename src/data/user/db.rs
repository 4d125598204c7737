use bson::doc;
use chrono::Utc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::resp::problem::Problem;

use super::{filter, PasswordHash, User, USER_COLLECTION_NAME};

pub trait UserDbExt {
    async fn insert_user(&self, user: &User) -> Result<(), Problem>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem>;
    async fn find_user_by_email(&self, email: impl AsRef<str>) -> Result<Option<User>, Problem>;

    /// All teacher accounts, newest first.
    async fn list_teachers(&self) -> Result<Vec<User>, Problem>;
    async fn count_teachers(&self) -> Result<u64, Problem>;
    async fn count_active_teachers(&self) -> Result<u64, Problem>;

    async fn touch_last_login(&self, id: Uuid) -> Result<(), Problem>;
    async fn set_password(&self, id: Uuid, hash: &PasswordHash) -> Result<(), Problem>;

    /// Flips `is_active` and nothing else. `false` when no user matched.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, Problem>;

    async fn set_supervised_teachers(&self, id: Uuid, teachers: &[Uuid]) -> Result<(), Problem>;
}

impl UserDbExt for Database {
    async fn insert_user(&self, user: &User) -> Result<(), Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .insert_one(user, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await
            .map_err(Problem::from)
    }

    async fn find_user_by_email(&self, email: impl AsRef<str>) -> Result<Option<User>, Problem> {
        self.collection(USER_COLLECTION_NAME)
            .find_one(filter::by_email(email), None)
            .await
            .map_err(Problem::from)
    }

    async fn list_teachers(&self) -> Result<Vec<User>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        self.collection(USER_COLLECTION_NAME)
            .find(filter::teachers(), options)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn count_teachers(&self) -> Result<u64, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .count_documents(filter::teachers(), None)
            .await
            .map_err(Problem::from)
    }

    async fn count_active_teachers(&self) -> Result<u64, Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .count_documents(doc! { "role": "teacher", "is_active": true }, None)
            .await
            .map_err(Problem::from)
    }

    async fn touch_last_login(&self, id: Uuid) -> Result<(), Problem> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$set": { "last_login": Utc::now().to_rfc3339() } },
                None,
            )
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn set_password(&self, id: Uuid, hash: &PasswordHash) -> Result<(), Problem> {
        let hash = bson::to_bson(hash)?;
        self.collection::<User>(USER_COLLECTION_NAME)
            .update_one(filter::by_id(id), doc! { "$set": { "pw_hash": hash } }, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, Problem> {
        let result = self
            .collection::<User>(USER_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$set": { "is_active": active } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn set_supervised_teachers(&self, id: Uuid, teachers: &[Uuid]) -> Result<(), Problem> {
        let ids: Vec<String> = teachers.iter().map(Uuid::to_string).collect();
        self.collection::<User>(USER_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$set": { "supervised_teacher_ids": ids } },
                None,
            )
            .await
            .map_err(Problem::from)?;
        Ok(())
    }
}
