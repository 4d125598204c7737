use bson::doc;
use chrono::Utc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::resp::problem::Problem;

use super::{InvitationCode, INVITE_COLLECTION_NAME};

pub trait InviteDbExt {
    async fn insert_invitation(&self, invitation: &InvitationCode) -> Result<(), Problem>;

    /// Active invitation with the given code, used or not.
    async fn find_active_invitation(
        &self,
        code: impl AsRef<str>,
    ) -> Result<Option<InvitationCode>, Problem>;

    /// Marks the code as consumed by `user`. The filter requires `used_by`
    /// to still be unset, so the unused-to-used transition can happen at
    /// most once; returns whether this call won it.
    async fn consume_invitation(&self, code: impl AsRef<str>, user: Uuid)
        -> Result<bool, Problem>;

    /// Every invitation code, newest first.
    async fn list_invitations(&self) -> Result<Vec<InvitationCode>, Problem>;

    async fn delete_invitation(&self, code: impl AsRef<str>) -> Result<bool, Problem>;
    async fn deactivate_invitation(&self, code: impl AsRef<str>) -> Result<bool, Problem>;
}

impl InviteDbExt for Database {
    async fn insert_invitation(&self, invitation: &InvitationCode) -> Result<(), Problem> {
        self.collection::<InvitationCode>(INVITE_COLLECTION_NAME)
            .insert_one(invitation, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn find_active_invitation(
        &self,
        code: impl AsRef<str>,
    ) -> Result<Option<InvitationCode>, Problem> {
        self.collection(INVITE_COLLECTION_NAME)
            .find_one(doc! { "code": code.as_ref(), "is_active": true }, None)
            .await
            .map_err(Problem::from)
    }

    async fn consume_invitation(
        &self,
        code: impl AsRef<str>,
        user: Uuid,
    ) -> Result<bool, Problem> {
        let result = self
            .collection::<InvitationCode>(INVITE_COLLECTION_NAME)
            .update_one(
                doc! { "code": code.as_ref(), "used_by": null },
                doc! { "$set": {
                    "used_by": user.to_string(),
                    "used_at": Utc::now().to_rfc3339(),
                }},
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.modified_count > 0)
    }

    async fn list_invitations(&self) -> Result<Vec<InvitationCode>, Problem> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        self.collection(INVITE_COLLECTION_NAME)
            .find(None, options)
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn delete_invitation(&self, code: impl AsRef<str>) -> Result<bool, Problem> {
        let result = self
            .collection::<InvitationCode>(INVITE_COLLECTION_NAME)
            .delete_one(doc! { "code": code.as_ref() }, None)
            .await
            .map_err(Problem::from)?;

        Ok(result.deleted_count > 0)
    }

    async fn deactivate_invitation(&self, code: impl AsRef<str>) -> Result<bool, Problem> {
        let result = self
            .collection::<InvitationCode>(INVITE_COLLECTION_NAME)
            .update_one(
                doc! { "code": code.as_ref() },
                doc! { "$set": { "is_active": false } },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }
}
