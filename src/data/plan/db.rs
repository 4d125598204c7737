use bson::doc;
use chrono::Utc;
use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::user::filter;
use crate::resp::problem::Problem;

use super::{LessonPlan, ReviewStatus, PLAN_COLLECTION_NAME};

pub trait PlanDbExt {
    async fn insert_plan(&self, plan: &LessonPlan) -> Result<(), Problem>;

    /// All plans owned by the user, newest first.
    async fn plans_for_user(&self, user: Uuid) -> Result<Vec<LessonPlan>, Problem>;

    /// The plan, but only when it belongs to `user`.
    async fn get_plan(&self, id: Uuid, user: Uuid) -> Result<Option<LessonPlan>, Problem>;

    async fn delete_plan(&self, id: Uuid, user: Uuid) -> Result<bool, Problem>;

    /// Moves the owner's plan into the pending queue and clears any earlier
    /// review verdict.
    async fn submit_plan(&self, id: Uuid, user: Uuid) -> Result<bool, Problem>;

    /// Records an admin verdict on a pending plan.
    async fn review_plan(
        &self,
        id: Uuid,
        status: ReviewStatus,
        feedback: Option<String>,
        reviewer: Uuid,
    ) -> Result<bool, Problem>;

    /// Pending plans, optionally restricted to the given owners.
    async fn pending_plans(&self, owners: Option<&[Uuid]>) -> Result<Vec<LessonPlan>, Problem>;

    /// Every plan regardless of status, optionally restricted to owners.
    async fn all_plans(&self, owners: Option<&[Uuid]>) -> Result<Vec<LessonPlan>, Problem>;

    async fn count_plans(&self) -> Result<u64, Problem>;
    async fn count_plans_for_user(&self, user: Uuid) -> Result<u64, Problem>;
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1 }).build()
}

impl PlanDbExt for Database {
    async fn insert_plan(&self, plan: &LessonPlan) -> Result<(), Problem> {
        self.collection::<LessonPlan>(PLAN_COLLECTION_NAME)
            .insert_one(plan, None)
            .await
            .map_err(Problem::from)?;
        Ok(())
    }

    async fn plans_for_user(&self, user: Uuid) -> Result<Vec<LessonPlan>, Problem> {
        self.collection(PLAN_COLLECTION_NAME)
            .find(doc! { "user_id": user.to_string() }, newest_first())
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn get_plan(&self, id: Uuid, user: Uuid) -> Result<Option<LessonPlan>, Problem> {
        self.collection(PLAN_COLLECTION_NAME)
            .find_one(
                doc! { "id": id.to_string(), "user_id": user.to_string() },
                None,
            )
            .await
            .map_err(Problem::from)
    }

    async fn delete_plan(&self, id: Uuid, user: Uuid) -> Result<bool, Problem> {
        let result = self
            .collection::<LessonPlan>(PLAN_COLLECTION_NAME)
            .delete_one(
                doc! { "id": id.to_string(), "user_id": user.to_string() },
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.deleted_count > 0)
    }

    async fn submit_plan(&self, id: Uuid, user: Uuid) -> Result<bool, Problem> {
        let result = self
            .collection::<LessonPlan>(PLAN_COLLECTION_NAME)
            .update_one(
                doc! { "id": id.to_string(), "user_id": user.to_string() },
                doc! { "$set": {
                    "submission_status": ReviewStatus::Pending.to_string(),
                    "submitted_at": Utc::now().to_rfc3339(),
                    "reviewed_at": null,
                    "admin_feedback": null,
                    "reviewed_by": null,
                }},
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn review_plan(
        &self,
        id: Uuid,
        status: ReviewStatus,
        feedback: Option<String>,
        reviewer: Uuid,
    ) -> Result<bool, Problem> {
        let result = self
            .collection::<LessonPlan>(PLAN_COLLECTION_NAME)
            .update_one(
                filter::by_id(id),
                doc! { "$set": {
                    "submission_status": status.to_string(),
                    "reviewed_at": Utc::now().to_rfc3339(),
                    "admin_feedback": feedback,
                    "reviewed_by": reviewer.to_string(),
                }},
                None,
            )
            .await
            .map_err(Problem::from)?;

        Ok(result.matched_count > 0)
    }

    async fn pending_plans(&self, owners: Option<&[Uuid]>) -> Result<Vec<LessonPlan>, Problem> {
        let mut filter = doc! { "submission_status": ReviewStatus::Pending.to_string() };
        if let Some(owners) = owners {
            let ids: Vec<String> = owners.iter().map(Uuid::to_string).collect();
            filter.insert("user_id", doc! { "$in": ids });
        }

        self.collection(PLAN_COLLECTION_NAME)
            .find(filter, newest_first())
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn all_plans(&self, owners: Option<&[Uuid]>) -> Result<Vec<LessonPlan>, Problem> {
        let filter = owners.map(|owners| {
            let ids: Vec<String> = owners.iter().map(Uuid::to_string).collect();
            doc! { "user_id": { "$in": ids } }
        });

        self.collection(PLAN_COLLECTION_NAME)
            .find(filter, newest_first())
            .await
            .map_err(Problem::from)?
            .try_collect()
            .await
            .map_err(Problem::from)
    }

    async fn count_plans(&self) -> Result<u64, Problem> {
        self.collection::<LessonPlan>(PLAN_COLLECTION_NAME)
            .count_documents(None, None)
            .await
            .map_err(Problem::from)
    }

    async fn count_plans_for_user(&self, user: Uuid) -> Result<u64, Problem> {
        self.collection::<LessonPlan>(PLAN_COLLECTION_NAME)
            .count_documents(doc! { "user_id": user.to_string() }, None)
            .await
            .map_err(Problem::from)
    }
}
