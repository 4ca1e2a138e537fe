//! Accounts and the admin user directory

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use taskboard_auth::{check_password_strength, hash_password, verify_password, PasswordError};
use taskboard_db::entities::{project_member, user, user_project};
use taskboard_policy::{Caller, SystemRole};
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ServiceError, ServiceResult};
use crate::pagination::{Page, PageRequest};
use crate::validation::{normalize_email, password_strength, person_name};

/// Fields the user directory may be sorted by
pub const USER_SORT_FIELDS: &[&str] = &["createdAt", "updatedAt", "name", "email"];

pub const DEFAULT_USER_LIMIT: u64 = 20;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Registration or admin-created account
///
/// `role` is only honoured when an administrator creates the account.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(default)]
    #[validate(custom(function = "person_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "password_strength"))]
    pub password: String,
    pub role: Option<SystemRole>,
}

/// Profile or admin update; `role` is only honoured for administrators
///
/// A `password` field is not part of this shape and is dropped during decoding.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountChanges {
    #[validate(custom(function = "person_name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
    pub role: Option<SystemRole>,
}

/// A user with the IDs of the projects in their list
#[derive(Debug, Clone)]
pub struct UserDetails {
    pub user: user::Model,
    pub project_ids: Vec<Uuid>,
}

#[derive(Clone)]
pub struct UserDirectory {
    db: DatabaseConnection,
}

impl UserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Self-service signup; the account is always a `member`
    pub async fn register(&self, input: NewAccount) -> ServiceResult<user::Model> {
        self.create_account(input, SystemRole::Member).await
    }

    /// Create an administrator without a caller, used to bootstrap a fresh install
    pub async fn create_admin(&self, input: NewAccount) -> ServiceResult<user::Model> {
        self.create_account(input, SystemRole::Admin).await
    }

    /// Check an email and password pair
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<user::Model> {
        let email = normalize_email(email);
        let Some(account) = self.find_by_email(&email).await? else {
            debug!("Login attempt for unknown email");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_blocking(password, &account.password_hash).await? {
            warn!(user_id = %account.id, "Login failed: wrong password");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }

        info!(user_id = %account.id, "User logged in");
        Ok(account)
    }

    /// Look up the account behind a session
    pub async fn find(&self, id: Uuid) -> ServiceResult<Option<user::Model>> {
        Ok(user::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// The caller's own account
    pub async fn profile(&self, caller: &Caller) -> ServiceResult<UserDetails> {
        self.details(caller.id).await
    }

    /// Change the caller's name or email; role changes are ignored
    pub async fn update_profile(
        &self,
        caller: &Caller,
        changes: AccountChanges,
    ) -> ServiceResult<UserDetails> {
        let changes = AccountChanges {
            role: None,
            ..changes
        };
        self.apply_changes(caller.id, changes).await?;
        self.details(caller.id).await
    }

    /// Replace the caller's password after checking the current one
    pub async fn change_password(
        &self,
        caller: &Caller,
        current: &str,
        new_password: &str,
    ) -> ServiceResult<user::Model> {
        let account = user::Entity::find_by_id(caller.id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if !verify_blocking(current, &account.password_hash).await? {
            return Err(ServiceError::Unauthenticated(
                "Password is incorrect".to_string(),
            ));
        }

        if let Err(err) = check_password_strength(new_password) {
            return Err(ServiceError::invalid("newPassword", err.to_string()));
        }

        let password_hash = hash_blocking(new_password).await?;
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Utc::now());
        let account = active.update(&self.db).await?;

        info!(user_id = %caller.id, "Password changed");
        Ok(account)
    }

    pub async fn list(
        &self,
        caller: &Caller,
        request: &PageRequest,
    ) -> ServiceResult<Page<UserDetails>> {
        require_admin(caller)?;

        let order = if request.sort.descending {
            Order::Desc
        } else {
            Order::Asc
        };

        let paginator = user::Entity::find()
            .order_by(sort_column(&request.sort.field), order)
            .order_by_asc(user::Column::Id)
            .paginate(&self.db, request.limit);

        let index = request.index()?;
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(index).await?;

        let mut links = self
            .project_links(users.iter().map(|u| u.id).collect())
            .await?;
        let items = users
            .into_iter()
            .map(|account| UserDetails {
                project_ids: links.remove(&account.id).unwrap_or_default(),
                user: account,
            })
            .collect();

        Ok(Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
        })
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<UserDetails> {
        require_admin(caller)?;
        self.details(id).await
    }

    pub async fn create(&self, caller: &Caller, input: NewAccount) -> ServiceResult<user::Model> {
        require_admin(caller)?;
        let role = input.role.unwrap_or_default();
        self.create_account(input, role).await
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        changes: AccountChanges,
    ) -> ServiceResult<UserDetails> {
        require_admin(caller)?;
        self.apply_changes(id, changes).await?;
        self.details(id).await
    }

    /// Remove an account, its team memberships and its project links
    ///
    /// Projects the user owns are left in place.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<()> {
        require_admin(caller)?;

        if caller.id == id {
            return Err(ServiceError::Conflict("Cannot delete yourself".to_string()));
        }

        let txn = self.db.begin().await?;

        if user::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ServiceError::not_found("User"));
        }

        project_member::Entity::delete_many()
            .filter(project_member::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user_project::Entity::delete_many()
            .filter(user_project::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(user_id = %id, admin_id = %caller.id, "User deleted");
        Ok(())
    }

    async fn create_account(&self, input: NewAccount, role: SystemRole) -> ServiceResult<user::Model> {
        let input = NewAccount {
            email: normalize_email(&input.email),
            ..input
        };
        input.validate()?;

        if self.find_by_email(&input.email).await?.is_some() {
            return Err(email_taken());
        }

        let password_hash = hash_blocking(&input.password).await?;
        let now = Utc::now();
        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(input.email),
            password_hash: Set(password_hash),
            role: Set(role.into()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            if ServiceError::is_unique_violation(&err) {
                email_taken()
            } else {
                ServiceError::from(err)
            }
        })?;

        info!(user_id = %account.id, %role, "User account created");
        Ok(account)
    }

    async fn apply_changes(&self, id: Uuid, changes: AccountChanges) -> ServiceResult<user::Model> {
        let changes = AccountChanges {
            email: changes.email.as_deref().map(normalize_email),
            ..changes
        };
        changes.validate()?;

        let account = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;

        let mut active: user::ActiveModel = account.into();
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = changes.email {
            if let Some(other) = self.find_by_email(&email).await? {
                if other.id != id {
                    return Err(email_taken());
                }
            }
            active.email = Set(email);
        }
        if let Some(role) = changes.role {
            active.role = Set(role.into());
        }
        active.updated_at = Set(Utc::now());

        let account = active.update(&self.db).await.map_err(|err| {
            if ServiceError::is_unique_violation(&err) {
                email_taken()
            } else {
                ServiceError::from(err)
            }
        })?;

        info!(user_id = %id, "User updated");
        Ok(account)
    }

    async fn details(&self, id: Uuid) -> ServiceResult<UserDetails> {
        let account = user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        let project_ids = self.project_ids(id).await?;

        Ok(UserDetails {
            user: account,
            project_ids,
        })
    }

    async fn project_ids(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        Ok(user_project::Entity::find()
            .select_only()
            .column(user_project::Column::ProjectId)
            .filter(user_project::Column::UserId.eq(user_id))
            .order_by_asc(user_project::Column::AddedAt)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?)
    }

    /// Project IDs for several users in one query
    async fn project_links(&self, user_ids: Vec<Uuid>) -> ServiceResult<HashMap<Uuid, Vec<Uuid>>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, Uuid)> = user_project::Entity::find()
            .select_only()
            .column(user_project::Column::UserId)
            .column(user_project::Column::ProjectId)
            .filter(user_project::Column::UserId.is_in(user_ids))
            .order_by_asc(user_project::Column::AddedAt)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut links: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (user_id, project_id) in rows {
            links.entry(user_id).or_default().push(project_id);
        }
        Ok(links)
    }

    async fn find_by_email(&self, email: &str) -> ServiceResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }
}

/// Directory routes are for administrators only
pub fn require_admin(caller: &Caller) -> ServiceResult<()> {
    if caller.is_admin() {
        return Ok(());
    }

    warn!(user_id = %caller.id, role = %caller.role, "Non-admin hit a directory route");
    Err(ServiceError::Forbidden(format!(
        "User role '{}' is not authorized to access this route",
        caller.role
    )))
}

fn email_taken() -> ServiceError {
    ServiceError::Conflict("Email already registered".to_string())
}

fn internal(err: PasswordError) -> ServiceError {
    ServiceError::Internal(err.to_string())
}

/// Argon2 is CPU-bound, so hashing runs on the blocking pool
async fn hash_blocking(password: &str) -> ServiceResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(internal)
}

async fn verify_blocking(password: &str, hash: &str) -> ServiceResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(internal)
}

fn sort_column(field: &str) -> user::Column {
    match field {
        "updatedAt" => user::Column::UpdatedAt,
        "name" => user::Column::Name,
        "email" => user::Column::Email,
        _ => user::Column::CreatedAt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_checks_every_field() {
        let input = NewAccount {
            name: "A".to_string(),
            email: "not-an-email".to_string(),
            password: "abcdef".to_string(),
            role: None,
        };

        match input.validate().map_err(ServiceError::from) {
            Err(ServiceError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["email", "name", "password"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_require_admin_message() {
        let member = Caller::member(Uuid::new_v4());
        match require_admin(&member) {
            Err(ServiceError::Forbidden(message)) => assert_eq!(
                message,
                "User role 'member' is not authorized to access this route"
            ),
            other => panic!("expected forbidden, got {:?}", other),
        }

        assert!(require_admin(&Caller::admin(Uuid::new_v4())).is_ok());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_the_runtime_free() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        let hash = hash_blocking("secret123").await.unwrap();
        assert!(verify_blocking("secret123", &hash).await.unwrap());
        assert!(!verify_blocking("secret124", &hash).await.unwrap());
        ticker.abort();

        // On a single-threaded runtime the ticker only runs while hashing yields
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_password_is_not_an_account_change() {
        let changes: AccountChanges =
            serde_json::from_str(r#"{"name":"Ada","password":"hunter42"}"#).unwrap();
        assert_eq!(changes.name.as_deref(), Some("Ada"));
        assert!(changes.email.is_none());
    }
}
