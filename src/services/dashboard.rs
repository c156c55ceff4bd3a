//! Admin dashboard reads. Everything here is read-only, so whole reads are retried
//! on transient database errors.

use serde::Serialize;

use crate::DbPool;
use crate::database::{acquire, with_retry};
use crate::error::Result;
use crate::models::clients::ClientSummary;
use crate::models::dashboard::{DashboardStats, Pagination};
use crate::models::nannys::NannyWithUser;
use crate::models::users::{User, UserFilters};
use crate::queries::{clients, dashboard, nannys, users};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

/// Normalised `(page, limit, offset)` for the user listing.
pub fn page_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

pub async fn stats(pool: &DbPool) -> Result<DashboardStats> {
    with_retry(|| async move {
        let mut conn = acquire(pool).await?;
        Ok(DashboardStats {
            nannys: dashboard::nanny_counts(&mut conn).await?,
            clients: dashboard::client_counts(&mut conn).await?,
            admins: dashboard::admin_counts(&mut conn).await?,
            services: dashboard::service_counts(&mut conn).await?,
        })
    })
    .await
}

pub async fn list_users(pool: &DbPool, filters: UserFilters) -> Result<UserPage> {
    let (page, limit, offset) = page_window(filters.page, filters.limit);
    let filters = &filters;

    let (users, total) = with_retry(|| async move {
        let mut conn = acquire(pool).await?;
        users::list_users(&mut conn, filters, limit, offset).await
    })
    .await?;

    Ok(UserPage {
        users,
        pagination: Pagination::new(page, limit, total),
    })
}

pub async fn list_nannys(pool: &DbPool) -> Result<Vec<NannyWithUser>> {
    with_retry(|| async move {
        let mut conn = acquire(pool).await?;
        nannys::list_dashboard_nannys(&mut conn).await
    })
    .await
}

pub async fn list_clients(pool: &DbPool) -> Result<Vec<ClientSummary>> {
    with_retry(|| async move {
        let mut conn = acquire(pool).await?;
        clients::list_client_summaries(&mut conn).await
    })
    .await
}
