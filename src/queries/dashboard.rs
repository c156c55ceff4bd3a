use crate::{
    error::{Error, Result},
    models::dashboard::{AdminCounts, ClientCounts, NannyCounts, ServiceCounts},
};

use crate::DbConn;

pub async fn nanny_counts(conn: &mut DbConn) -> Result<NannyCounts> {
    sqlx::query_as::<_, NannyCounts>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE n.status = 'active') AS active,
               COUNT(*) FILTER (WHERE n.status <> 'active') AS inactive,
               COUNT(*) FILTER (WHERE u.is_verified) AS verified
        FROM nannys n
        JOIN users u ON u.id = n.user_id
        "#,
    )
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn client_counts(conn: &mut DbConn) -> Result<ClientCounts> {
    sqlx::query_as::<_, ClientCounts>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE verification_status = 'verified') AS verified,
               COUNT(*) FILTER (WHERE verification_status <> 'verified') AS unverified
        FROM clients
        "#,
    )
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}

pub async fn admin_counts(conn: &mut DbConn) -> Result<AdminCounts> {
    sqlx::query_as::<_, AdminCounts>("SELECT COUNT(*) AS total FROM users WHERE user_type = 'admin'")
        .fetch_one(conn)
        .await
        .map_err(Error::Sqlx)
}

pub async fn service_counts(conn: &mut DbConn) -> Result<ServiceCounts> {
    sqlx::query_as::<_, ServiceCounts>(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE status = 'pending') AS pending,
               COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
               COUNT(*) FILTER (WHERE status = 'completed') AS completed,
               COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
        FROM services
        "#,
    )
    .fetch_one(conn)
    .await
    .map_err(Error::Sqlx)
}
