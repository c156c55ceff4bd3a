//! Service bookings: creation, scheduling, acceptance by a nanny and completion.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use futures::future::join_all;
use serde::Serialize;
use sqlx::Connection;
use uuid::Uuid;

use crate::DbConn;
use crate::config::Config;
use crate::error::{Error, Result, ValidationErrors};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::nannys::AvailableNanny;
use crate::models::notifications::{NewNotification, NotificationType};
use crate::models::services::{
    AcceptServiceRequest, AvailabilityQuery, CreateServiceRequest, NewService, Service,
    ServiceChanges, ServiceFilters, ServiceStatus, ServiceType, ServiceWithNames,
    UpdateServiceRequest,
};
use crate::models::users::UserType;
use crate::queries::services::ServiceScope;
use crate::queries::{clients, nannys, services};
use crate::services::email::{self, EmailSender};
use crate::services::notifications::{notify, notify_best_effort};
use crate::validation::{
    FieldErrors, parse_time_of_day, required_trimmed, validate_max_length, validate_range,
};

pub const DEFAULT_LIST_LIMIT: i64 = 100;
pub const MAX_LIST_LIMIT: i64 = 500;

/// Outcome of `POST /services/:id/complete`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub service: Service,
    pub already_completed: bool,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn fractional_hours(time: NaiveTime) -> f64 {
    time.hour() as f64 + time.minute() as f64 / 60.0
}

/// Billable hours between start and end, at minute precision.
///
/// On a single day a negative span means the service runs past midnight.
/// Across several days the first and last days count partially and the days
/// in between count in full.
///
/// # Examples
/// ```
/// use backend::services::bookings::compute_total_hours;
/// use chrono::{NaiveDate, NaiveTime};
///
/// let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
/// let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
/// let end = NaiveTime::from_hms_opt(13, 30, 0).unwrap();
/// assert_eq!(compute_total_hours(day, None, start, end).unwrap(), 4.5);
/// ```
pub fn compute_total_hours(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> Result<f64> {
    let start = fractional_hours(start_time);
    let end = fractional_hours(end_time);

    let hours = match end_date.filter(|d| *d != start_date) {
        None => {
            let span = end - start;
            if span < 0.0 { span + 24.0 } else { span }
        }
        Some(end_date) if end_date < start_date => {
            return Err(Error::Validation(ValidationErrors::field(
                "end_date",
                "End date cannot be before start date",
            )));
        }
        Some(end_date) => {
            let days = (end_date - start_date).num_days() + 1;
            (24.0 - start) + (days - 2) as f64 * 24.0 + end
        }
    };

    Ok(round2(hours))
}

/// Wall-clock span of a service. A single-day service whose end time is
/// before its start ends on the next day.
pub fn service_span(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    start_time: NaiveTime,
    end_time: NaiveTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let start = start_date.and_time(start_time);
    let mut end = end_date.unwrap_or(start_date).and_time(end_time);
    if end < start {
        end += Duration::days(1);
    }
    (start, end)
}

fn service_not_found(id: Uuid) -> Error {
    Error::NotFound(format!("Service with ID {} not found", id))
}

fn schedule_label(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> String {
    format!("{} de {} a {}", date, start.format("%H:%M"), end.format("%H:%M"))
}

/// Client row id of the caller, when the caller is a client with a profile.
async fn caller_client_id(conn: &mut DbConn, caller: &AuthenticatedUser) -> Result<Option<Uuid>> {
    if caller.user_type != UserType::Client {
        return Ok(None);
    }
    Ok(clients::get_client_by_user_id(conn, caller.id).await?.map(|c| c.id))
}

async fn caller_nanny_id(conn: &mut DbConn, caller: &AuthenticatedUser) -> Result<Option<Uuid>> {
    if caller.user_type != UserType::Nanny {
        return Ok(None);
    }
    Ok(nannys::get_nanny_by_user_id(conn, caller.id).await?.map(|n| n.id))
}

/// Which services the caller may see.
async fn scope_for(conn: &mut DbConn, caller: &AuthenticatedUser) -> Result<Option<ServiceScope>> {
    let scope = match caller.user_type {
        UserType::Admin => Some(ServiceScope::All),
        UserType::Client => caller_client_id(conn, caller).await?.map(ServiceScope::Client),
        UserType::Nanny => caller_nanny_id(conn, caller).await?.map(ServiceScope::Nanny),
    };
    Ok(scope)
}

fn is_visible(scope: &ServiceScope, service: &Service) -> bool {
    match scope {
        ServiceScope::All => true,
        ServiceScope::Client(client_id) => service.client_id == *client_id,
        ServiceScope::Nanny(nanny_id) => {
            service.nanny_id == Some(*nanny_id)
                || (service.nanny_id.is_none() && service.status == ServiceStatus::Pending)
        }
    }
}

pub fn clamp_list_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

pub async fn list_services(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    filters: ServiceFilters,
) -> Result<Vec<ServiceWithNames>> {
    let Some(scope) = scope_for(&mut *conn, caller).await? else {
        return Ok(Vec::new());
    };
    let limit = clamp_list_limit(filters.limit);
    services::list_services(conn, &filters, scope, limit).await
}

pub async fn get_service(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<ServiceWithNames> {
    let service = services::get_service_with_names(&mut *conn, id)
        .await?
        .ok_or_else(|| service_not_found(id))?;

    let visible = match scope_for(conn, caller).await? {
        Some(scope) => is_visible(&scope, &service.service),
        None => false,
    };
    if !visible {
        return Err(Error::Forbidden("You do not have access to this service".to_string()));
    }
    Ok(service)
}

/// Validates a booking request and computes its hours.
pub fn build_new_service(client_id: Uuid, request: CreateServiceRequest) -> Result<NewService> {
    let mut errors = FieldErrors::default();

    let title = match required_trimmed("title", &request.title) {
        Ok(title) => {
            errors.check(validate_max_length("title", &title, 200));
            title
        }
        Err(e) => {
            errors.check(Err(e));
            String::new()
        }
    };

    let service_type = ServiceType::from_str(request.service_type.trim()).ok();
    if service_type.is_none() {
        errors.add(
            "service_type",
            "Service type must be one of hourly, daily, overnight, event, emergency",
        );
    }

    let start_time = parse_time_of_day("start_time", &request.start_time);
    let end_time = parse_time_of_day("end_time", &request.end_time);

    let number_of_children = request.number_of_children.unwrap_or(1);
    errors.check(validate_range("number_of_children", number_of_children, 1, 20));
    if let Some(description) = &request.description {
        errors.check(validate_max_length("description", description, 1000));
    }
    if let Some(instructions) = &request.special_instructions {
        errors.check(validate_max_length("special_instructions", instructions, 1000));
    }
    if let Some(address) = &request.address {
        errors.check(validate_max_length("address", address, 500));
    }

    let total_hours = match (&start_time, &end_time) {
        (Ok(start), Ok(end)) => {
            match compute_total_hours(request.start_date, request.end_date, *start, *end) {
                Ok(hours) => Some(hours),
                Err(e) => {
                    errors.check(Err(e));
                    None
                }
            }
        }
        _ => None,
    };
    let start_time = start_time.map_err(|e| errors.check(Err(e))).ok();
    let end_time = end_time.map_err(|e| errors.check(Err(e))).ok();

    errors.finish()?;

    match (service_type, start_time, end_time, total_hours) {
        (Some(service_type), Some(start_time), Some(end_time), Some(total_hours)) => Ok(NewService {
            client_id,
            title,
            service_type,
            description: request.description.filter(|d| !d.trim().is_empty()),
            start_date: request.start_date,
            end_date: request.end_date,
            start_time,
            end_time,
            total_hours,
            number_of_children,
            special_instructions: request.special_instructions.filter(|s| !s.trim().is_empty()),
            address: request.address.filter(|a| !a.trim().is_empty()),
        }),
        _ => Err(Error::BadRequest("Invalid service request".to_string())),
    }
}

/// Books a pending service and tells every available nanny about it.
pub async fn create_service(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    request: CreateServiceRequest,
    config: &Config,
    mailer: &dyn EmailSender,
) -> Result<Service> {
    let client_id = match caller.user_type {
        UserType::Client => caller_client_id(&mut *conn, caller)
            .await?
            .ok_or_else(|| Error::BadRequest("Complete your client profile before booking".to_string()))?,
        UserType::Admin => {
            let client_id = request.client_id.ok_or_else(|| {
                Error::Validation(ValidationErrors::field("client_id", "client_id is required"))
            })?;
            clients::get_client_by_id(&mut *conn, client_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("Client with ID {} not found", client_id)))?
                .id
        }
        UserType::Nanny => {
            return Err(Error::Forbidden("Only clients can book services".to_string()));
        }
    };

    let new_service = build_new_service(client_id, request)?;
    let service = services::create_service(&mut *conn, new_service).await?;

    tracing::info!(
        service_id = %service.id,
        client_id = %client_id,
        total_hours = service.total_hours,
        "Service created"
    );

    let recipients = nannys::list_notifiable_nannys(&mut *conn).await?;
    let when = schedule_label(service.start_date, service.start_time, service.end_time);
    let link = format!(
        "{}/nanny/service-details/{}",
        config.server.frontend_url.trim_end_matches('/'),
        service.id
    );

    for (user_id, _, _) in &recipients {
        let notification = NewNotification::new(
            *user_id,
            NotificationType::Service,
            "Nuevo servicio disponible",
            format!(
                "Nuevo servicio disponible: {}. Fecha: {}. {} niño(s).",
                service.title, when, service.number_of_children
            ),
        )
        .related_to("service", service.id)
        .with_action(format!("/nanny/service-details/{}", service.id));
        notify_best_effort(&mut *conn, notification).await;
    }

    join_all(recipients.iter().map(|(_, email_address, first_name)| {
        email::send_best_effort(
            mailer,
            email::new_service_email(email_address, first_name, &service.title, &when, &link),
        )
    }))
    .await;

    tracing::info!(service_id = %service.id, notified = recipients.len(), "Nannys notified of new service");
    Ok(service)
}

/// Applies an update on top of the stored service, recomputing hours when the schedule moves.
pub fn merge_service_update(current: &Service, update: UpdateServiceRequest) -> Result<ServiceChanges> {
    if update.is_empty() {
        return Err(Error::BadRequest("No fields to update".to_string()));
    }
    let touches_schedule = update.touches_schedule();

    let mut errors = FieldErrors::default();
    let title = match update.title {
        Some(title) => match required_trimmed("title", &title) {
            Ok(title) => {
                errors.check(validate_max_length("title", &title, 200));
                title
            }
            Err(e) => {
                errors.check(Err(e));
                current.title.clone()
            }
        },
        None => current.title.clone(),
    };
    if let Some(description) = &update.description {
        errors.check(validate_max_length("description", description, 1000));
    }
    if let Some(instructions) = &update.special_instructions {
        errors.check(validate_max_length("special_instructions", instructions, 1000));
    }

    let start_time = match update.start_time.as_deref().map(|t| parse_time_of_day("start_time", t)) {
        Some(Ok(time)) => time,
        Some(Err(e)) => {
            errors.check(Err(e));
            current.start_time
        }
        None => current.start_time,
    };
    let end_time = match update.end_time.as_deref().map(|t| parse_time_of_day("end_time", t)) {
        Some(Ok(time)) => time,
        Some(Err(e)) => {
            errors.check(Err(e));
            current.end_time
        }
        None => current.end_time,
    };
    errors.finish()?;

    let start_date = update.start_date.unwrap_or(current.start_date);
    let end_date = update.end_date.or(current.end_date);
    let total_hours = if touches_schedule {
        compute_total_hours(start_date, end_date, start_time, end_time)?
    } else {
        current.total_hours
    };

    Ok(ServiceChanges {
        title,
        description: update.description.or_else(|| current.description.clone()),
        start_date,
        end_date,
        start_time,
        end_time,
        total_hours,
        status: update.status.unwrap_or(current.status),
        special_instructions: update
            .special_instructions
            .or_else(|| current.special_instructions.clone()),
    })
}

/// Clients may change their own bookings; admins any.
async fn ensure_owner(conn: &mut DbConn, caller: &AuthenticatedUser, service: &Service) -> Result<()> {
    if caller.is_admin() {
        return Ok(());
    }
    match caller_client_id(conn, caller).await? {
        Some(client_id) if client_id == service.client_id => Ok(()),
        _ => Err(Error::Forbidden("You can only modify your own services".to_string())),
    }
}

pub async fn update_service(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    id: Uuid,
    update: UpdateServiceRequest,
) -> Result<Service> {
    let current = services::get_service_by_id(&mut *conn, id)
        .await?
        .ok_or_else(|| service_not_found(id))?;
    ensure_owner(&mut *conn, caller, &current).await?;

    let changes = merge_service_update(&current, update)?;
    let updated = services::update_service(conn, id, &changes).await?;

    tracing::info!(service_id = %id, status = %updated.status, "Service updated");
    Ok(updated)
}

/// Soft-cancels a service, freeing the assigned nanny unless the work was already done.
pub async fn cancel_service(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<()> {
    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    let service = services::get_service_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| service_not_found(id))?;
    ensure_owner(&mut tx, caller, &service).await?;

    if service.status == ServiceStatus::Cancelled {
        return Err(Error::BadRequest("Service is already cancelled".to_string()));
    }

    services::cancel_service(&mut tx, id).await?;
    if let Some(nanny_id) = service.nanny_id {
        if service.status != ServiceStatus::Completed {
            nannys::set_availability(&mut tx, nanny_id, true, None).await?;
        }
    }

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(service_id = %id, previous_status = %service.status, "Service cancelled");
    Ok(())
}

pub async fn find_available_nannys(conn: &mut DbConn, query: AvailabilityQuery) -> Result<Vec<AvailableNanny>> {
    let mut errors = FieldErrors::default();
    if query.start_date.is_none() {
        errors.add("startDate", "startDate is required");
    }
    let start_time = match query.start_time.as_deref() {
        Some(t) => parse_time_of_day("startTime", t).map_err(|e| errors.check(Err(e))).ok(),
        None => {
            errors.add("startTime", "startTime is required");
            None
        }
    };
    let end_time = match query.end_time.as_deref() {
        Some(t) => parse_time_of_day("endTime", t).map_err(|e| errors.check(Err(e))).ok(),
        None => {
            errors.add("endTime", "endTime is required");
            None
        }
    };
    errors.finish()?;

    let (Some(start_date), Some(start_time), Some(end_time)) = (query.start_date, start_time, end_time) else {
        return Err(Error::BadRequest("startDate, startTime and endTime are required".to_string()));
    };
    let end_date = query.end_date.unwrap_or(start_date);
    if end_date < start_date {
        return Err(Error::Validation(ValidationErrors::field(
            "endDate",
            "End date cannot be before start date",
        )));
    }

    nannys::find_available_nannys(conn, start_date, end_date, start_time, end_time).await
}

/// Assigns a nanny to a pending service and prices it at the nanny's hourly rate.
pub async fn accept_service(
    conn: &mut DbConn,
    caller: &AuthenticatedUser,
    id: Uuid,
    request: AcceptServiceRequest,
) -> Result<Service> {
    let nanny_id = match caller.user_type {
        UserType::Nanny => caller_nanny_id(&mut *conn, caller)
            .await?
            .ok_or_else(|| Error::NotFound("Nanny profile not found".to_string()))?,
        UserType::Admin => request.nanny_id.ok_or_else(|| {
            Error::Validation(ValidationErrors::field("nanny_id", "nanny_id is required"))
        })?,
        UserType::Client => {
            return Err(Error::Forbidden("Only nannys can accept services".to_string()));
        }
    };

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    let service = services::get_service_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| service_not_found(id))?;
    if service.status != ServiceStatus::Pending {
        return Err(Error::Conflict("Service is no longer pending".to_string()));
    }

    let nanny = nannys::get_nanny_with_user(&mut tx, nanny_id)
        .await?
        .ok_or_else(|| Error::NotFound("Nanny not found".to_string()))?;

    let (span_start, span_end) = service_span(
        service.start_date,
        service.end_date,
        service.start_time,
        service.end_time,
    );
    if services::has_schedule_conflict(&mut tx, nanny_id, service.id, span_start, span_end).await?
    {
        return Err(Error::Conflict(
            "You already have a service scheduled at that time".to_string(),
        ));
    }

    let total_amount = round2(service.total_hours * nanny.hourly_rate);
    let accepted = services::accept_service(&mut tx, id, nanny_id, total_amount)
        .await?
        .ok_or_else(|| Error::Conflict("Service is no longer pending".to_string()))?;

    if let Some(client) = clients::get_client_by_id(&mut tx, accepted.client_id).await? {
        let notification = NewNotification::new(
            client.user_id,
            NotificationType::Success,
            "Servicio confirmado",
            format!(
                "Tu servicio \"{}\" ha sido aceptado por {} {}",
                accepted.title, nanny.first_name, nanny.last_name
            ),
        )
        .related_to("service", accepted.id)
        .with_action(format!("/client/services/{}", accepted.id));
        notify(&mut tx, notification).await?;
    }

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(
        service_id = %id,
        nanny_id = %nanny_id,
        total_amount,
        "Service accepted"
    );
    Ok(accepted)
}

/// Marks a service completed. Completing twice is reported, not rejected.
pub async fn complete_service(conn: &mut DbConn, caller: &AuthenticatedUser, id: Uuid) -> Result<CompletionOutcome> {
    let caller_nanny = caller_nanny_id(&mut *conn, caller).await?;

    let mut tx = conn.begin().await.map_err(Error::Sqlx)?;

    let service = services::get_service_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| service_not_found(id))?;

    if !caller.is_admin() && (caller_nanny.is_none() || service.nanny_id != caller_nanny) {
        return Err(Error::Forbidden(
            "Only the assigned nanny can complete this service".to_string(),
        ));
    }

    match service.status {
        ServiceStatus::Completed => {
            return Ok(CompletionOutcome {
                service,
                already_completed: true,
            });
        }
        ServiceStatus::Cancelled => {
            return Err(Error::BadRequest("A cancelled service cannot be completed".to_string()));
        }
        _ => {}
    }
    let Some(nanny_id) = service.nanny_id else {
        return Err(Error::BadRequest("Service has no assigned nanny".to_string()));
    };

    let completed = services::complete_service(&mut tx, id).await?;
    nannys::increment_services_completed(&mut tx, nanny_id).await?;

    if let Some(client) = clients::get_client_by_id(&mut tx, completed.client_id).await? {
        let notification = NewNotification::new(
            client.user_id,
            NotificationType::Info,
            "Servicio completado",
            format!(
                "Tu servicio \"{}\" ha finalizado. ¡Califica a tu niñera!",
                completed.title
            ),
        )
        .related_to("service", completed.id)
        .with_action(format!("/client/services/{}/rate", completed.id));
        notify(&mut tx, notification).await?;
    }

    tx.commit().await.map_err(Error::Sqlx)?;

    tracing::info!(service_id = %id, nanny_id = %nanny_id, "Service completed");
    Ok(CompletionOutcome {
        service: completed,
        already_completed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_service_span_crosses_midnight() {
        let (start, end) = service_span(date(2030, 6, 10), None, time(22, 0), time(2, 0));
        assert_eq!(start, date(2030, 6, 10).and_time(time(22, 0)));
        assert_eq!(end, date(2030, 6, 11).and_time(time(2, 0)));

        // Overlaps a later overnight booking that starts and ends inside it
        let (other_start, other_end) = service_span(date(2030, 6, 10), None, time(23, 0), time(1, 0));
        assert!(start < other_end && end > other_start);
    }

    #[test]
    fn test_service_span_multi_day_uses_end_date() {
        let (start, end) =
            service_span(date(2030, 6, 10), Some(date(2030, 6, 12)), time(18, 0), time(9, 0));
        assert_eq!(start, date(2030, 6, 10).and_time(time(18, 0)));
        assert_eq!(end, date(2030, 6, 12).and_time(time(9, 0)));
    }

    fn request() -> CreateServiceRequest {
        CreateServiceRequest {
            client_id: None,
            title: "Cuidado por la tarde".to_string(),
            service_type: "hourly".to_string(),
            description: None,
            start_date: date(2025, 6, 10),
            end_date: None,
            start_time: "14:00".to_string(),
            end_time: "18:30:00".to_string(),
            number_of_children: Some(2),
            special_instructions: None,
            address: Some("Av. Reforma 123".to_string()),
        }
    }

    fn stored_service() -> Service {
        let now = chrono::Utc::now();
        Service {
            id: Uuid::now_v7(),
            client_id: Uuid::now_v7(),
            nanny_id: None,
            title: "Original".to_string(),
            service_type: ServiceType::Hourly,
            description: Some("Descripción".to_string()),
            start_date: date(2025, 6, 10),
            end_date: None,
            start_time: time(9, 0),
            end_time: time(12, 0),
            total_hours: 3.0,
            total_amount: 0.0,
            number_of_children: 1,
            special_instructions: None,
            address: None,
            status: ServiceStatus::Pending,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_same_day_hours() {
        let d = date(2025, 6, 10);
        assert_eq!(compute_total_hours(d, None, time(9, 0), time(17, 0)).unwrap(), 8.0);
        assert_eq!(compute_total_hours(d, Some(d), time(9, 15), time(10, 35)).unwrap(), 1.33);
    }

    #[test]
    fn test_same_day_crossing_midnight() {
        let d = date(2025, 6, 10);
        assert_eq!(compute_total_hours(d, None, time(22, 0), time(2, 0)).unwrap(), 4.0);
    }

    #[test]
    fn test_multi_day_hours() {
        // 20:00 day one to 08:00 day two
        assert_eq!(
            compute_total_hours(date(2025, 6, 10), Some(date(2025, 6, 11)), time(20, 0), time(8, 0)).unwrap(),
            12.0
        );
        // 09:30 on the 10th to 18:00 on the 12th: 14.5 + 24 + 18
        assert_eq!(
            compute_total_hours(date(2025, 6, 10), Some(date(2025, 6, 12)), time(9, 30), time(18, 0)).unwrap(),
            56.5
        );
    }

    #[test]
    fn test_end_date_before_start_is_rejected() {
        let result = compute_total_hours(date(2025, 6, 10), Some(date(2025, 6, 9)), time(9, 0), time(10, 0));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_build_new_service_normalises_times() {
        let client_id = Uuid::now_v7();
        let service = build_new_service(client_id, request()).unwrap();
        assert_eq!(service.client_id, client_id);
        assert_eq!(service.service_type, ServiceType::Hourly);
        assert_eq!(service.start_time, time(14, 0));
        assert_eq!(service.end_time, time(18, 30));
        assert_eq!(service.total_hours, 4.5);
    }

    #[test]
    fn test_build_new_service_collects_errors() {
        let mut bad = request();
        bad.title = "   ".to_string();
        bad.service_type = "weekly".to_string();
        bad.start_time = "25:00".to_string();
        bad.number_of_children = Some(0);

        match build_new_service(Uuid::now_v7(), bad) {
            Err(Error::Validation(ValidationErrors::Multiple { fields })) => {
                assert!(fields.contains_key("title"));
                assert!(fields.contains_key("service_type"));
                assert!(fields.contains_key("start_time"));
                assert!(fields.contains_key("number_of_children"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|s| s.title)),
        }
    }

    #[test]
    fn test_merge_update_keeps_untouched_fields() {
        let current = stored_service();
        let changes = merge_service_update(
            &current,
            UpdateServiceRequest {
                title: Some("Nuevo título".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(changes.title, "Nuevo título");
        assert_eq!(changes.description.as_deref(), Some("Descripción"));
        assert_eq!(changes.start_time, current.start_time);
        assert_eq!(changes.total_hours, 3.0);
        assert_eq!(changes.status, ServiceStatus::Pending);
    }

    #[test]
    fn test_merge_update_recomputes_hours_on_schedule_change() {
        let changes = merge_service_update(
            &stored_service(),
            UpdateServiceRequest {
                end_time: Some("15:45".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(changes.end_time, time(15, 45));
        assert_eq!(changes.total_hours, 6.75);
    }

    #[test]
    fn test_merge_update_rejects_empty_body() {
        let result = merge_service_update(&stored_service(), UpdateServiceRequest::default());
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_nanny_scope_sees_pending_unassigned() {
        let nanny_id = Uuid::now_v7();
        let scope = ServiceScope::Nanny(nanny_id);
        let mut service = stored_service();
        assert!(is_visible(&scope, &service));

        service.status = ServiceStatus::Confirmed;
        service.nanny_id = Some(Uuid::now_v7());
        assert!(!is_visible(&scope, &service));

        service.nanny_id = Some(nanny_id);
        assert!(is_visible(&scope, &service));
    }

    #[test]
    fn test_clamp_list_limit() {
        assert_eq!(clamp_list_limit(None), 100);
        assert_eq!(clamp_list_limit(Some(1000)), 500);
    }
}
