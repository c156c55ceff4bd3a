use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::ReminderConfig;
use crate::database::{acquire, DbConn, DbPool};
use crate::error::Result;
use crate::models::notifications::{NewNotification, NotificationType};
use crate::models::services::UpcomingService;
use crate::queries::{notifications as notification_queries, services};
use crate::services::email::{self, EmailSender};
use crate::services::notifications;

/// Notification title for a service starting `days_ahead` days from now.
///
/// The title doubles as the dedup key, so each lead time is reminded once.
pub fn reminder_title(days_ahead: i64) -> String {
    match days_ahead {
        1 => "Recordatorio: tu servicio es mañana".to_string(),
        d => format!("Recordatorio: tu servicio es en {} días", d),
    }
}

fn reminder_message(service: &UpcomingService) -> String {
    format!(
        "El servicio \"{}\" está programado para el {} a las {}.",
        service.title,
        service.start_date.format("%d/%m/%Y"),
        service.start_time.format("%H:%M"),
    )
}

/// Sends the reminders due for one lead time. Returns how many were created.
pub async fn send_reminders_for(
    conn: &mut DbConn,
    mailer: &dyn EmailSender,
    today: NaiveDate,
    days_ahead: i64,
) -> Result<usize> {
    let Some(target) = u64::try_from(days_ahead)
        .ok()
        .and_then(|d| today.checked_add_days(Days::new(d)))
    else {
        warn!(days_ahead, "Skipping invalid reminder lead time");
        return Ok(0);
    };

    let title = reminder_title(days_ahead);
    let upcoming = services::list_upcoming_confirmed(&mut *conn, target).await?;
    let mut sent = 0;

    for service in upcoming {
        if notification_queries::reminder_exists(&mut *conn, service.nanny_user_id, service.id, &title).await? {
            continue;
        }

        notifications::notify(
            &mut *conn,
            NewNotification::new(
                service.nanny_user_id,
                NotificationType::ServiceReminder,
                title.clone(),
                reminder_message(&service),
            )
            .related_to("service", service.id)
            .with_action(format!("/nanny/service-details/{}", service.id)),
        )
        .await?;

        let when = format!(
            "{} a las {}",
            service.start_date.format("%d/%m/%Y"),
            service.start_time.format("%H:%M")
        );
        email::send_best_effort(
            mailer,
            email::service_reminder_email(
                &service.nanny_email,
                &service.nanny_first_name,
                &service.title,
                &when,
                service.address.as_deref().unwrap_or("Por confirmar"),
            ),
        )
        .await;

        sent += 1;
    }

    Ok(sent)
}

async fn run_once(pool: &DbPool, mailer: &dyn EmailSender, days_ahead: &[i64]) -> Result<usize> {
    let mut conn = acquire(pool).await?;
    let today = Local::now().date_naive();

    let mut total = 0;
    for &days in days_ahead {
        total += send_reminders_for(&mut conn, mailer, today, days).await?;
    }
    Ok(total)
}

/// Background worker that reminds nannys of their upcoming confirmed services
///
/// Runs on `reminders.interval_seconds` (daily by default); the first run is
/// immediately after startup.
pub async fn service_reminder_worker(
    pool: DbPool,
    mailer: Arc<dyn EmailSender>,
    config: ReminderConfig,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) {
    let mut reminder_interval = interval(Duration::from_secs(config.interval_seconds.max(60)));
    info!(
        interval_seconds = config.interval_seconds,
        days_ahead = ?config.days_ahead,
        "Service reminder worker started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Service reminder worker shutting down");
                break;
            }
            _ = reminder_interval.tick() => {
                match run_once(&pool, mailer.as_ref(), &config.days_ahead).await {
                    Ok(count) => info!(count, "Service reminders sent"),
                    Err(e) => error!(error = %e, "Service reminder run failed"),
                }
            }
        }
    }

    info!("Service reminder worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use uuid::Uuid;

    #[test]
    fn test_reminder_titles_differ_per_lead_time() {
        assert_eq!(reminder_title(1), "Recordatorio: tu servicio es mañana");
        assert_eq!(reminder_title(3), "Recordatorio: tu servicio es en 3 días");
        assert_ne!(reminder_title(1), reminder_title(3));
    }

    #[test]
    fn test_reminder_message_formats_schedule() {
        let service = UpcomingService {
            id: Uuid::now_v7(),
            title: "Cuidado nocturno".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            start_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
            address: None,
            nanny_user_id: Uuid::now_v7(),
            nanny_email: "nanny@example.com".to_string(),
            nanny_first_name: "Lucía".to_string(),
        };

        let message = reminder_message(&service);
        assert!(message.contains("14/03/2026"));
        assert!(message.contains("19:30"));
        assert!(message.contains("Cuidado nocturno"));
    }
}
