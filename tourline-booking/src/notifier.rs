use std::sync::Arc;

use serde_json::{json, Value};

use tourline_core::catalog::TourInfo;
use tourline_core::notification::{EmailNotification, NotificationClient};
use tourline_shared::dates::display_date;
use tourline_shared::Masked;

use crate::models::{Booking, BookingStatus};

pub const ADMIN_EMAIL: &str = "admin@tourismplatform.com";
pub const FRONTEND_URL: &str = "http://localhost:3000";

/// Best-effort email side channel. Every method reports delivery as a bool and
/// never fails the caller.
pub struct NotificationDispatcher {
    client: Arc<dyn NotificationClient>,
    admin_email: String,
    frontend_url: String,
}

impl NotificationDispatcher {
    pub fn new(client: Arc<dyn NotificationClient>, admin_email: String, frontend_url: String) -> Self {
        Self {
            client,
            admin_email,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Customer confirmation plus admin notice; one of the two getting through counts.
    pub async fn booking_created(&self, booking: &Booking, tour: &TourInfo) -> bool {
        let data = booking_payload(booking, tour);
        let customer = EmailNotification {
            to: booking.email.clone(),
            subject: "Booking Confirmation - Your Tour Reservation".to_string(),
            template: "booking_confirmation".to_string(),
            data: data.clone(),
        };
        let admin = EmailNotification {
            to: self.admin_email.clone(),
            subject: format!("New Booking: {}", tour_title(tour)),
            template: "admin_notification".to_string(),
            data,
        };
        let customer_sent = self.deliver(booking, &customer).await;
        let admin_sent = self.deliver(booking, &admin).await;
        customer_sent || admin_sent
    }

    pub async fn status_changed(&self, booking: &Booking, tour: &TourInfo) -> bool {
        let (template, subject) = status_template(booking.status, tour_title(tour));
        let notification = EmailNotification {
            to: booking.email.clone(),
            subject,
            template: template.to_string(),
            data: booking_payload(booking, tour),
        };
        self.deliver(booking, &notification).await
    }

    pub async fn review_requested(&self, booking: &Booking, tour: &TourInfo, review_token: &str) -> bool {
        let notification = EmailNotification {
            to: booking.email.clone(),
            subject: format!("How was your {} experience?", tour_title(tour)),
            template: "review_request".to_string(),
            data: json!({
                "booking_id": booking.id,
                "customer_name": booking.customer_name,
                "customer_email": booking.email,
                "tour_title": tour_title(tour),
                "tour_date": display_date(booking.start_date),
                "start_date": display_date(booking.start_date),
                "end_date": display_date(booking.end_date),
                "duration_days": booking.duration_days(),
                "review_link": self.review_link(review_token),
                "review_token": review_token,
            }),
        };
        self.deliver(booking, &notification).await
    }

    pub fn review_link(&self, review_token: &str) -> String {
        format!("{}/review/{}", self.frontend_url, review_token)
    }

    async fn deliver(&self, booking: &Booking, notification: &EmailNotification) -> bool {
        match self.client.send(notification).await {
            Ok(()) => {
                tracing::info!(
                    booking_id = %booking.id,
                    template = %notification.template,
                    to = %Masked::of(&notification.to),
                    "Notification sent"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    template = %notification.template,
                    to = %Masked::of(&notification.to),
                    error = %e,
                    "Notification failed"
                );
                false
            }
        }
    }
}

/// `confirmed` and `cancelled` have their own templates; anything else gets the generic one.
pub fn status_template(status: BookingStatus, title: &str) -> (&'static str, String) {
    match status {
        BookingStatus::Confirmed => ("booking_confirmed", format!("Booking Confirmed - {}", title)),
        BookingStatus::Cancelled => ("booking_cancellation", format!("Booking Cancelled - {}", title)),
        _ => ("booking_confirmation", format!("Booking Update - {}", title)),
    }
}

fn tour_title(tour: &TourInfo) -> &str {
    if tour.title.is_empty() {
        "Unknown Tour"
    } else {
        &tour.title
    }
}

fn booking_payload(booking: &Booking, tour: &TourInfo) -> Value {
    json!({
        "booking_id": booking.id,
        "customer_name": booking.customer_name,
        "customer_email": booking.email,
        "tour_title": tour_title(tour),
        "start_date": display_date(booking.start_date),
        "end_date": display_date(booking.end_date),
        "duration_days": booking.duration_days(),
        "number_of_participants": booking.number_of_participants,
        "price_per_person": booking.price_per_person.to_string(),
        "total_price": booking.total_price.to_string(),
        "status": booking.status,
    })
}
