//! Conversions between `booking-postgres`'s row shapes and this crate's
//! domain types. Status/enum columns are stored as plain text in Postgres;
//! this is the one place that parses/renders them.

use crate::error::{BookingError, Result};
use crate::model::{
    Booking, BookingPayment, BookingStatus, LocationType, NoShowReport, NoShowType, PaymentStatus,
    Role, SettlementOutcome,
};
use booking_postgres::repository::{BookingPaymentRow, BookingRow, NoShowReportRow};

fn parse_enum<T>(column: &'static str, value: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
    parse(value).ok_or_else(|| {
        BookingError::ValidationFailed(format!("unrecognized {column} value {value:?}"))
    })
}

fn booking_status_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Pending => "pending",
        BookingStatus::Confirmed => "confirmed",
        BookingStatus::Completed => "completed",
        BookingStatus::Cancelled => "cancelled",
        BookingStatus::NoShow => "no_show",
    }
}

fn parse_booking_status(value: &str) -> Option<BookingStatus> {
    Some(match value {
        "pending" => BookingStatus::Pending,
        "confirmed" => BookingStatus::Confirmed,
        "completed" => BookingStatus::Completed,
        "cancelled" => BookingStatus::Cancelled,
        "no_show" => BookingStatus::NoShow,
        _ => return None,
    })
}

fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Scheduled => "scheduled",
        PaymentStatus::Authorized => "authorized",
        PaymentStatus::PaymentMethodRequired => "payment_method_required",
        PaymentStatus::Settled => "settled",
        PaymentStatus::Locked => "locked",
        PaymentStatus::ManualReview => "manual_review",
    }
}

fn parse_payment_status(value: &str) -> Option<PaymentStatus> {
    Some(match value {
        "scheduled" => PaymentStatus::Scheduled,
        "authorized" => PaymentStatus::Authorized,
        "payment_method_required" => PaymentStatus::PaymentMethodRequired,
        "settled" => PaymentStatus::Settled,
        "locked" => PaymentStatus::Locked,
        "manual_review" => PaymentStatus::ManualReview,
        _ => return None,
    })
}

fn location_type_str(location: LocationType) -> &'static str {
    match location {
        LocationType::StudentLocation => "student_location",
        LocationType::InstructorLocation => "instructor_location",
        LocationType::Online => "online",
        LocationType::NeutralLocation => "neutral_location",
    }
}

fn parse_location_type(value: &str) -> Option<LocationType> {
    Some(match value {
        "student_location" => LocationType::StudentLocation,
        "instructor_location" => LocationType::InstructorLocation,
        "online" => LocationType::Online,
        "neutral_location" => LocationType::NeutralLocation,
        _ => return None,
    })
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Student => "student",
        Role::Instructor => "instructor",
        Role::System => "system",
        Role::Admin => "admin",
    }
}

fn parse_role(value: &str) -> Option<Role> {
    Some(match value {
        "student" => Role::Student,
        "instructor" => Role::Instructor,
        "system" => Role::System,
        "admin" => Role::Admin,
        _ => return None,
    })
}

fn settlement_outcome_str(outcome: SettlementOutcome) -> &'static str {
    match outcome {
        SettlementOutcome::LessonCompletedFullPayout => "lesson_completed_full_payout",
        SettlementOutcome::StudentCancelGt24NoCharge => "student_cancel_gt24_no_charge",
        SettlementOutcome::StudentCancelLt12Split5050 => "student_cancel_lt12_split_50_50",
        SettlementOutcome::InstructorCancel => "instructor_cancel",
        SettlementOutcome::StudentNoShow => "student_no_show",
        SettlementOutcome::InstructorNoShow => "instructor_no_show",
        SettlementOutcome::CaptureFailureEscalated => "capture_failure_escalated",
        SettlementOutcome::CaptureFailureInstructorPaid => "capture_failure_instructor_paid",
    }
}

fn parse_settlement_outcome(value: &str) -> Option<SettlementOutcome> {
    Some(match value {
        "lesson_completed_full_payout" => SettlementOutcome::LessonCompletedFullPayout,
        "student_cancel_gt24_no_charge" => SettlementOutcome::StudentCancelGt24NoCharge,
        "student_cancel_lt12_split_50_50" => SettlementOutcome::StudentCancelLt12Split5050,
        "instructor_cancel" => SettlementOutcome::InstructorCancel,
        "student_no_show" => SettlementOutcome::StudentNoShow,
        "instructor_no_show" => SettlementOutcome::InstructorNoShow,
        "capture_failure_escalated" => SettlementOutcome::CaptureFailureEscalated,
        "capture_failure_instructor_paid" => SettlementOutcome::CaptureFailureInstructorPaid,
        _ => return None,
    })
}

fn no_show_type_str(no_show_type: NoShowType) -> &'static str {
    match no_show_type {
        NoShowType::Student => "student",
        NoShowType::Instructor => "instructor",
        NoShowType::Mutual => "mutual",
    }
}

fn parse_no_show_type(value: &str) -> Option<NoShowType> {
    Some(match value {
        "student" => NoShowType::Student,
        "instructor" => NoShowType::Instructor,
        "mutual" => NoShowType::Mutual,
        _ => return None,
    })
}

/// Parse a [`NoShowReportRow`] into the domain [`NoShowReport`].
///
/// # Errors
///
/// Returns [`BookingError::ValidationFailed`] if `no_show_type` holds text
/// this crate does not recognize.
pub fn no_show_report_from_row(row: NoShowReportRow) -> Result<NoShowReport> {
    Ok(NoShowReport {
        booking_id: row.booking_id,
        no_show_reported_at: row.no_show_reported_at,
        no_show_type: parse_enum("no_show_reports.no_show_type", &row.no_show_type, parse_no_show_type)?,
        no_show_disputed: row.no_show_disputed,
        no_show_resolved_at: row.no_show_resolved_at,
        no_show_resolution: row.no_show_resolution,
    })
}

/// Render a [`NoShowReport`] back into a [`NoShowReportRow`] for persistence.
#[must_use]
pub fn no_show_report_to_row(report: &NoShowReport) -> NoShowReportRow {
    NoShowReportRow {
        booking_id: report.booking_id,
        no_show_reported_at: report.no_show_reported_at,
        no_show_type: no_show_type_str(report.no_show_type).to_string(),
        no_show_disputed: report.no_show_disputed,
        no_show_resolved_at: report.no_show_resolved_at,
        no_show_resolution: report.no_show_resolution.clone(),
    }
}

/// Parse a [`BookingRow`] into the domain [`Booking`].
///
/// # Errors
///
/// Returns [`BookingError::ValidationFailed`] if a status/location/role
/// column holds text this crate does not recognize.
pub fn booking_from_row(row: BookingRow) -> Result<Booking> {
    Ok(Booking {
        id: row.id,
        student_id: row.student_id,
        instructor_id: row.instructor_id,
        status: parse_enum("bookings.status", &row.status, parse_booking_status)?,
        booking_start_utc: row.booking_start_utc,
        booking_end_utc: row.booking_end_utc,
        duration_minutes: i64::from(row.duration_minutes),
        lesson_timezone: row.lesson_timezone,
        service_name: row.service_name,
        hourly_rate_cents: row.hourly_rate_cents,
        total_price_cents: row.total_price_cents,
        location_type: parse_enum(
            "bookings.location_type",
            &row.location_type,
            parse_location_type,
        )?,
        rescheduled_from_booking_id: row.rescheduled_from_booking_id,
        has_locked_funds: row.has_locked_funds,
        cancellation_reason: row.cancellation_reason,
        cancelled_by_role: row
            .cancelled_by_role
            .map(|value| parse_enum("bookings.cancelled_by_role", &value, parse_role))
            .transpose()?,
        student_credit_amount_cents: row.student_credit_amount_cents,
        refunded_to_card_amount_cents: row.refunded_to_card_amount_cents,
        created_at: row.created_at,
        confirmed_at: row.confirmed_at,
        completed_at: row.completed_at,
        cancelled_at: row.cancelled_at,
    })
}

/// Render a [`Booking`] back into a [`BookingRow`] for persistence.
#[must_use]
pub fn booking_to_row(booking: &Booking) -> BookingRow {
    BookingRow {
        id: booking.id,
        student_id: booking.student_id,
        instructor_id: booking.instructor_id,
        status: booking_status_str(booking.status).to_string(),
        booking_start_utc: booking.booking_start_utc,
        booking_end_utc: booking.booking_end_utc,
        duration_minutes: i32::try_from(booking.duration_minutes).unwrap_or(i32::MAX),
        lesson_timezone: booking.lesson_timezone.clone(),
        service_name: booking.service_name.clone(),
        hourly_rate_cents: booking.hourly_rate_cents,
        total_price_cents: booking.total_price_cents,
        location_type: location_type_str(booking.location_type).to_string(),
        rescheduled_from_booking_id: booking.rescheduled_from_booking_id,
        has_locked_funds: booking.has_locked_funds,
        cancellation_reason: booking.cancellation_reason.clone(),
        cancelled_by_role: booking.cancelled_by_role.map(|role| role_str(role).to_string()),
        student_credit_amount_cents: booking.student_credit_amount_cents,
        refunded_to_card_amount_cents: booking.refunded_to_card_amount_cents,
        created_at: booking.created_at,
        confirmed_at: booking.confirmed_at,
        completed_at: booking.completed_at,
        cancelled_at: booking.cancelled_at,
    }
}

/// Parse a [`BookingPaymentRow`] into the domain [`BookingPayment`].
///
/// # Errors
///
/// Returns [`BookingError::ValidationFailed`] if the `payment_status` or
/// `settlement_outcome` column holds text this crate does not recognize.
pub fn payment_from_row(row: BookingPaymentRow) -> Result<BookingPayment> {
    Ok(BookingPayment {
        booking_id: row.booking_id,
        payment_status: parse_enum(
            "booking_payments.payment_status",
            &row.payment_status,
            parse_payment_status,
        )?,
        payment_intent_id: row.payment_intent_id,
        payment_method_id: row.payment_method_id,
        auth_scheduled_for: row.auth_scheduled_for,
        auth_attempted_at: row.auth_attempted_at,
        auth_failure_count: u32::try_from(row.auth_failure_count).unwrap_or(0),
        auth_last_error: row.auth_last_error,
        auth_failure_first_email_sent_at: row.auth_failure_first_email_sent_at,
        auth_failure_t13_warning_sent_at: row.auth_failure_t13_warning_sent_at,
        capture_failed_at: row.capture_failed_at,
        capture_retry_count: u32::try_from(row.capture_retry_count).unwrap_or(0),
        capture_error: row.capture_error,
        capture_escalated_at: row.capture_escalated_at,
        credits_reserved_cents: row.credits_reserved_cents,
        settlement_outcome: row
            .settlement_outcome
            .map(|value| {
                parse_enum(
                    "booking_payments.settlement_outcome",
                    &value,
                    parse_settlement_outcome,
                )
            })
            .transpose()?,
        instructor_payout_amount_cents: row.instructor_payout_amount_cents,
    })
}

/// Render a [`BookingPayment`] back into a [`BookingPaymentRow`] for persistence.
#[must_use]
pub fn payment_to_row(payment: &BookingPayment) -> BookingPaymentRow {
    BookingPaymentRow {
        booking_id: payment.booking_id,
        payment_status: payment_status_str(payment.payment_status).to_string(),
        payment_intent_id: payment.payment_intent_id.clone(),
        payment_method_id: payment.payment_method_id.clone(),
        auth_scheduled_for: payment.auth_scheduled_for,
        auth_attempted_at: payment.auth_attempted_at,
        auth_failure_count: i32::try_from(payment.auth_failure_count).unwrap_or(i32::MAX),
        auth_last_error: payment.auth_last_error.clone(),
        auth_failure_first_email_sent_at: payment.auth_failure_first_email_sent_at,
        auth_failure_t13_warning_sent_at: payment.auth_failure_t13_warning_sent_at,
        capture_failed_at: payment.capture_failed_at,
        capture_retry_count: i32::try_from(payment.capture_retry_count).unwrap_or(i32::MAX),
        capture_error: payment.capture_error.clone(),
        capture_escalated_at: payment.capture_escalated_at,
        credits_reserved_cents: payment.credits_reserved_cents,
        settlement_outcome: payment.settlement_outcome.map(|outcome| {
            settlement_outcome_str(outcome).to_string()
        }),
        instructor_payout_amount_cents: payment.instructor_payout_amount_cents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn booking_round_trips_through_its_row_representation() {
        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            status: BookingStatus::Confirmed,
            booking_start_utc: now,
            booking_end_utc: now + chrono::Duration::hours(1),
            duration_minutes: 60,
            lesson_timezone: "America/New_York".to_string(),
            service_name: "Piano".to_string(),
            hourly_rate_cents: 5000,
            total_price_cents: 5000,
            location_type: LocationType::Online,
            rescheduled_from_booking_id: None,
            has_locked_funds: false,
            cancellation_reason: None,
            cancelled_by_role: None,
            student_credit_amount_cents: 0,
            refunded_to_card_amount_cents: 0,
            created_at: now,
            confirmed_at: Some(now),
            completed_at: None,
            cancelled_at: None,
        };

        let row = booking_to_row(&booking);
        let restored = booking_from_row(row).unwrap();
        assert_eq!(restored.status, BookingStatus::Confirmed);
        assert_eq!(restored.location_type, LocationType::Online);
    }

    #[test]
    fn unrecognized_status_text_is_a_validation_error() {
        let row = BookingRow {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            status: "not_a_real_status".to_string(),
            booking_start_utc: Utc::now(),
            booking_end_utc: Utc::now(),
            duration_minutes: 60,
            lesson_timezone: "UTC".to_string(),
            service_name: "x".to_string(),
            hourly_rate_cents: 0,
            total_price_cents: 0,
            location_type: "online".to_string(),
            rescheduled_from_booking_id: None,
            has_locked_funds: false,
            cancellation_reason: None,
            cancelled_by_role: None,
            student_credit_amount_cents: 0,
            refunded_to_card_amount_cents: 0,
            created_at: Utc::now(),
            confirmed_at: None,
            completed_at: None,
            cancelled_at: None,
        };

        assert!(booking_from_row(row).is_err());
    }
}
