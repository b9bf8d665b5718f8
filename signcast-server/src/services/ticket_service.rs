use chrono::{NaiveTime, Utc};
use diesel::prelude::*;
use thiserror::Error;

use crate::db::DbConnection;
use crate::models::{
    NewTicket, ServiceType, Ticket, TICKET_CALLED, TICKET_COMPLETED, TICKET_WAITING,
};

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("ticket {0} not found")]
    NotFound(i32),
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

/// Status moves strictly forward: waiting -> called -> completed.
pub fn is_valid_transition(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        (TICKET_WAITING, TICKET_CALLED) | (TICKET_CALLED, TICKET_COMPLETED)
    )
}

pub fn format_ticket_number(prefix: &str, sequence: i64) -> String {
    format!("{}{:03}", prefix.trim().to_uppercase(), sequence)
}

/// Issues a new waiting ticket with a per-service daily sequence number.
pub fn create_ticket(conn: &mut DbConnection, service: &ServiceType) -> Result<Ticket, TicketError> {
    use crate::schema::tickets::dsl;

    let today_start = Utc::now().date_naive().and_time(NaiveTime::MIN);

    let issued_today: i64 = dsl::tickets
        .filter(dsl::service_type_id.eq(service.id))
        .filter(dsl::created_at.ge(today_start))
        .count()
        .get_result(conn)?;

    let new_ticket = NewTicket {
        number: format_ticket_number(&service.prefix, issued_today + 1),
        status: TICKET_WAITING.to_string(),
        service_type_id: service.id,
    };

    let ticket = diesel::insert_into(dsl::tickets)
        .values(&new_ticket)
        .returning(Ticket::as_select())
        .get_result(conn)?;

    Ok(ticket)
}

/// waiting -> called, stamping the call time and the calling attendant.
pub fn call_ticket(
    conn: &mut DbConnection,
    ticket_id: i32,
    attendant_id: i32,
) -> Result<Ticket, TicketError> {
    use crate::schema::tickets::dsl;

    let ticket: Ticket = dsl::tickets
        .filter(dsl::id.eq(ticket_id))
        .select(Ticket::as_select())
        .first(conn)
        .optional()?
        .ok_or(TicketError::NotFound(ticket_id))?;

    if !is_valid_transition(&ticket.status, TICKET_CALLED) {
        return Err(TicketError::InvalidTransition {
            from: ticket.status,
            to: TICKET_CALLED.to_string(),
        });
    }

    let updated = diesel::update(dsl::tickets.filter(dsl::id.eq(ticket_id)))
        .set((
            dsl::status.eq(TICKET_CALLED),
            dsl::called_at.eq(Utc::now().naive_utc()),
            dsl::attendant_user_id.eq(attendant_id),
        ))
        .returning(Ticket::as_select())
        .get_result(conn)?;

    Ok(updated)
}

/// called -> completed. The calling attendant stays on the row.
pub fn complete_ticket(conn: &mut DbConnection, ticket_id: i32) -> Result<Ticket, TicketError> {
    use crate::schema::tickets::dsl;

    let ticket: Ticket = dsl::tickets
        .filter(dsl::id.eq(ticket_id))
        .select(Ticket::as_select())
        .first(conn)
        .optional()?
        .ok_or(TicketError::NotFound(ticket_id))?;

    if !is_valid_transition(&ticket.status, TICKET_COMPLETED) {
        return Err(TicketError::InvalidTransition {
            from: ticket.status,
            to: TICKET_COMPLETED.to_string(),
        });
    }

    let updated = diesel::update(dsl::tickets.filter(dsl::id.eq(ticket_id)))
        .set(dsl::status.eq(TICKET_COMPLETED))
        .returning(Ticket::as_select())
        .get_result(conn)?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_only_move_forward() {
        assert!(is_valid_transition(TICKET_WAITING, TICKET_CALLED));
        assert!(is_valid_transition(TICKET_CALLED, TICKET_COMPLETED));

        // No skipping, no regression, no self-transitions
        assert!(!is_valid_transition(TICKET_WAITING, TICKET_COMPLETED));
        assert!(!is_valid_transition(TICKET_CALLED, TICKET_WAITING));
        assert!(!is_valid_transition(TICKET_COMPLETED, TICKET_CALLED));
        assert!(!is_valid_transition(TICKET_COMPLETED, TICKET_WAITING));
        assert!(!is_valid_transition(TICKET_WAITING, TICKET_WAITING));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_ticket_number("A", 1), "A001");
        assert_eq!(format_ticket_number("p", 42), "P042");
        assert_eq!(format_ticket_number("A", 1000), "A1000");
    }
}
