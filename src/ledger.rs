//! Seat ledger: which seats of an event are held by an active booking.
//!
//! The ledger is a read-through view over existing bookings, not its own
//! storage. `claim` is an optimistic batch check that names every
//! colliding seat; durability of a claim comes from the store's atomic
//! insert, which re-checks uniqueness at the persist step.

use crate::error::{CoreError, CoreResult};
use crate::store::DurableStore;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

const SEATS_PER_ROW: i32 = 10;

// Spreadsheet-style row letters: A..Z, then AA, AB... so labels stay
// unique past 26 rows.
fn row_label(row: i32) -> String {
    let mut label = String::new();
    let mut n = row;
    loop {
        label.insert(0, (b'A' + (n % 26) as u8) as char);
        n = n / 26 - 1;
        if n < 0 {
            break;
        }
    }
    label
}

/// Seat labels for a venue of `total_seats`: rows lettered A, B, ... Z,
/// AA, AB..., ten seats per row, truncated to the seat count. A
/// display/allocation convenience - nothing in the ledger enforces this
/// scheme.
pub fn seat_labels(total_seats: i32) -> Vec<String> {
    let mut labels = Vec::with_capacity(total_seats.max(0) as usize);
    let rows = (total_seats + SEATS_PER_ROW - 1) / SEATS_PER_ROW;
    for row in 0..rows {
        let letter = row_label(row);
        for seat in 1..=SEATS_PER_ROW {
            if labels.len() as i32 >= total_seats {
                break;
            }
            labels.push(format!("{}{}", letter, seat));
        }
    }
    labels
}

#[derive(Clone)]
pub struct SeatLedger {
    store: Arc<dyn DurableStore>,
}

impl SeatLedger {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        SeatLedger { store }
    }

    /// All seat identifiers with an active booking for the event.
    pub async fn list_occupied(&self, event_id: Uuid) -> CoreResult<HashSet<String>> {
        self.store.active_seats(event_id).await
    }

    /// Check that every requested seat is free. Fails atomically (no
    /// partial claim) naming every colliding seat.
    pub async fn claim(&self, event_id: Uuid, seats: &[String]) -> CoreResult<()> {
        let occupied = self.list_occupied(event_id).await?;
        let mut conflicts: Vec<String> = seats
            .iter()
            .filter(|s| occupied.contains(s.as_str()))
            .cloned()
            .collect();
        if conflicts.is_empty() {
            Ok(())
        } else {
            conflicts.sort();
            Err(CoreError::SeatConflict(conflicts))
        }
    }
}
